//! Custom test assertions for integration tests

use std::time::Duration;

use replay_upload::{Event, Status, UploadId, UploadItem, Uploader};

/// Wait (bounded) for every in-flight upload to settle
pub async fn settle(uploader: &Uploader, timeout: Duration) {
    tokio::time::timeout(timeout, uploader.wait_idle())
        .await
        .expect("uploads did not settle in time");
}

/// Fetch an item that must exist
pub async fn item(uploader: &Uploader, id: UploadId) -> UploadItem {
    uploader
        .item(id)
        .await
        .unwrap_or_else(|| panic!("item {} should exist", id))
}

/// Assert that an item ended in `expected`
pub async fn assert_status(uploader: &Uploader, id: UploadId, expected: Status) {
    let item = item(uploader, id).await;
    assert_eq!(
        item.status, expected,
        "item {} ({}) ended as {:?}",
        id, item.name, item.status
    );
}

/// The status transitions recorded for `id`, in order
pub fn transitions_for(events: &[Event], id: UploadId) -> Vec<Status> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::StatusChanged {
                id: event_id,
                status,
                ..
            } if *event_id == id => Some(status.clone()),
            _ => None,
        })
        .collect()
}

/// Drain whatever is buffered on a receiver
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
