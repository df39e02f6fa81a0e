//! Upload orchestration split into focused submodules.
//!
//! The `Uploader` struct accepts batches of files and supervises one task per file:
//! - [`items`] - The visible, newest-first item list
//! - [`task`] - Per-file upload lifecycle (gate, upload, classify, poll)

mod items;
mod task;


use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;

use crate::backend::{HttpBackend, UploadBackend};
use crate::clock::{Clock, TokioClock};
use crate::config::Config;
use crate::error::Result;
use crate::poller::StatusPoller;
use crate::session::SessionGate;
use crate::types::{Event, FileCandidate, SessionState, Status, UploadId, UploadItem};
use crate::validator;

use items::ItemStore;
use task::{UploadTaskContext, run_upload_task};

/// Main uploader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Uploader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Transport to the upload service
    pub(crate) backend: Arc<dyn UploadBackend>,
    /// Authentication state shared by every task
    pub(crate) session: SessionGate,
    /// Processing status poller handed to each committed upload
    pub(crate) poller: StatusPoller,
    /// Visible item list, newest first
    pub(crate) items: ItemStore,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// In-flight upload tasks
    pub(crate) tasks: TaskTracker,
    /// Last assigned item id
    pub(crate) next_id: Arc<AtomicU64>,
}

impl Uploader {
    /// Create an uploader talking HTTP to `config.server.base_url`.
    ///
    /// The session starts closed; call [`check_status`](Self::check_status) (or use
    /// [`connect`](Self::connect)) before submitting files.
    pub fn new(config: Config) -> Result<Self> {
        let backend = HttpBackend::new(&config)?;
        Self::with_backend(config, Arc::new(backend), Arc::new(TokioClock::new()))
    }

    /// Create an uploader and immediately query the session state
    pub async fn connect(config: Config) -> Result<Self> {
        let uploader = Self::new(config)?;
        uploader.check_status().await;
        Ok(uploader)
    }

    /// Create an uploader over an arbitrary backend and clock
    pub fn with_backend(
        config: Config,
        backend: Arc<dyn UploadBackend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        // Buffer of 1000 events: slow subscribers get `Lagged` instead of blocking tasks
        let (event_tx, _rx) = broadcast::channel(1000);
        let session = SessionGate::new(backend.clone(), event_tx.clone());
        let poller = StatusPoller::new(backend.clone(), clock, config.polling.clone());

        Ok(Self {
            config: Arc::new(config),
            backend,
            session,
            poller,
            items: ItemStore::default(),
            event_tx,
            tasks: TaskTracker::new(),
            next_id: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Query the backend for the session state (fails closed)
    pub async fn check_status(&self) -> SessionState {
        self.session.check_status().await
    }

    /// Exchange a password for an authenticated session
    pub async fn authenticate(&self, password: &str) -> Result<()> {
        self.session.authenticate(password).await
    }

    /// Whether uploads are currently permitted
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The session gate, for watching authentication changes
    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    /// Submit a batch of files.
    ///
    /// Each file gets an item at the top of the list, in submission order. Files
    /// that fail validation end in `RejectedLocally` right away; the rest each get
    /// their own task. Returns the new item ids in submission order. May be called
    /// again while earlier batches are still running.
    pub async fn submit(&self, files: impl IntoIterator<Item = FileCandidate>) -> Vec<UploadId> {
        let mut ids = Vec::new();

        for file in files {
            let id = UploadId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            self.items.insert_front(UploadItem::new(id, &file)).await;
            self.emit_event(Event::ItemAdded {
                id,
                name: file.name().to_string(),
            });
            ids.push(id);

            match validator::validate(&file, &self.config.validation) {
                Err(reason) => {
                    tracing::info!(upload_id = %id, filename = %file.name(), reason = ?reason, "file rejected locally");
                    if let Some(item) = self
                        .items
                        .transition(id, Status::RejectedLocally(reason))
                        .await
                    {
                        self.emit_event(Event::StatusChanged {
                            id,
                            status: item.status,
                            message: item.message,
                        });
                    }
                }
                Ok(()) => {
                    tracing::info!(upload_id = %id, filename = %file.name(), size = file.size(), "upload queued");
                    let ctx = UploadTaskContext {
                        id,
                        file,
                        backend: self.backend.clone(),
                        session: self.session.clone(),
                        poller: self.poller.clone(),
                        items: self.items.clone(),
                        event_tx: self.event_tx.clone(),
                    };
                    self.tasks.spawn(run_upload_task(ctx));
                }
            }
        }

        ids
    }

    /// Snapshot of all items, newest first
    pub async fn items(&self) -> Vec<UploadItem> {
        self.items.snapshot().await
    }

    /// Snapshot of one item
    pub async fn item(&self, id: UploadId) -> Option<UploadItem> {
        self.items.get(id).await
    }

    /// Number of upload tasks still running
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every task spawned so far has reached a terminal state
    pub async fn wait_idle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Subscribe to upload events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls more than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Subscribe as a `Stream`, silently skipping over lag gaps
    pub fn event_stream(&self) -> impl futures::Stream<Item = Event> + Send + 'static {
        use tokio_stream::StreamExt;
        tokio_stream::wrappers::BroadcastStream::new(self.subscribe()).filter_map(|event| event.ok())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers; dropped silently when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
