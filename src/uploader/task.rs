//! Upload task -- drives one accepted file from `Queued` to a terminal state.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::broadcast;

use crate::backend::{UploadBackend, UploadRequest, UploadResponse};
use crate::error::Result;
use crate::poller::{PollEvent, StatusPoller};
use crate::session::SessionGate;
use crate::types::{Event, FailureReason, FileCandidate, Status, UploadId, UploadProgress};

use super::items::ItemStore;

/// Everything a single upload task needs, so helpers don't take long parameter lists.
pub(crate) struct UploadTaskContext {
    pub(crate) id: UploadId,
    pub(crate) file: FileCandidate,
    pub(crate) backend: Arc<dyn UploadBackend>,
    pub(crate) session: SessionGate,
    pub(crate) poller: StatusPoller,
    pub(crate) items: ItemStore,
    pub(crate) event_tx: broadcast::Sender<Event>,
}

impl UploadTaskContext {
    /// Move the item to `next` and emit the change; illegal transitions are logged and dropped
    async fn transition(&self, next: Status) {
        match self.items.transition(self.id, next.clone()).await {
            Some(item) => {
                self.event_tx
                    .send(Event::StatusChanged {
                        id: self.id,
                        status: item.status,
                        message: item.message,
                    })
                    .ok();
            }
            None => {
                tracing::warn!(upload_id = %self.id, status = ?next, "ignoring illegal status transition");
            }
        }
    }

    async fn fail(&self, reason: FailureReason) {
        tracing::warn!(upload_id = %self.id, filename = %self.file.name(), reason = ?reason, "upload failed");
        self.transition(Status::Failed(reason)).await;
    }

    async fn record_progress(&self, progress: UploadProgress) {
        if self.items.set_progress(self.id, progress).await.is_some() {
            self.event_tx
                .send(Event::Progress {
                    id: self.id,
                    sent: progress.sent,
                    total: progress.total,
                })
                .ok();
        }
    }

    /// Send the file, forwarding progress to the item while the request is in flight
    async fn upload_with_progress(&self, csrf_token: String) -> Result<UploadResponse> {
        let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel();
        let request = UploadRequest {
            file: self.file.clone(),
            csrf_token,
        };

        let upload = self.backend.upload(request, progress_tx);
        tokio::pin!(upload);

        let result = loop {
            tokio::select! {
                result = &mut upload => break result,
                Some(progress) = progress_rx.recv() => self.record_progress(progress).await,
            }
        };

        while let Ok(progress) = progress_rx.try_recv() {
            self.record_progress(progress).await;
        }
        result
    }
}

/// Core upload task -- the full lifecycle of a single file.
///
/// Phases:
/// 1. Gate on the session (no request when unauthenticated)
/// 2. Upload with live progress
/// 3. Classify the response
/// 4. Poll processing status to a terminal state
pub(crate) async fn run_upload_task(ctx: UploadTaskContext) {
    let id = ctx.id;

    // Phase 1: session gate
    let csrf_token = match ctx.session.require_authenticated() {
        Ok(token) => token,
        Err(_) => {
            ctx.fail(FailureReason::NotAuthenticated).await;
            return;
        }
    };

    // Phase 2: upload
    ctx.transition(Status::Uploading).await;
    let response = ctx.upload_with_progress(csrf_token).await;

    // Phase 3: classify
    let filename = match response {
        Ok(UploadResponse::Created { filename }) => filename,
        Ok(UploadResponse::Duplicate) => {
            tracing::info!(upload_id = %id, filename = %ctx.file.name(), "server already has this replay");
            ctx.transition(Status::Duplicate).await;
            return;
        }
        Ok(UploadResponse::Unauthorized) => {
            ctx.fail(FailureReason::NotAuthenticated).await;
            ctx.session.invalidate();
            return;
        }
        Ok(UploadResponse::Rejected { status, message }) => {
            ctx.fail(FailureReason::ServerRejected {
                status: Some(status),
                message,
            })
            .await;
            return;
        }
        Err(e) if e.is_transport() => {
            tracing::warn!(upload_id = %id, error = %e, "upload transport failure");
            ctx.fail(FailureReason::NetworkError).await;
            return;
        }
        Err(e) => {
            tracing::warn!(upload_id = %id, error = %e, "unreadable upload response");
            ctx.fail(FailureReason::ServerRejected {
                status: None,
                message: None,
            })
            .await;
            return;
        }
    };

    // Phase 4: processing
    tracing::info!(upload_id = %id, filename = %filename, "upload committed, waiting for processing");
    ctx.items.set_server_filename(id, &filename).await;
    ctx.transition(Status::Processing).await;

    let mut events = ctx.poller.poll(filename);
    while let Some(event) = events.next().await {
        match event {
            PollEvent::Polled { attempt, state } => {
                ctx.event_tx
                    .send(Event::StatusPolled { id, attempt, state })
                    .ok();
            }
            PollEvent::Finished(status) => {
                if status == Status::Succeeded {
                    tracing::info!(upload_id = %id, "replay processed");
                }
                ctx.transition(status).await;
            }
        }
    }
}
