//! Processing status polling.
//!
//! After a commit the server processes the file asynchronously; the only way to
//! observe it is to ask. [`StatusPoller::poll`] yields a terminating stream: one
//! [`PollEvent::Polled`] per status query, then exactly one
//! [`PollEvent::Finished`] carrying the item's terminal status.
//!
//! The interval is fixed (no backoff) and queries never overlap because the
//! stream issues the next one only after the previous resolved and the delay
//! elapsed. The budget is measured on the injected [`Clock`], so time spent in
//! queries counts against it.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;

use crate::backend::UploadBackend;
use crate::clock::Clock;
use crate::config::PollingConfig;
use crate::types::{FailureReason, ProcessingState, Status};

/// One observation from a poll loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollEvent {
    /// A status query completed
    Polled {
        /// 1-based query number
        attempt: u32,
        /// What the server reported
        state: ProcessingState,
    },
    /// Polling stopped; always the last event
    Finished(Status),
}

/// Repeatedly queries processing status until a terminal answer or the timeout
#[derive(Clone)]
pub struct StatusPoller {
    backend: Arc<dyn UploadBackend>,
    clock: Arc<dyn Clock>,
    config: PollingConfig,
}

struct PollLoop {
    poller: StatusPoller,
    filename: String,
    started: Duration,
    attempt: u32,
    finish: Option<Status>,
    done: bool,
}

impl StatusPoller {
    /// Create a poller over `backend`, timed by `clock`
    pub fn new(
        backend: Arc<dyn UploadBackend>,
        clock: Arc<dyn Clock>,
        config: PollingConfig,
    ) -> Self {
        Self {
            backend,
            clock,
            config,
        }
    }

    /// Poll the status of `filename`; the budget starts now
    pub fn poll(&self, filename: impl Into<String>) -> BoxStream<'static, PollEvent> {
        let state = PollLoop {
            poller: self.clone(),
            filename: filename.into(),
            started: self.clock.now(),
            attempt: 0,
            finish: None,
            done: false,
        };

        futures::stream::unfold(state, |mut lp| async move {
            if lp.done {
                return None;
            }
            if let Some(status) = lp.finish.take() {
                lp.done = true;
                return Some((PollEvent::Finished(status), lp));
            }

            lp.poller.clock.sleep(lp.poller.config.interval).await;
            let elapsed = lp.poller.clock.now().saturating_sub(lp.started);
            if elapsed > lp.poller.config.timeout {
                tracing::warn!(
                    filename = %lp.filename,
                    elapsed_ms = elapsed.as_millis() as u64,
                    queries = lp.attempt,
                    "processing status polling timed out"
                );
                lp.done = true;
                return Some((
                    PollEvent::Finished(Status::Failed(FailureReason::ProcessingTimeout)),
                    lp,
                ));
            }

            lp.attempt += 1;
            match lp.poller.backend.upload_status(&lp.filename).await {
                Ok(state) => {
                    tracing::debug!(filename = %lp.filename, attempt = lp.attempt, ?state, "status polled");
                    lp.finish = match state {
                        ProcessingState::Processed => Some(Status::Succeeded),
                        ProcessingState::Error => {
                            Some(Status::Failed(FailureReason::ProcessingFailed))
                        }
                        ProcessingState::Pending(_) => None,
                    };
                    let attempt = lp.attempt;
                    Some((PollEvent::Polled { attempt, state }, lp))
                }
                Err(e) => {
                    tracing::warn!(filename = %lp.filename, attempt = lp.attempt, error = %e, "status check failed");
                    lp.done = true;
                    Some((
                        PollEvent::Finished(Status::Failed(FailureReason::StatusCheckFailed)),
                        lp,
                    ))
                }
            }
        })
        .boxed()
    }

    /// Drive [`poll`](Self::poll) to the end and return the terminal status
    pub async fn wait_for_terminal(&self, filename: impl Into<String>) -> Status {
        let mut events = self.poll(filename);
        let mut last = Status::Failed(FailureReason::StatusCheckFailed);
        while let Some(event) = events.next().await {
            if let PollEvent::Finished(status) = event {
                last = status;
            }
        }
        last
    }
}
