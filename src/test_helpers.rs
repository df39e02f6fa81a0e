//! Shared test helpers: a scripted in-memory backend and uploader construction.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::backend::{
    AuthOutcome, AuthStatus, ProgressSender, UploadBackend, UploadRequest, UploadResponse,
};
use crate::clock::TokioClock;
use crate::clock::manual::ManualClock;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{FileCandidate, ProcessingState, UploadProgress};
use crate::uploader::Uploader;

/// A call observed by [`MockBackend`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    AuthStatus,
    Authenticate { password: String, csrf_token: String },
    Upload { name: String, csrf_token: String },
    Status { filename: String },
}

/// Scripted reply to an upload
#[derive(Clone)]
pub(crate) enum UploadReply {
    Respond(UploadResponse),
    TransportError,
    InvalidResponse,
    /// Wait for the gate to be notified, then respond
    Gated(Arc<Notify>, UploadResponse),
}

/// In-memory [`UploadBackend`] with per-file scripting and a call log.
///
/// Unscripted uploads answer `201` with the file's own name; unscripted status
/// queries answer `pending`.
pub(crate) struct MockBackend {
    auth_status: Mutex<Option<AuthStatus>>,
    auth_outcome: Mutex<Option<AuthOutcome>>,
    uploads: Mutex<HashMap<String, UploadReply>>,
    statuses: Mutex<HashMap<String, VecDeque<Option<ProcessingState>>>>,
    /// Virtual time each status query takes
    status_latency: Mutex<Option<(Arc<ManualClock>, Duration)>>,
    calls: Mutex<Vec<Call>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            auth_status: Mutex::new(Some(AuthStatus {
                authenticated: true,
                csrf_token: "csrf-token".to_string(),
            })),
            auth_outcome: Mutex::new(Some(AuthOutcome::Accepted {
                authenticated: true,
            })),
            uploads: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            status_latency: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `None` makes `auth/status` fail at the transport level
    pub(crate) fn set_auth_status(&self, status: Option<AuthStatus>) {
        *self.auth_status.lock().unwrap() = status;
    }

    /// `None` makes `auth` fail at the transport level
    pub(crate) fn set_auth_outcome(&self, outcome: Option<AuthOutcome>) {
        *self.auth_outcome.lock().unwrap() = outcome;
    }

    pub(crate) fn script_upload(&self, name: &str, reply: UploadReply) {
        self.uploads.lock().unwrap().insert(name.to_string(), reply);
    }

    /// Queue status replies for a filename; `None` is a transport failure
    pub(crate) fn script_status(&self, filename: &str, replies: Vec<Option<ProcessingState>>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(filename.to_string(), replies.into());
    }

    pub(crate) fn set_status_latency(&self, clock: Arc<ManualClock>, latency: Duration) {
        *self.status_latency.lock().unwrap() = Some((clock, latency));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn upload_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upload { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn status_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Status { filename } => Some(filename),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl UploadBackend for MockBackend {
    async fn auth_status(&self) -> Result<AuthStatus> {
        self.record(Call::AuthStatus);
        self.auth_status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Transport("connection refused".into()))
    }

    async fn authenticate(&self, password: &str, csrf_token: &str) -> Result<AuthOutcome> {
        self.record(Call::Authenticate {
            password: password.to_string(),
            csrf_token: csrf_token.to_string(),
        });
        self.auth_outcome
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Transport("connection refused".into()))
    }

    async fn upload(
        &self,
        request: UploadRequest,
        progress: ProgressSender,
    ) -> Result<UploadResponse> {
        let name = request.file.name().to_string();
        self.record(Call::Upload {
            name: name.clone(),
            csrf_token: request.csrf_token.clone(),
        });

        let total = request.file.size();
        progress
            .send(UploadProgress {
                sent: total / 2,
                total,
            })
            .ok();
        tokio::task::yield_now().await;
        progress.send(UploadProgress { sent: total, total }).ok();

        let reply = self.uploads.lock().unwrap().get(&name).cloned();
        match reply {
            None => Ok(UploadResponse::Created { filename: name }),
            Some(UploadReply::Respond(response)) => Ok(response),
            Some(UploadReply::TransportError) => Err(Error::Transport("connection reset".into())),
            Some(UploadReply::InvalidResponse) => {
                Err(Error::InvalidResponse("missing 'filename'".into()))
            }
            Some(UploadReply::Gated(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
        }
    }

    async fn upload_status(&self, filename: &str) -> Result<ProcessingState> {
        self.record(Call::Status {
            filename: filename.to_string(),
        });

        let latency = self.status_latency.lock().unwrap().clone();
        if let Some((clock, by)) = latency {
            clock.advance(by);
        }

        let next = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(filename)
            .and_then(|q| q.pop_front());
        match next {
            None => Ok(ProcessingState::Pending("pending".into())),
            Some(Some(state)) => Ok(state),
            Some(None) => Err(Error::Transport("connection reset".into())),
        }
    }
}

/// A candidate of `size` bytes
pub(crate) fn replay(name: &str, size: usize) -> FileCandidate {
    FileCandidate::new(name, vec![0u8; size])
}

/// Uploader over a fresh mock backend, with the session already checked.
///
/// Polling runs on the tokio timer, so callers use `#[tokio::test(start_paused = true)]`:
/// paused time only jumps to the earliest pending sleep, and concurrent items keep
/// independent budgets.
pub(crate) async fn create_test_uploader() -> (Uploader, Arc<MockBackend>, Arc<TokioClock>) {
    let backend = Arc::new(MockBackend::new());
    let clock = Arc::new(TokioClock::new());
    let uploader = Uploader::with_backend(Config::default(), backend.clone(), clock.clone())
        .expect("default config is valid");
    uploader.check_status().await;
    (uploader, backend, clock)
}
