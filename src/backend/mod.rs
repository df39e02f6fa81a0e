//! Backend contract consumed by the uploader.
//!
//! [`UploadBackend`] is the seam between the orchestration logic and the wire:
//! - [`http`] - production implementation over reqwest
//!
//! Every method returns `Err` only when no usable response arrived. HTTP-level
//! outcomes (401, 409, 4xx with an error body) are ordinary values.

mod http;


pub use http::HttpBackend;

use crate::error::Result;
use crate::types::{FileCandidate, ProcessingState, UploadProgress};
use serde::Deserialize;

/// Response of `GET auth/status`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AuthStatus {
    /// Whether the current session may upload
    #[serde(default)]
    pub authenticated: bool,
    /// Anti-forgery token for this session
    #[serde(default)]
    pub csrf_token: String,
}

/// Outcome of `POST auth`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    /// 2xx response; `authenticated` mirrors the body flag
    Accepted {
        /// Whether the body confirmed authentication
        authenticated: bool,
    },
    /// Non-2xx response
    Rejected {
        /// HTTP status code
        status: u16,
        /// The `error` field of the body, if present
        message: Option<String>,
    },
}

/// Outcome of `POST upload`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadResponse {
    /// `201 Created`; `filename` is the key for status polling
    Created {
        /// Server-assigned filename
        filename: String,
    },
    /// `409 Conflict`: the server already has this content
    Duplicate,
    /// `401 Unauthorized`: the session is no longer valid
    Unauthorized,
    /// Any other status
    Rejected {
        /// HTTP status code
        status: u16,
        /// The `error` field of the body, if present
        message: Option<String>,
    },
}

/// Everything needed to send one file
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// The file to send as the multipart `file` field
    pub file: FileCandidate,
    /// Value for the `X-CSRF-Token` header
    pub csrf_token: String,
}

/// Channel on which a backend reports bytes sent while an upload is in flight
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<UploadProgress>;

/// Abstraction over the upload service, enabling testability.
#[async_trait::async_trait]
pub trait UploadBackend: Send + Sync {
    /// `GET auth/status`
    async fn auth_status(&self) -> Result<AuthStatus>;

    /// `POST auth` with `{password}` and the CSRF header
    async fn authenticate(&self, password: &str, csrf_token: &str) -> Result<AuthOutcome>;

    /// `POST upload` as multipart, reporting progress as the body is consumed
    async fn upload(&self, request: UploadRequest, progress: ProgressSender)
    -> Result<UploadResponse>;

    /// `GET upload/status?filename=<filename>`
    async fn upload_status(&self, filename: &str) -> Result<ProcessingState>;
}
