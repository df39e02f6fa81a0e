//! Core types for replay-upload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Unique identifier for an upload item
///
/// Assigned locally by the [`Uploader`](crate::Uploader), never by the server. Two files
/// with the same name get distinct ids even though they share a server-side polling key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(pub u64);

impl UploadId {
    /// Create a new UploadId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for UploadId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A locally selected file, before any network interaction
#[derive(Clone)]
pub struct FileCandidate {
    name: String,
    content: Arc<[u8]>,
}

impl FileCandidate {
    /// Create a candidate from a file name and its raw content
    pub fn new(name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a candidate from a local file, using the final path component as its name
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("'{}' has no file name", path.display()),
                )
            })?;
        let content = tokio::fs::read(path).await?;
        Ok(Self::new(name, content))
    }

    /// File name as selected by the user
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the content in bytes
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Shared handle to the raw content
    pub fn content(&self) -> Arc<[u8]> {
        Arc::clone(&self.content)
    }
}

impl std::fmt::Debug for FileCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCandidate")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}

/// Why a file was rejected before any request was made
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Name does not end with the required extension
    WrongExtension {
        /// The extension that was required (e.g. ".replay")
        expected: String,
    },
    /// Smaller than the configured minimum
    TooSmall {
        /// Actual size in bytes
        size: u64,
    },
    /// Larger than the configured maximum
    TooLarge {
        /// Actual size in bytes
        size: u64,
    },
}

impl RejectReason {
    /// Label shown next to the rejected item
    pub fn label(&self) -> String {
        match self {
            RejectReason::WrongExtension { expected } => {
                format!("NOT A {} FILE", expected.to_uppercase())
            }
            RejectReason::TooSmall { size } => format!("TOO SMALL ({})", format_size(*size)),
            RejectReason::TooLarge { size } => format!("TOO LARGE ({})", format_size(*size)),
        }
    }
}

/// Why an upload item failed after validation passed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// Session was not (or no longer) authenticated
    NotAuthenticated,
    /// Server answered the upload with a non-success status
    ServerRejected {
        /// HTTP status code returned by the server, if the response was readable
        status: Option<u16>,
        /// Error message supplied by the server, if any
        message: Option<String>,
    },
    /// No response was received for the upload
    NetworkError,
    /// Server reported that processing failed
    ProcessingFailed,
    /// Processing did not finish within the polling budget
    ProcessingTimeout,
    /// A status query failed at the transport level
    StatusCheckFailed,
}

impl FailureReason {
    /// Label shown next to the failed item
    pub fn label(&self) -> String {
        match self {
            FailureReason::NotAuthenticated => "NOT AUTHENTICATED".to_string(),
            FailureReason::ServerRejected { message, .. } => message
                .clone()
                .unwrap_or_else(|| "UPLOAD FAILED".to_string()),
            FailureReason::NetworkError => "NETWORK ERROR".to_string(),
            FailureReason::ProcessingFailed => "PROCESSING FAILED".to_string(),
            FailureReason::ProcessingTimeout => "PROCESSING TIMEOUT".to_string(),
            FailureReason::StatusCheckFailed => "STATUS CHECK FAILED".to_string(),
        }
    }
}

/// Upload item status
///
/// `Queued -> Uploading -> Processing -> {Succeeded | Failed | Duplicate}`, with
/// `RejectedLocally` and early `Failed`/`Duplicate` reachable straight from the
/// earlier states. Terminal states never transition again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    /// Created, not yet validated or started
    Queued,
    /// Request body is being sent
    Uploading,
    /// Committed on the server, waiting for processing to finish
    Processing,
    /// Server finished processing the file
    Succeeded,
    /// Failed with a reason
    Failed(FailureReason),
    /// Server already has this content
    Duplicate,
    /// Rejected by local validation, never sent
    RejectedLocally(RejectReason),
}

impl Status {
    /// Whether no further transition can happen from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Succeeded | Status::Failed(_) | Status::Duplicate | Status::RejectedLocally(_)
        )
    }

    /// Whether this state is a failure (duplicates are not)
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed(_) | Status::RejectedLocally(_))
    }

    /// Position in the forward lifecycle, used to refuse backwards transitions
    fn rank(&self) -> u8 {
        match self {
            Status::Queued => 0,
            Status::Uploading => 1,
            Status::Processing => 2,
            _ => 3,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: &Status) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Status::RejectedLocally(_) => matches!(self, Status::Queued),
            Status::Processing => matches!(self, Status::Uploading),
            Status::Succeeded => matches!(self, Status::Processing),
            _ => next.rank() > self.rank(),
        }
    }

    /// Human-readable label for the presentation layer
    pub fn label(&self) -> String {
        match self {
            // A new entry reads as uploading until validation decides otherwise
            Status::Queued | Status::Uploading => "UPLOADING...".to_string(),
            Status::Processing => "PROCESSING...".to_string(),
            Status::Succeeded => "PROCESSED".to_string(),
            Status::Duplicate => "DUPLICATE".to_string(),
            Status::Failed(reason) => reason.label(),
            Status::RejectedLocally(reason) => reason.label(),
        }
    }

    /// Coarse presentation kind: `uploading`, `processing`, `success`, `duplicate` or `error`
    pub fn kind(&self) -> &'static str {
        match self {
            Status::Queued | Status::Uploading => "uploading",
            Status::Processing => "processing",
            Status::Succeeded => "success",
            Status::Duplicate => "duplicate",
            Status::Failed(_) | Status::RejectedLocally(_) => "error",
        }
    }
}

/// The UI-visible record of one file's journey
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadItem {
    /// Locally assigned identifier
    pub id: UploadId,
    /// Original file name
    pub name: String,
    /// Size of the file in bytes
    pub size_bytes: u64,
    /// Current status
    pub status: Status,
    /// Human-readable status message
    pub message: String,
    /// Upload progress in [0, 1]
    pub progress: f64,
    /// Server-assigned filename used for status polling, once committed
    pub server_filename: Option<String>,
    /// When the item was created
    pub created_at: DateTime<Utc>,
}

impl UploadItem {
    /// Create a queued item for a candidate
    pub fn new(id: UploadId, candidate: &FileCandidate) -> Self {
        let status = Status::Queued;
        Self {
            id,
            name: candidate.name().to_string(),
            size_bytes: candidate.size(),
            message: status.label(),
            status,
            progress: 0.0,
            server_filename: None,
            created_at: Utc::now(),
        }
    }

    /// Apply a status transition; returns false (and leaves the item untouched) if illegal
    pub fn transition(&mut self, next: Status) -> bool {
        if !self.status.can_transition_to(&next) {
            return false;
        }
        self.message = next.label();
        self.status = next;
        true
    }

    /// Record upload progress, clamped to [0, 1] and never moving backwards
    pub fn set_progress(&mut self, progress: UploadProgress) {
        let fraction = progress.fraction();
        if fraction > self.progress {
            self.progress = fraction;
        }
    }
}

/// Bytes sent so far for one upload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProgress {
    /// Bytes handed to the transport so far
    pub sent: u64,
    /// Total bytes of the file body
    pub total: u64,
}

impl UploadProgress {
    /// Progress as a fraction in [0, 1]; an empty body counts as complete
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.sent as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// Server-side processing state reported by the status endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    /// Processing finished successfully
    Processed,
    /// Processing failed
    Error,
    /// Anything else (pending, unknown, missing) means keep waiting
    Pending(String),
}

impl ProcessingState {
    /// Interpret the `status` field of a status response
    pub fn from_wire(status: Option<&str>) -> Self {
        match status {
            Some("processed") => ProcessingState::Processed,
            Some("error") => ProcessingState::Error,
            Some(other) => ProcessingState::Pending(other.to_string()),
            None => ProcessingState::Pending(String::new()),
        }
    }
}

/// Authentication state of the current session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Whether uploads are permitted
    pub authenticated: bool,
    /// Anti-forgery token sent on state-changing requests
    pub csrf_token: String,
}

/// Event emitted during the upload lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new item was added to the top of the list
    ItemAdded {
        /// Upload ID
        id: UploadId,
        /// File name
        name: String,
    },

    /// An item changed status
    StatusChanged {
        /// Upload ID
        id: UploadId,
        /// New status
        status: Status,
        /// Label for the new status
        message: String,
    },

    /// Upload progress for an item
    Progress {
        /// Upload ID
        id: UploadId,
        /// Bytes sent so far
        sent: u64,
        /// Total bytes
        total: u64,
    },

    /// One status query completed while processing
    StatusPolled {
        /// Upload ID
        id: UploadId,
        /// 1-based attempt number
        attempt: u32,
        /// Reported state
        state: ProcessingState,
    },

    /// The session's authentication state changed
    SessionChanged {
        /// Whether uploads are now permitted
        authenticated: bool,
    },
}

/// Format a byte count the way rejection labels show it: `B`, whole `KB`, or `MB` with one decimal
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < MIB {
        format!("{:.0} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}
