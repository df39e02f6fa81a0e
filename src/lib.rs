//! # replay-upload
//!
//! Client library for uploading `.replay` files to a replay processing service.
//!
//! ## Design Philosophy
//!
//! replay-upload is designed to be:
//! - **Non-blocking** - Every accepted file runs in its own task; a slow upload never holds up the rest
//! - **Fail-closed** - No upload request is sent without an authenticated session
//! - **Event-driven** - Consumers subscribe to events or watch the item list
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! Each submitted file becomes an [`UploadItem`] that walks a one-way lifecycle:
//! `Queued -> Uploading -> Processing -> Succeeded`, or ends early in `Duplicate`,
//! `Failed` or `RejectedLocally`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use replay_upload::{Config, FileCandidate, Uploader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let uploader = Uploader::connect(Config::default()).await?;
//!     if !uploader.is_authenticated() {
//!         uploader.authenticate("secret").await?;
//!     }
//!
//!     // Subscribe to events
//!     let mut events = uploader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let file = FileCandidate::from_path("match1.replay").await?;
//!     uploader.submit(vec![file]).await;
//!     uploader.wait_idle().await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Transport to the upload service
pub mod backend;
/// Time source used for polling
pub mod clock;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Processing status polling
pub mod poller;
/// Authentication state
pub mod session;
/// Core types and events
pub mod types;
/// Upload orchestration (decomposed into focused submodules)
pub mod uploader;
/// Local file validation
pub mod validator;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use backend::{HttpBackend, UploadBackend};
pub use clock::{Clock, TokioClock};
pub use config::{Config, PollingConfig, ServerConfig, UploadConfig, ValidationConfig};
pub use error::{Error, Result};
pub use poller::{PollEvent, StatusPoller};
pub use session::SessionGate;
pub use types::{
    Event, FailureReason, FileCandidate, ProcessingState, RejectReason, SessionState, Status,
    UploadId, UploadItem, UploadProgress,
};
pub use uploader::Uploader;
pub use validator::validate;
