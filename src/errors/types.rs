//! Error type definitions for the ordo-sync pipeline.
//!
//! Degraded parses and empty candidate lists are values, not errors: the
//! segmenter and matchers always return best-effort output. The error
//! types here cover the places where the run genuinely cannot continue,
//! almost all of them at the remote boundary.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Remote presentation-controller errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Reconciliation errors
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} '{name}'")]
    NotFound { resource: String, name: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors from the presentation-controller HTTP API
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Request exceeded the configured timeout
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote accepted the connection but rejected the call.
    /// Body is reported verbatim; the controller's messages are often
    /// the only clue to what it disliked.
    #[error("Remote rejected request: status {status} - {body}")]
    Rejected { status: u16, body: String },

    /// Response did not match the expected shape
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

/// Errors from playlist reconciliation
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A leaf item would have shipped with an empty content identifier.
    /// The controller rejects the whole write in that case with a
    /// generic error, so this is caught at the output boundary instead.
    #[error("Leaf item '{name}' has an empty content id")]
    EmptyContentId { name: String },

    /// The whole-array replace call was rejected by the remote
    #[error("Playlist write rejected: {0}")]
    WriteRejected(#[source] RemoteError),
}

impl AppError {
    /// Create a configuration error with a custom message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found<R: Into<String>, N: Into<String>>(resource: R, name: N) -> Self {
        Self::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
