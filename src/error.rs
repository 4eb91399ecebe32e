//! Error taxonomy for the capture → upload → associate pipeline.
//!
//! Step-level failures ([`StepFailure`]) never leave the encoder ladder; only the
//! exhaustion of the ladder surfaces as [`PipelineError::UploadFailed`].

use thiserror::Error;

use crate::contract::Permission;
use crate::media::Encoding;

/// Errors returned by an [`ObjectStore`](crate::contract::ObjectStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("encoding not supported by the store transport")]
    Unsupported,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("store rejected object (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("store transport error: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }
}

/// Errors while re-reading the bytes behind a local media handle.
#[derive(Error, Debug)]
pub enum MediaReadError {
    #[error("media not found at {uri}")]
    NotFound { uri: String },

    #[error("unsupported media locator: {uri}")]
    UnsupportedUri { uri: String },

    #[error("I/O error reading media: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Why a single ladder step did not produce an upload.
#[derive(Error, Debug)]
pub enum StepFailure {
    #[error("{encoding}: read produced zero bytes")]
    EmptyPayload { encoding: Encoding },

    #[error("{encoding}: {source}")]
    Read {
        encoding: Encoding,
        #[source]
        source: MediaReadError,
    },

    #[error("{encoding}: {source}")]
    Store {
        encoding: Encoding,
        #[source]
        source: StoreError,
    },
}

impl StepFailure {
    pub fn encoding(&self) -> Encoding {
        match self {
            StepFailure::EmptyPayload { encoding }
            | StepFailure::Read { encoding, .. }
            | StepFailure::Store { encoding, .. } => *encoding,
        }
    }

    /// A missing credential cannot be fixed by a different encoding.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepFailure::Store {
                source: StoreError::Unauthenticated,
                ..
            }
        )
    }
}

/// Terminal outcome of the ladder when no encoding got through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("upload failed: {reason}")]
pub struct UploadFailed {
    pub reason: String,
}

/// Failures from the capture device, distinct from denial and cancellation.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("capture device error: {message}")]
    Device { message: String },

    #[error("capture source unavailable: {message}")]
    Unavailable { message: String },
}

/// Mandatory draft fields that were blank at submission time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required fields: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

/// Failures at the association boundary (remote punch API).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("network error: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },

    #[error("server error {status}: {}", message.as_deref().unwrap_or("Unknown error"))]
    Server { status: u16, message: Option<String> },

    #[error("request could not be built: {message}")]
    Client { message: String },
}

/// Errors surfaced by the pipeline session to the UI layer.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("permission denied: {permission}")]
    PermissionDenied { permission: Permission },

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error(transparent)]
    UploadFailed(#[from] UploadFailed),

    #[error("association failed: {0}")]
    Association(#[from] ApiError),

    #[error("no failed upload to retry")]
    NothingToRetry,
}

impl PipelineError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation(v) => {
                format!("Please fill in required fields: {}", v.missing.join(", "))
            }
            PipelineError::PermissionDenied { permission } => {
                format!("Permission to access the {permission} was denied")
            }
            PipelineError::Acquire(e) => e.to_string(),
            PipelineError::UploadFailed(e) => format!("Image upload failed: {}", e.reason),
            PipelineError::Association(e) => match e {
                ApiError::Unauthenticated => "No authentication token found".to_string(),
                ApiError::Validation(v) => {
                    format!("Please fill in required fields: {}", v.missing.join(", "))
                }
                ApiError::Network { .. } => {
                    "Network error. Please check your connection.".to_string()
                }
                ApiError::Server { status, message } => format!(
                    "Server error: {} - {}",
                    status,
                    message.as_deref().unwrap_or("Unknown error")
                ),
                ApiError::Client { message } => message.clone(),
            },
            PipelineError::NothingToRetry => "There is no failed upload to retry".to_string(),
        }
    }
}
