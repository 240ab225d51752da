//! Error taxonomy for sharing, retrieval and local persistence.
//!
//! Each error knows how to describe itself to a student via `user_message()`;
//! "too large", "not found" and generic failures always read differently.

use thiserror::Error;

const TOO_LARGE_MESSAGE: &str = "This notebook is too large to share. \
Try clearing large outputs or removing big images, then share again.";

const NOT_FOUND_MESSAGE: &str = "This notebook could not be found. \
The link may be wrong or the notebook was removed.";

/// Why a share or update request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareFailure {
    /// The request never got a response (connection, DNS, decoding).
    Network,
    /// The server answered with a non-success status.
    ServerRejected,
    /// The server refused the payload size (HTTP 413).
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieveFailure {
    NotFound,
    Network,
    ServerRejected,
}

#[derive(Debug, Error)]
#[error("Failed to authenticate with the sharing service: {message}")]
pub struct AuthError {
    pub message: String,
}

#[derive(Debug, Error)]
#[error("Failed to share notebook: {message}")]
pub struct ShareError {
    pub reason: ShareFailure,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("Failed to update shared notebook: {message}")]
pub struct UpdateError {
    pub reason: ShareFailure,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("Failed to retrieve shared notebook: {message}")]
pub struct RetrieveError {
    pub reason: RetrieveFailure,
    pub message: String,
}

/// The document could not be written to local storage.
#[derive(Debug, Error)]
#[error("Failed to save notebook locally: {0}")]
pub struct LocalPersistError(pub String);

/// A host command (open, create, clipboard) failed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HostError(pub String);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Sled(#[from] sled::Error),
    #[error("Corrupt stored value: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read this notebook: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Only Python and R notebooks are supported. Please upload a valid notebook.")]
    UnsupportedLanguage,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Anything that can end a sync attempt.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Share(#[from] ShareError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
    #[error(transparent)]
    LocalPersist(#[from] LocalPersistError),
}

/// Why a notebook could not be opened at page load.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
    #[error(transparent)]
    LocalPersist(#[from] LocalPersistError),
    #[error("Failed to open notebook: {0}")]
    Host(#[from] HostError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("No uploaded notebook found for ID: {0}")]
    UploadMissing(String),
}

impl LaunchError {
    pub fn user_message(&self) -> String {
        match self {
            LaunchError::Retrieve(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

impl ShareError {
    pub fn is_too_large(&self) -> bool {
        self.reason == ShareFailure::TooLarge
    }

    pub fn user_message(&self) -> String {
        match self.reason {
            ShareFailure::TooLarge => TOO_LARGE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl UpdateError {
    pub fn is_too_large(&self) -> bool {
        self.reason == ShareFailure::TooLarge
    }

    pub fn user_message(&self) -> String {
        match self.reason {
            ShareFailure::TooLarge => TOO_LARGE_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl RetrieveError {
    pub fn user_message(&self) -> String {
        match self.reason {
            RetrieveFailure::NotFound => NOT_FOUND_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl SyncError {
    pub fn is_too_large(&self) -> bool {
        match self {
            SyncError::Share(e) => e.is_too_large(),
            SyncError::Update(e) => e.is_too_large(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SyncError::Share(e) => e.user_message(),
            SyncError::Update(e) => e.user_message(),
            SyncError::Retrieve(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
