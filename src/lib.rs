//! Everywhere library - notebook sharing and sync core.
//!
//! The library is organized into the following modules:
//!
//! - `models`: Notebook documents, sharing metadata and API wire types
//! - `client`: HTTP client for the sharing service
//! - `resolver`: Decides create / update / skip and builds metadata patches
//! - `orchestrator`: Save/sync state machine and the manual Share flow
//! - `url_state`: Startup parameters and address bar synchronization
//! - `launcher`: What the editor opens with on page load
//! - `hub`: Local development sharing service

pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod hub;
pub mod kernels;
pub mod launcher;
pub mod models;
pub mod notebook;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod upload;
pub mod url_state;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use models::{
    Cell, CellKind, CellSource, NotebookDocument, SharedNotebookRecord, SharedNotebookRef,
    SharingMetadata,
};

pub use error::{
    AuthError, ConfigError, LaunchError, LocalPersistError, RetrieveError, RetrieveFailure,
    ShareError, ShareFailure, SyncError, UpdateError, UploadError,
};

pub use config::{Config, HubConfig};

pub use client::{make_retrieve_url, SharingApi, SharingClient};

pub use host::{AddressBar, DocumentModel, HostUi, OpenMode, Workspace};

pub use orchestrator::{DocumentSession, Orchestrator, ShareOutcome, SyncOutcome, SyncState};

pub use resolver::{resolve, SyncAction, Trigger};

pub use launcher::{LaunchOutcome, Launcher};

pub use notebook::{create_copy, export_for_download, leave_action, LeaveAction};

pub use upload::UploadStaging;

pub use url_state::{StartupIntent, UrlSync};
