//! Interfaces the host application provides to the sharing core.
//!
//! The host owns the document model, dialogs, the address bar and file
//! storage. The core only hands it content to show and reads back what the
//! user chose.

use crate::error::{HostError, LocalPersistError};
use crate::models::NotebookDocument;
use std::future::Future;
use url::Url;

/// One open notebook editor.
pub trait DocumentModel {
    fn to_json(&self) -> NotebookDocument;

    /// Replace the in-memory document content.
    fn from_json(&self, doc: NotebookDocument);

    /// Persist to local storage. The host reports completion through the
    /// save-completed event.
    fn save(&self) -> impl Future<Output = Result<(), LocalPersistError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Warning,
    Error,
}

/// Content of the "here is your link" dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkDialog {
    pub link: String,
    /// First share of this notebook, as opposed to showing an existing link.
    pub is_new_share: bool,
    pub view_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDialogAction {
    CopyLink,
    Close,
}

/// Dialogs, notifications and the clipboard.
pub trait HostUi {
    /// Non-blocking notification.
    fn toast(&self, level: ToastLevel, message: &str);

    /// Modal error the user has to acknowledge.
    fn show_error(&self, title: &str, message: &str) -> impl Future<Output = ()>;

    fn show_link(&self, dialog: ShareLinkDialog) -> impl Future<Output = LinkDialogAction>;

    /// Ask for the name of a notebook about to be shared. `None` means cancelled.
    fn prompt_share_name(&self, default_name: &str) -> impl Future<Output = Option<String>>;

    fn copy_to_clipboard(&self, text: &str) -> impl Future<Output = Result<(), HostError>>;
}

/// The browser address bar. Changes never add history entries.
pub trait AddressBar {
    fn current(&self) -> Url;
    fn replace(&self, url: Url);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Editable,
    ViewOnly,
}

/// Local file storage plus the document-opening commands.
pub trait Workspace {
    fn save_notebook(
        &self,
        path: &str,
        content: &NotebookDocument,
        writable: bool,
    ) -> impl Future<Output = Result<(), LocalPersistError>>;

    fn open_notebook(
        &self,
        path: &str,
        mode: OpenMode,
    ) -> impl Future<Output = Result<(), HostError>>;

    fn create_new_notebook(
        &self,
        kernel_name: &str,
    ) -> impl Future<Output = Result<(), HostError>>;

    /// Blocking browser alert.
    fn alert(&self, message: &str) -> impl Future<Output = ()>;
}
