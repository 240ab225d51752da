//! In-memory stand-ins for the host and the sharing service.
//!
//! Every fake is a cheap `Rc` handle: hand one clone to the code under test
//! and keep another to inspect what happened.

use crate::client::{make_retrieve_url, SharingApi};
use crate::error::{
    AuthError, HostError, LocalPersistError, RetrieveError, RetrieveFailure, ShareError,
    ShareFailure, UpdateError,
};
use crate::host::{
    AddressBar, DocumentModel, HostUi, LinkDialogAction, OpenMode, ShareLinkDialog, ToastLevel,
    Workspace,
};
use crate::models::{NotebookDocument, SharedNotebookRecord, SharedNotebookRef};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

pub const APP_URL: &str = "http://app.test/lab/index.html";

// ============================================================================
// Sharing Service
// ============================================================================

#[derive(Default)]
pub struct ApiState {
    pub has_token: bool,
    pub auth_calls: usize,
    pub auth_fails: bool,
    pub shares: Vec<NotebookDocument>,
    pub updates: Vec<(String, NotebookDocument)>,
    pub retrieves: Vec<String>,
    pub created: Option<SharedNotebookRef>,
    pub share_failure: Option<(ShareFailure, u16)>,
    pub update_failure: Option<(ShareFailure, u16)>,
    pub records: HashMap<String, SharedNotebookRecord>,
}

#[derive(Clone, Default)]
pub struct FakeApi {
    pub state: Rc<RefCell<ApiState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default().with_created("abc123", None)
    }

    pub fn with_created(self, id: &str, readable_id: Option<&str>) -> Self {
        self.state.borrow_mut().created = Some(SharedNotebookRef {
            id: id.to_string(),
            readable_id: readable_id.map(str::to_string),
        });
        self
    }

    pub fn failing_share(self, reason: ShareFailure, status: u16) -> Self {
        self.state.borrow_mut().share_failure = Some((reason, status));
        self
    }

    pub fn failing_update(self, reason: ShareFailure, status: u16) -> Self {
        self.state.borrow_mut().update_failure = Some((reason, status));
        self
    }

    pub fn failing_auth(self) -> Self {
        self.state.borrow_mut().auth_fails = true;
        self
    }

    pub fn with_record(self, record: SharedNotebookRecord) -> Self {
        {
            let mut state = self.state.borrow_mut();
            if let Some(alias) = &record.readable_id {
                state.records.insert(alias.clone(), record.clone());
            }
            state.records.insert(record.id.clone(), record);
        }
        self
    }

    pub fn share_count(&self) -> usize {
        self.state.borrow().shares.len()
    }

    pub fn update_ids(&self) -> Vec<String> {
        self.state.borrow().updates.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn network_calls(&self) -> usize {
        let state = self.state.borrow();
        state.auth_calls + state.shares.len() + state.updates.len() + state.retrieves.len()
    }
}

impl SharingApi for FakeApi {
    async fn authenticate(&self) -> Result<(), AuthError> {
        let mut state = self.state.borrow_mut();
        if state.has_token {
            return Ok(());
        }
        state.auth_calls += 1;
        if state.auth_fails {
            return Err(AuthError {
                message: "token service unavailable".to_string(),
            });
        }
        state.has_token = true;
        Ok(())
    }

    async fn share(&self, content: &NotebookDocument) -> Result<SharedNotebookRef, ShareError> {
        // suspend once, like a real request would
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        state.shares.push(content.clone());
        if let Some((reason, status)) = state.share_failure {
            return Err(ShareError {
                reason,
                status: Some(status),
                message: format!("rejected with {}", status),
            });
        }
        Ok(state.created.clone().unwrap_or(SharedNotebookRef {
            id: "abc123".to_string(),
            readable_id: None,
        }))
    }

    async fn update(&self, id: &str, content: &NotebookDocument) -> Result<(), UpdateError> {
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        state.updates.push((id.to_string(), content.clone()));
        if let Some((reason, status)) = state.update_failure {
            return Err(UpdateError {
                reason,
                status: Some(status),
                message: format!("rejected with {}", status),
            });
        }
        Ok(())
    }

    async fn retrieve(&self, id: &str) -> Result<SharedNotebookRecord, RetrieveError> {
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        state.retrieves.push(id.to_string());
        state.records.get(id).cloned().ok_or_else(|| RetrieveError {
            reason: RetrieveFailure::NotFound,
            message: format!("Notebook \"{}\" was not found", id),
        })
    }

    fn make_retrieve_url(&self, id: &str) -> Url {
        make_retrieve_url(&Url::parse(APP_URL).unwrap(), id)
    }
}

// ============================================================================
// Document Model
// ============================================================================

#[derive(Default)]
pub struct ModelState {
    pub doc: NotebookDocument,
    pub saves: usize,
    pub failing_saves: usize,
}

#[derive(Clone, Default)]
pub struct FakeModel {
    pub state: Rc<RefCell<ModelState>>,
}

impl FakeModel {
    pub fn new(doc: NotebookDocument) -> Self {
        let model = Self::default();
        model.state.borrow_mut().doc = doc;
        model
    }

    /// The next `n` saves fail.
    pub fn failing_saves(self, n: usize) -> Self {
        self.state.borrow_mut().failing_saves = n;
        self
    }

    pub fn doc(&self) -> NotebookDocument {
        self.state.borrow().doc.clone()
    }

    pub fn saves(&self) -> usize {
        self.state.borrow().saves
    }
}

impl DocumentModel for FakeModel {
    fn to_json(&self) -> NotebookDocument {
        self.doc()
    }

    fn from_json(&self, doc: NotebookDocument) {
        self.state.borrow_mut().doc = doc;
    }

    async fn save(&self) -> Result<(), LocalPersistError> {
        let mut state = self.state.borrow_mut();
        if state.failing_saves > 0 {
            state.failing_saves -= 1;
            return Err(LocalPersistError("disk full".to_string()));
        }
        state.saves += 1;
        Ok(())
    }
}

// ============================================================================
// Host UI
// ============================================================================

pub struct UiState {
    pub toasts: Vec<(ToastLevel, String)>,
    pub errors: Vec<(String, String)>,
    pub links: Vec<ShareLinkDialog>,
    pub prompts: Vec<String>,
    /// `None` cancels the prompt, `Some(None)` accepts the default.
    pub name_answer: Option<Option<String>>,
    pub link_action: LinkDialogAction,
    pub clipboard: Vec<String>,
    pub clipboard_fails: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            toasts: Vec::new(),
            errors: Vec::new(),
            links: Vec::new(),
            prompts: Vec::new(),
            name_answer: Some(None),
            link_action: LinkDialogAction::Close,
            clipboard: Vec::new(),
            clipboard_fails: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeUi {
    pub state: Rc<RefCell<UiState>>,
}

impl FakeUi {
    pub fn answering_name(self, name: &str) -> Self {
        self.state.borrow_mut().name_answer = Some(Some(name.to_string()));
        self
    }

    pub fn cancelling_prompt(self) -> Self {
        self.state.borrow_mut().name_answer = None;
        self
    }

    pub fn copying_link(self) -> Self {
        self.state.borrow_mut().link_action = LinkDialogAction::CopyLink;
        self
    }

    pub fn toasts(&self) -> Vec<(ToastLevel, String)> {
        self.state.borrow().toasts.clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.state.borrow().errors.clone()
    }

    pub fn links(&self) -> Vec<ShareLinkDialog> {
        self.state.borrow().links.clone()
    }
}

impl HostUi for FakeUi {
    fn toast(&self, level: ToastLevel, message: &str) {
        self.state.borrow_mut().toasts.push((level, message.to_string()));
    }

    async fn show_error(&self, title: &str, message: &str) {
        self.state
            .borrow_mut()
            .errors
            .push((title.to_string(), message.to_string()));
    }

    async fn show_link(&self, dialog: ShareLinkDialog) -> LinkDialogAction {
        let mut state = self.state.borrow_mut();
        state.links.push(dialog);
        state.link_action
    }

    async fn prompt_share_name(&self, default_name: &str) -> Option<String> {
        let mut state = self.state.borrow_mut();
        state.prompts.push(default_name.to_string());
        state
            .name_answer
            .clone()
            .map(|answer| answer.unwrap_or_else(|| default_name.to_string()))
    }

    async fn copy_to_clipboard(&self, text: &str) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        if state.clipboard_fails {
            return Err(HostError("clipboard blocked".to_string()));
        }
        state.clipboard.push(text.to_string());
        Ok(())
    }
}

// ============================================================================
// Address Bar
// ============================================================================

#[derive(Clone)]
pub struct FakeAddress {
    url: Rc<RefCell<Url>>,
    replacements: Rc<RefCell<usize>>,
}

impl FakeAddress {
    pub fn new(url: &str) -> Self {
        Self {
            url: Rc::new(RefCell::new(Url::parse(url).unwrap())),
            replacements: Rc::new(RefCell::new(0)),
        }
    }

    pub fn replacements(&self) -> usize {
        *self.replacements.borrow()
    }

    pub fn param(&self, key: &str) -> Option<String> {
        self.url
            .borrow()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

impl AddressBar for FakeAddress {
    fn current(&self) -> Url {
        self.url.borrow().clone()
    }

    fn replace(&self, url: Url) {
        *self.url.borrow_mut() = url;
        *self.replacements.borrow_mut() += 1;
    }
}

// ============================================================================
// Workspace
// ============================================================================

#[derive(Default)]
pub struct WorkspaceState {
    pub saved: Vec<(String, NotebookDocument, bool)>,
    pub opened: Vec<(String, OpenMode)>,
    pub created: Vec<String>,
    pub alerts: Vec<String>,
    pub fail_open: bool,
}

#[derive(Clone, Default)]
pub struct FakeWorkspace {
    pub state: Rc<RefCell<WorkspaceState>>,
}

impl FakeWorkspace {
    pub fn failing_open(self) -> Self {
        self.state.borrow_mut().fail_open = true;
        self
    }

    pub fn saved(&self) -> Vec<(String, NotebookDocument, bool)> {
        self.state.borrow().saved.clone()
    }

    pub fn opened(&self) -> Vec<(String, OpenMode)> {
        self.state.borrow().opened.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.state.borrow().created.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.state.borrow().alerts.clone()
    }
}

impl Workspace for FakeWorkspace {
    async fn save_notebook(
        &self,
        path: &str,
        content: &NotebookDocument,
        writable: bool,
    ) -> Result<(), LocalPersistError> {
        self.state
            .borrow_mut()
            .saved
            .push((path.to_string(), content.clone(), writable));
        Ok(())
    }

    async fn open_notebook(&self, path: &str, mode: OpenMode) -> Result<(), HostError> {
        let mut state = self.state.borrow_mut();
        if state.fail_open {
            return Err(HostError(format!("cannot open {}", path)));
        }
        state.opened.push((path.to_string(), mode));
        Ok(())
    }

    async fn create_new_notebook(&self, kernel_name: &str) -> Result<(), HostError> {
        self.state.borrow_mut().created.push(kernel_name.to_string());
        Ok(())
    }

    async fn alert(&self, message: &str) {
        self.state.borrow_mut().alerts.push(message.to_string());
    }
}
