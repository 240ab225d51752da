//! Page-load flow.
//!
//! Decides what the editor opens with from the startup parameters: a shared
//! notebook (view-only), a staged upload, a blank notebook, or nothing when
//! the user landed on the Files page. Anything that goes wrong while opening
//! a shared notebook or an upload ends in a blank notebook, never a dead page.

use crate::client::SharingApi;
use crate::error::LaunchError;
use crate::host::{AddressBar, OpenMode, Workspace};
use crate::kernels::kernel_for_new_notebook;
use crate::models::NotebookDocument;
use crate::notebook::{
    create_copy, kernel_for_document, make_view_only, set_kernelspec, view_only_filename,
};
use crate::upload::UploadStaging;
use crate::url_state::{StartupIntent, Tab, UrlSync};
use serde_json::Value;
use tracing::{debug, error, info, warn};

#[cfg(test)]
#[path = "launcher_test.rs"]
mod launcher_test;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Shared notebook opened view-only from this local path.
    Shared { path: String },
    Uploaded { path: String },
    Blank { kernel: &'static str },
    /// Files page requested, no notebook opened.
    FilesPage,
    /// Even the blank notebook could not be created.
    NothingOpened,
}

impl LaunchOutcome {
    pub fn opened_notebook(&self) -> bool {
        matches!(
            self,
            LaunchOutcome::Shared { .. }
                | LaunchOutcome::Uploaded { .. }
                | LaunchOutcome::Blank { .. }
        )
    }
}

pub struct Launcher<S, W, A> {
    api: S,
    workspace: W,
    url: UrlSync<A>,
    uploads: UploadStaging,
}

impl<S: SharingApi, W: Workspace, A: AddressBar> Launcher<S, W, A> {
    pub fn new(api: S, workspace: W, address: A, uploads: UploadStaging) -> Self {
        Self {
            api,
            workspace,
            url: UrlSync::new(address),
            uploads,
        }
    }

    pub fn url(&self) -> &UrlSync<A> {
        &self.url
    }

    /// Open whatever the page parameters ask for.
    pub async fn launch(&self) -> LaunchOutcome {
        let intent = StartupIntent::from_url(&self.url.address().current());
        debug!("Startup intent: {:?}", intent);

        let outcome = if let Some(id) = &intent.notebook_id {
            self.load_shared(id).await
        } else if let Some(id) = &intent.uploaded_id {
            self.open_uploaded(id).await
        } else if intent.wants_files() {
            LaunchOutcome::FilesPage
        } else {
            self.create_new().await
        };

        if intent.tab == Some(Tab::Notebook) && outcome.opened_notebook() {
            self.url.on_tab_consumed();
        }
        outcome
    }

    // ========================================================================
    // Shared Notebooks
    // ========================================================================

    /// Retrieve a shared notebook and open it view-only.
    ///
    /// On failure the user is told why and gets a blank notebook instead.
    pub async fn load_shared(&self, id: &str) -> LaunchOutcome {
        info!("Loading shared notebook {}", id);
        match self.try_load_shared(id).await {
            Ok(path) => {
                self.url.on_view_only_opened();
                info!("Loaded shared notebook: {}", path);
                LaunchOutcome::Shared { path }
            }
            Err(e) => {
                error!("Failed to load shared notebook {}: {}", id, e);
                self.workspace
                    .alert(&format!(
                        "Failed to load shared notebook \"{}\": {}",
                        id,
                        e.user_message()
                    ))
                    .await;
                self.create_new().await
            }
        }
    }

    async fn try_load_shared(&self, id: &str) -> Result<String, LaunchError> {
        self.api.authenticate().await?;
        let record = self.api.retrieve(id).await?;

        let doc = make_view_only(&record);
        let path = view_only_filename(&record);
        self.workspace.save_notebook(&path, &doc, false).await?;
        self.workspace.open_notebook(&path, OpenMode::ViewOnly).await?;
        Ok(path)
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    /// Import a staged upload. The staging entry is consumed either way.
    pub async fn open_uploaded(&self, id: &str) -> LaunchOutcome {
        let result = self.try_open_uploaded(id).await;
        if let Err(e) = self.uploads.remove(id) {
            warn!("Failed to remove staged upload {}: {}", id, e);
        }

        match result {
            Ok(path) => {
                self.url.on_upload_imported();
                info!("Opened uploaded notebook: {}", path);
                LaunchOutcome::Uploaded { path }
            }
            Err(e) => {
                error!("Failed to open uploaded notebook: {}", e);
                self.create_new().await
            }
        }
    }

    async fn try_open_uploaded(&self, id: &str) -> Result<String, LaunchError> {
        let mut doc = self
            .uploads
            .get(id)?
            .ok_or_else(|| LaunchError::UploadMissing(id.to_string()))?;

        let kernel = kernel_for_document(&doc);
        set_kernelspec(&mut doc, kernel);

        let path = uploaded_filename(&doc, id);
        self.workspace.save_notebook(&path, &doc, true).await?;
        self.workspace.open_notebook(&path, OpenMode::Editable).await?;
        Ok(path)
    }

    // ========================================================================
    // Blank Notebooks and Copies
    // ========================================================================

    /// New notebook with the kernel named by the current `kernel` parameter.
    pub async fn create_new(&self) -> LaunchOutcome {
        let intent = StartupIntent::from_url(&self.url.address().current());
        let kernel = kernel_for_new_notebook(intent.kernel.as_deref());

        match self.workspace.create_new_notebook(kernel).await {
            Ok(()) => {
                info!("Created new notebook with kernel: {}", kernel);
                LaunchOutcome::Blank { kernel }
            }
            Err(e) => {
                error!("Failed to create new notebook: {}", e);
                LaunchOutcome::NothingOpened
            }
        }
    }

    /// Save and open an editable, unshared copy of a view-only notebook.
    /// Returns the path of the copy.
    pub async fn create_copy(&self, view_only: &NotebookDocument) -> Result<String, LaunchError> {
        let copy = create_copy(view_only);
        let path = copy_filename(view_only);

        self.workspace.save_notebook(&path, &copy, true).await?;
        self.workspace.open_notebook(&path, OpenMode::Editable).await?;
        self.url.on_copy_created();
        info!("Created editable copy: {}", path);
        Ok(path)
    }

    /// The kernel of the open notebook finished starting.
    pub fn on_kernel_ready(&self) {
        self.url.on_kernel_ready();
    }
}

fn uploaded_filename(doc: &NotebookDocument, id: &str) -> String {
    let stem = doc
        .metadata
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Uploaded_{}", id));
    format!("{}.ipynb", stem)
}

fn copy_filename(view_only: &NotebookDocument) -> String {
    let sharing = view_only.sharing();
    match sharing.link_id() {
        Some(id) => format!("Copy_of_{}.ipynb", id),
        None => "Copy.ipynb".to_string(),
    }
}
