//! Save/sync orchestration.
//!
//! Each open notebook gets a `DocumentSession`. The host calls
//! `Orchestrator::on_save_completed` whenever it finishes saving that
//! document, and `Orchestrator::share_manually` when the user presses Share.
//!
//! Per session the sync runs `Idle -> Saving -> Syncing -> SyncedOk | SyncFailed -> Idle`.
//! At most one sync is in flight per session: a save-completed event that
//! arrives while one is running is dropped, and the manual-share marker
//! suppresses the save-completed event fired by the manual path's own save.
//! Share pressed during an auto-sync waits for that sync and shows its link.
//! Local document content is never rolled back on failure.

use crate::client::SharingApi;
use crate::error::{LocalPersistError, SyncError};
use crate::host::{
    AddressBar, DocumentModel, HostUi, LinkDialogAction, ShareLinkDialog, ToastLevel,
};
use crate::models::{NotebookDocument, SharedNotebookRef};
use crate::resolver::{
    apply_patch, default_notebook_name, resolve, MetadataPatch, SkipReason, SyncAction, Trigger,
};
use crate::url_state::UrlSync;
use chrono::{Local, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod orchestrator_test;

const SHARE_ERROR_TITLE: &str = "Error Sharing Notebook";

// ============================================================================
// Session State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Saving,
    Syncing,
    SyncedOk,
    SyncFailed,
}

impl SyncState {
    fn is_busy(self) -> bool {
        matches!(self, SyncState::Saving | SyncState::Syncing)
    }
}

/// Result of handling one save-completed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A manual share owns this save.
    Suppressed,
    /// Another sync was already in flight.
    Coalesced,
    Skipped(SkipReason),
    Created(SharedNotebookRef),
    Updated { shared_id: String },
    Failed { too_large: bool },
    /// The document closed while the request was in flight.
    Discarded,
}

/// Result of a manual share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Created(SharedNotebookRef),
    Updated { shared_id: String },
    /// View-only notebook: the existing link was shown, nothing was sent.
    ShownExisting,
    /// The user dismissed the name prompt.
    Cancelled,
    /// Another manual share of this document is already running.
    Coalesced,
    Discarded,
}

/// Sync bookkeeping for one open document instance.
pub struct DocumentSession<D> {
    model: D,
    state: Mutex<SyncState>,
    manual_share: AtomicBool,
    closed: AtomicBool,
    last_flight_ok: AtomicBool,
    idle: Notify,
}

impl<D: DocumentModel> DocumentSession<D> {
    pub fn new(model: D) -> Self {
        Self {
            model,
            state: Mutex::new(SyncState::Idle),
            manual_share: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            last_flight_ok: AtomicBool::new(false),
            idle: Notify::new(),
        }
    }

    pub fn model(&self) -> &D {
        &self.model
    }

    pub fn state(&self) -> SyncState {
        self.state.lock().map(|s| *s).unwrap_or(SyncState::Idle)
    }

    pub fn is_sharing_manually(&self) -> bool {
        self.manual_share.load(Ordering::Acquire)
    }

    /// The editor was closed. Results of in-flight requests are ignored.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Enter `Saving` unless a sync is already in flight.
    fn begin_flight(&self) -> Option<FlightGuard<'_, D>> {
        let mut state = self.state.lock().ok()?;
        if state.is_busy() {
            return None;
        }
        *state = SyncState::Saving;
        self.last_flight_ok.store(false, Ordering::Release);
        Some(FlightGuard { session: self })
    }

    /// Resolves once no sync is in flight.
    async fn wait_until_idle(&self) {
        loop {
            // registered before the check so a wakeup in between is not lost
            let notified = self.idle.notified();
            if !self.state().is_busy() {
                return;
            }
            notified.await;
        }
    }

    /// The most recent flight reached the server and committed.
    fn last_flight_ok(&self) -> bool {
        self.last_flight_ok.load(Ordering::Acquire)
    }

    fn set_state(&self, next: SyncState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    fn begin_manual(&self) -> Option<ManualShareMarker<'_, D>> {
        if self.state().is_busy() {
            return None;
        }
        self.manual_share
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ManualShareMarker { session: self })
    }
}

/// Holds the session out of `Idle`; returns it there on drop.
struct FlightGuard<'a, D: DocumentModel> {
    session: &'a DocumentSession<D>,
}

impl<D: DocumentModel> FlightGuard<'_, D> {
    fn syncing(&self) {
        self.session.set_state(SyncState::Syncing);
    }

    fn finish(&self, ok: bool) {
        self.session.last_flight_ok.store(ok, Ordering::Release);
        self.session.set_state(if ok {
            SyncState::SyncedOk
        } else {
            SyncState::SyncFailed
        });
    }
}

impl<D: DocumentModel> Drop for FlightGuard<'_, D> {
    fn drop(&mut self) {
        self.session.set_state(SyncState::Idle);
        self.session.idle.notify_waiters();
    }
}

struct ManualShareMarker<'a, D: DocumentModel> {
    session: &'a DocumentSession<D>,
}

impl<D: DocumentModel> Drop for ManualShareMarker<'_, D> {
    fn drop(&mut self) {
        self.session.manual_share.store(false, Ordering::Release);
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator<S, U, A> {
    api: S,
    ui: U,
    url: UrlSync<A>,
}

impl<S: SharingApi, U: HostUi, A: AddressBar> Orchestrator<S, U, A> {
    pub fn new(api: S, ui: U, address: A) -> Self {
        Self {
            api,
            ui,
            url: UrlSync::new(address),
        }
    }

    pub fn api(&self) -> &S {
        &self.api
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn url(&self) -> &UrlSync<A> {
        &self.url
    }

    /// Handle the host's save-completed event for `session`.
    ///
    /// Never returns an error: failures become a toast and the local
    /// document stays as the user left it.
    pub async fn on_save_completed<D: DocumentModel>(
        &self,
        session: &DocumentSession<D>,
    ) -> SyncOutcome {
        if session.is_sharing_manually() {
            debug!("Save completed during manual share, auto-sync suppressed");
            return SyncOutcome::Suppressed;
        }
        let Some(flight) = session.begin_flight() else {
            debug!("Sync already in flight, save-completed coalesced");
            return SyncOutcome::Coalesced;
        };

        let doc = session.model().to_json();
        let action = resolve(&doc.sharing(), Trigger::AutoSave);
        if let SyncAction::Skip(reason) = action {
            debug!("Auto-sync skipped: {:?}", reason);
            return SyncOutcome::Skipped(reason);
        }

        flight.syncing();
        let result = self.perform(&action, &doc, None).await;

        if session.is_closed() {
            debug!("Document closed during sync, result ignored");
            return SyncOutcome::Discarded;
        }

        match result {
            Ok((patch, created)) => {
                // still in flight: the commit's own save-completed is coalesced
                if let Err(e) = self.commit(session, &patch).await {
                    self.ui.toast(ToastLevel::Warning, &e.to_string());
                }
                flight.finish(true);
                match created {
                    Some(created) => {
                        self.url.on_shared(created.link_id());
                        info!("Notebook automatically shared as {}", created.id);
                        SyncOutcome::Created(created)
                    }
                    None => {
                        let shared_id = match action {
                            SyncAction::Update { shared_id } => shared_id,
                            _ => String::new(),
                        };
                        debug!("Notebook {} automatically synced", shared_id);
                        SyncOutcome::Updated { shared_id }
                    }
                }
            }
            Err(e) => {
                flight.finish(false);
                warn!("Automatic sync failed: {}", e);
                let level = if e.is_too_large() {
                    ToastLevel::Warning
                } else {
                    ToastLevel::Error
                };
                self.ui.toast(level, &e.user_message());
                SyncOutcome::Failed {
                    too_large: e.is_too_large(),
                }
            }
        }
    }

    /// The user pressed Share.
    ///
    /// View-only notebooks only show their existing link. Otherwise the
    /// document is saved, then shared (first time, after asking for a name)
    /// or updated, and the link is shown. Failures are shown in a modal and
    /// returned.
    pub async fn share_manually<D: DocumentModel>(
        &self,
        session: &DocumentSession<D>,
    ) -> Result<ShareOutcome, SyncError> {
        let sharing = session.model().to_json().sharing();
        if let SyncAction::Skip(SkipReason::ViewOnly) = resolve(&sharing, Trigger::ManualShare) {
            if let Some(id) = sharing.link_id() {
                self.show_link(id, false, true).await;
            }
            return Ok(ShareOutcome::ShownExisting);
        }

        let _marker = loop {
            if let Some(marker) = session.begin_manual() {
                break marker;
            }
            if session.is_sharing_manually() {
                debug!("Share requested while another share is running, coalesced");
                return Ok(ShareOutcome::Coalesced);
            }

            debug!("Share requested during auto-sync, waiting for it");
            let had_link = sharing.link_id().is_some();
            session.wait_until_idle().await;
            if session.is_closed() {
                return Ok(ShareOutcome::Discarded);
            }
            if session.last_flight_ok() {
                if let Some(outcome) = self.show_synced(session, !had_link).await {
                    return Ok(outcome);
                }
            }
            // the auto-sync failed or was dropped: share from scratch
        };

        // the save-completed event from this save is suppressed by the marker
        if let Err(e) = session.model().save().await {
            let e = SyncError::from(e);
            self.ui.show_error(SHARE_ERROR_TITLE, &e.user_message()).await;
            return Err(e);
        }

        let Some(flight) = session.begin_flight() else {
            return Ok(ShareOutcome::Coalesced);
        };

        let doc = session.model().to_json();
        let action = resolve(&doc.sharing(), Trigger::ManualShare);

        let name = match action {
            SyncAction::Create => {
                let default_name = default_notebook_name(&Local::now());
                match self.ui.prompt_share_name(&default_name).await {
                    Some(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
                    Some(_) => Some(default_name),
                    None => {
                        debug!("Share cancelled at name prompt");
                        return Ok(ShareOutcome::Cancelled);
                    }
                }
            }
            SyncAction::Update { .. } => None,
            SyncAction::Skip(_) => return Ok(ShareOutcome::ShownExisting),
        };

        flight.syncing();
        let result = self.perform(&action, &doc, name).await;

        if session.is_closed() {
            return Ok(ShareOutcome::Discarded);
        }

        match result {
            Ok((patch, created)) => {
                // still in flight: the commit's own save-completed is coalesced
                if let Err(e) = self.commit(session, &patch).await {
                    self.ui.toast(ToastLevel::Warning, &e.to_string());
                }
                flight.finish(true);
                match created {
                    Some(created) => {
                        self.url.on_shared(created.link_id());
                        info!("Notebook shared as {}", created.id);
                        self.show_link(created.link_id(), true, false).await;
                        Ok(ShareOutcome::Created(created))
                    }
                    None => {
                        let sharing = session.model().to_json().sharing();
                        let shared_id = sharing.shared_id.clone().unwrap_or_default();
                        if let Some(id) = sharing.link_id() {
                            self.show_link(id, false, false).await;
                        }
                        Ok(ShareOutcome::Updated { shared_id })
                    }
                }
            }
            Err(e) => {
                flight.finish(false);
                error!("Failed to share notebook: {}", e);
                self.ui.show_error(SHARE_ERROR_TITLE, &e.user_message()).await;
                Err(e)
            }
        }
    }

    /// "Save and leave": share first, but never block navigation on failure.
    pub async fn share_before_leaving<D: DocumentModel>(&self, session: &DocumentSession<D>) {
        if let Err(e) = self.share_manually(session).await {
            warn!("Failed to share notebook before leaving: {}", e);
        }
    }

    // ========================================================================
    // Steps
    // ========================================================================

    async fn perform(
        &self,
        action: &SyncAction,
        doc: &NotebookDocument,
        name: Option<String>,
    ) -> Result<(MetadataPatch, Option<SharedNotebookRef>), SyncError> {
        self.api.authenticate().await?;

        match action {
            SyncAction::Create => {
                let created = self.api.share(doc).await?;
                let name = name.unwrap_or_else(|| default_notebook_name(&Local::now()));
                let patch = MetadataPatch::for_create(&created, name, Utc::now());
                Ok((patch, Some(created)))
            }
            SyncAction::Update { shared_id } => {
                self.api.update(shared_id, doc).await?;
                Ok((MetadataPatch::for_update(Utc::now()), None))
            }
            SyncAction::Skip(_) => Ok((MetadataPatch::for_update(Utc::now()), None)),
        }
    }

    /// Apply the patch to the current document and persist it locally.
    ///
    /// The document is re-read so edits made during the request survive.
    /// A failed local save is retried once; the remote side is never re-synced.
    async fn commit<D: DocumentModel>(
        &self,
        session: &DocumentSession<D>,
        patch: &MetadataPatch,
    ) -> Result<(), LocalPersistError> {
        let mut doc = session.model().to_json();
        apply_patch(&mut doc.metadata, patch);
        session.model().from_json(doc);

        match session.model().save().await {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!("Local save after sync failed, retrying: {}", first);
                session.model().save().await
            }
        }
    }

    /// Show the link of a document an auto-sync just pushed, without another request.
    async fn show_synced<D: DocumentModel>(
        &self,
        session: &DocumentSession<D>,
        is_new_share: bool,
    ) -> Option<ShareOutcome> {
        let sharing = session.model().to_json().sharing();
        let shared_id = sharing.shared_id.clone()?;
        let link_id = sharing.link_id()?.to_string();

        self.show_link(&link_id, is_new_share, false).await;
        Some(if is_new_share {
            ShareOutcome::Created(SharedNotebookRef {
                id: shared_id,
                readable_id: sharing.readable_id,
            })
        } else {
            ShareOutcome::Updated { shared_id }
        })
    }

    async fn show_link(&self, id: &str, is_new_share: bool, view_only: bool) {
        let link = self.api.make_retrieve_url(id).to_string();
        let action = self
            .ui
            .show_link(ShareLinkDialog {
                link: link.clone(),
                is_new_share,
                view_only,
            })
            .await;

        if action == LinkDialogAction::CopyLink {
            if let Err(e) = self.ui.copy_to_clipboard(&link).await {
                error!("Failed to copy link: {}", e);
            }
        }
    }
}
