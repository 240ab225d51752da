//! Pure notebook transformations.
//!
//! Language detection, the view-only and create-copy transforms, download
//! export and the leave decision all operate on plain `NotebookDocument`s and
//! never touch the host.

use crate::kernels::{Kernel, DEFAULT_KERNEL};
use crate::models::{
    NotebookDocument, SharedNotebookRecord, DOMAIN_ID_KEY, IS_SHARED_NOTEBOOK_KEY,
    READABLE_ID_KEY, SHARED_ID_KEY, SHARING_METADATA_KEYS,
};
use serde_json::{json, Value};

#[cfg(test)]
#[path = "notebook_test.rs"]
mod notebook_test;

const EDITABLE_KEY: &str = "editable";

// ============================================================================
// Content Inspection
// ============================================================================

/// A notebook is empty when no cell has any non-whitespace source.
pub fn is_notebook_empty(doc: &NotebookDocument) -> bool {
    !doc.cells
        .iter()
        .any(|cell| cell.source.to_text().chars().any(|c| !c.is_whitespace()))
}

/// Language of the notebook from `kernelspec.language`, then `language_info.name`.
///
/// Only Python and R are recognised.
pub fn detect_language(doc: &NotebookDocument) -> Option<Kernel> {
    let from_kernelspec = doc
        .metadata
        .get("kernelspec")
        .and_then(|k| k.get("language"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    let from_language_info = doc
        .metadata
        .get("language_info")
        .and_then(|k| k.get("name"))
        .and_then(Value::as_str);

    match from_kernelspec
        .or(from_language_info)
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "python" => Some(Kernel::Python),
        "r" => Some(Kernel::R),
        _ => None,
    }
}

/// Kernel to open an imported notebook with: `xr` for R, the stock kernel otherwise.
pub fn kernel_for_document(doc: &NotebookDocument) -> &'static str {
    match detect_language(doc) {
        Some(Kernel::R) => Kernel::R.kernel_name(),
        _ => DEFAULT_KERNEL,
    }
}

/// Point the document's kernelspec at `kernel_name`.
pub fn set_kernelspec(doc: &mut NotebookDocument, kernel_name: &str) {
    let display_name = Kernel::from_kernel_name(kernel_name)
        .map(Kernel::display_name)
        .unwrap_or(kernel_name);
    doc.metadata.insert(
        "kernelspec".to_string(),
        json!({ "name": kernel_name, "display_name": display_name }),
    );
}

// ============================================================================
// Transforms
// ============================================================================

/// Turn a retrieved record into a locked, view-only document.
pub fn make_view_only(record: &SharedNotebookRecord) -> NotebookDocument {
    let mut doc = record.content.clone();

    for cell in &mut doc.cells {
        cell.metadata
            .insert(EDITABLE_KEY.to_string(), Value::Bool(false));
    }

    doc.metadata
        .insert(IS_SHARED_NOTEBOOK_KEY.to_string(), Value::Bool(true));
    doc.metadata
        .insert(SHARED_ID_KEY.to_string(), Value::String(record.id.clone()));
    match &record.readable_id {
        Some(readable) => {
            doc.metadata
                .insert(READABLE_ID_KEY.to_string(), Value::String(readable.clone()));
        }
        None => {
            doc.metadata.remove(READABLE_ID_KEY);
        }
    }
    match &record.domain_id {
        Some(domain) => {
            doc.metadata
                .insert(DOMAIN_ID_KEY.to_string(), Value::String(domain.clone()));
        }
        None => {
            doc.metadata.remove(DOMAIN_ID_KEY);
        }
    }

    doc
}

/// Local file name a retrieved notebook is stored under.
pub fn view_only_filename(record: &SharedNotebookRecord) -> String {
    format!(
        "Shared_{}.ipynb",
        record.readable_id.as_deref().unwrap_or(&record.id)
    )
}

/// Remove every sharing-owned key from the document metadata.
pub fn strip_sharing_metadata(doc: &mut NotebookDocument) {
    for key in SHARING_METADATA_KEYS {
        doc.metadata.remove(*key);
    }
}

/// An editable, unshared copy of a view-only notebook. The kernel is kept.
pub fn create_copy(view_only: &NotebookDocument) -> NotebookDocument {
    let mut doc = view_only.clone();
    strip_sharing_metadata(&mut doc);
    for cell in &mut doc.cells {
        cell.metadata.remove(EDITABLE_KEY);
    }
    if !doc.metadata.contains_key("kernelspec") {
        set_kernelspec(&mut doc, kernel_for_document(view_only));
    }
    doc
}

/// The document as offered for download: no sharing identity leaks into the file.
pub fn export_for_download(doc: &NotebookDocument) -> NotebookDocument {
    let mut exported = doc.clone();
    strip_sharing_metadata(&mut exported);
    exported
}

// ============================================================================
// Leave Decision
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    /// Nothing worth keeping, go straight to the landing page.
    NavigateHome,
    /// Ask whether to save (share) before leaving.
    Confirm,
}

pub fn leave_action(view_only: bool, doc: &NotebookDocument) -> LeaveAction {
    if view_only || is_notebook_empty(doc) {
        LeaveAction::NavigateHome
    } else {
        LeaveAction::Confirm
    }
}
