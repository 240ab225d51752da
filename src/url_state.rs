//! Address bar state.
//!
//! Page parameters are read once at startup into a `StartupIntent`. After that
//! the address is only written: sharing identity is projected onto the
//! `notebook` parameter and consumed parameters are stripped. Every write
//! replaces the current entry instead of pushing a new one.

use crate::host::AddressBar;
use tracing::debug;
use url::Url;

pub use crate::client::NOTEBOOK_PARAM;

pub const UPLOADED_NOTEBOOK_PARAM: &str = "uploaded-notebook";
pub const KERNEL_PARAM: &str = "kernel";
pub const TAB_PARAM: &str = "tab";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Files,
    Notebook,
}

/// What the page was opened for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupIntent {
    /// Shared notebook to open view-only, `.ipynb` suffix removed.
    pub notebook_id: Option<String>,
    /// Staged upload to import.
    pub uploaded_id: Option<String>,
    /// Requested kernel for a new notebook (`python` or `r`).
    pub kernel: Option<String>,
    pub tab: Option<Tab>,
    /// Landed on `/lab/files` directly.
    pub files_path: bool,
}

impl StartupIntent {
    pub fn from_url(url: &Url) -> Self {
        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };

        let notebook_id = param(NOTEBOOK_PARAM).map(|id| match id.strip_suffix(".ipynb") {
            Some(stripped) => stripped.to_string(),
            None => id,
        });
        let tab = param(TAB_PARAM).and_then(|t| match t.as_str() {
            "files" => Some(Tab::Files),
            "notebook" => Some(Tab::Notebook),
            _ => None,
        });
        let path = url.path();
        let files_path = path.ends_with("/lab/files") || path.contains("/lab/files/");

        Self {
            notebook_id: notebook_id.filter(|id| !id.is_empty()),
            uploaded_id: param(UPLOADED_NOTEBOOK_PARAM),
            kernel: param(KERNEL_PARAM),
            tab,
            files_path,
        }
    }

    /// The user came for the Files page, so no notebook is opened automatically.
    pub fn wants_files(&self) -> bool {
        self.files_path || self.tab == Some(Tab::Files)
    }
}

// ============================================================================
// Query Helpers
// ============================================================================

pub fn with_param(url: &Url, key: &str, value: &str) -> Url {
    let mut pairs = other_pairs(url, key);
    pairs.push((key.to_string(), value.to_string()));
    with_pairs(url, pairs)
}

pub fn without_param(url: &Url, key: &str) -> Url {
    with_pairs(url, other_pairs(url, key))
}

fn other_pairs(url: &Url, key: &str) -> Vec<(String, String)> {
    url.query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn with_pairs(url: &Url, pairs: Vec<(String, String)>) -> Url {
    let mut url = url.clone();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url
}

// ============================================================================
// Synchronizer
// ============================================================================

/// One-way projection from notebook state onto the address bar.
pub struct UrlSync<A> {
    address: A,
}

impl<A: AddressBar> UrlSync<A> {
    pub fn new(address: A) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &A {
        &self.address
    }

    /// A notebook was shared for the first time.
    pub fn on_shared(&self, link_id: &str) {
        self.set(NOTEBOOK_PARAM, link_id);
    }

    /// A view-only notebook was copied; the copy has no identity yet.
    pub fn on_copy_created(&self) {
        self.remove(NOTEBOOK_PARAM);
    }

    pub fn on_kernel_ready(&self) {
        self.remove(KERNEL_PARAM);
    }

    /// A view-only notebook was opened; the kernel request no longer applies.
    pub fn on_view_only_opened(&self) {
        self.remove(KERNEL_PARAM);
    }

    pub fn on_upload_imported(&self) {
        self.remove(UPLOADED_NOTEBOOK_PARAM);
    }

    /// The notebook the `tab=notebook` request asked for is on screen.
    pub fn on_tab_consumed(&self) {
        self.remove(TAB_PARAM);
    }

    fn set(&self, key: &str, value: &str) {
        let current = self.address.current();
        let next = with_param(&current, key, value);
        if next != current {
            debug!("Address: {}={}", key, value);
            self.address.replace(next);
        }
    }

    fn remove(&self, key: &str) {
        let current = self.address.current();
        if current.query_pairs().any(|(k, _)| k == key) {
            debug!("Address: removed {}", key);
            self.address.replace(without_param(&current, key));
        }
    }
}
