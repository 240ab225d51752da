//! Local staging of uploaded notebooks.
//!
//! An upload is parsed and checked once, then parked in sled until the page
//! that imports it loads with `uploaded-notebook=<id>`.

use crate::error::UploadError;
use crate::models::NotebookDocument;
use crate::notebook::detect_language;
use crate::store::LocalStore;
use tracing::{debug, info};
use uuid::Uuid;

const UPLOADS_TREE: &str = "uploads";
const KEY_PREFIX: &str = "uploaded-notebook:";

fn staging_key(id: &str) -> String {
    format!("{}{}", KEY_PREFIX, id)
}

#[derive(Clone)]
pub struct UploadStaging {
    store: LocalStore,
}

impl UploadStaging {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Parse and stage an uploaded `.ipynb`. Returns the id to put in the
    /// `uploaded-notebook` page parameter.
    pub fn stage(&self, raw: &str) -> Result<String, UploadError> {
        let doc: NotebookDocument = serde_json::from_str(raw)?;
        if detect_language(&doc).is_none() {
            return Err(UploadError::UnsupportedLanguage);
        }

        let id = Uuid::new_v4().to_string();
        self.store.put(UPLOADS_TREE, &staging_key(&id), &doc)?;
        self.store.flush()?;
        info!("Staged uploaded notebook {}", id);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Option<NotebookDocument>, UploadError> {
        Ok(self.store.get(UPLOADS_TREE, &staging_key(id))?)
    }

    pub fn remove(&self, id: &str) -> Result<(), UploadError> {
        debug!("Removing staged upload {}", id);
        self.store.remove(UPLOADS_TREE, &staging_key(id))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod upload_test;
