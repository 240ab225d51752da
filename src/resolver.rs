//! Share state resolution.
//!
//! Given a notebook's sharing metadata and what triggered the sync, decide
//! whether to create a new shared notebook, update the existing one, or do
//! nothing. The metadata changes that follow a successful action are described
//! by a `MetadataPatch` and merged with `apply_patch`, so none of this needs a
//! host document model.

use crate::models::{
    SharedNotebookRef, SharingMetadata, LAST_SHARED_KEY, READABLE_ID_KEY, SHARED_ID_KEY,
    SHARED_NAME_KEY,
};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

#[cfg(test)]
#[path = "resolver_test.rs"]
mod resolver_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The host finished saving the document.
    AutoSave,
    /// The user pressed Share.
    ManualShare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    Update { shared_id: String },
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Someone else's notebook opened read-only; it never syncs back.
    ViewOnly,
}

/// Decide what to do with the notebook for the given trigger.
///
/// | view-only | has sharedId | action |
/// |---|---|---|
/// | yes | any | Skip |
/// | no  | no  | Create |
/// | no  | yes | Update |
///
/// The trigger does not change the action; it only changes what the caller
/// shows afterwards.
pub fn resolve(sharing: &SharingMetadata, _trigger: Trigger) -> SyncAction {
    if sharing.is_shared_notebook {
        return SyncAction::Skip(SkipReason::ViewOnly);
    }

    match &sharing.shared_id {
        Some(id) => SyncAction::Update {
            shared_id: id.clone(),
        },
        None => SyncAction::Create,
    }
}

// ============================================================================
// Metadata Patch
// ============================================================================

/// Metadata changes to apply after a successful Create or Update.
///
/// `Identity` sets every sharing field at once; `Touch` only refreshes the
/// timestamp, so an update can never rewrite the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataPatch {
    Identity {
        shared_id: String,
        readable_id: Option<String>,
        shared_name: String,
        last_shared: DateTime<Utc>,
    },
    Touch { last_shared: DateTime<Utc> },
}

impl MetadataPatch {
    pub fn for_create(
        created: &SharedNotebookRef,
        shared_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        MetadataPatch::Identity {
            shared_id: created.id.clone(),
            readable_id: created.readable_id.clone().filter(|r| !r.is_empty()),
            shared_name,
            last_shared: now,
        }
    }

    pub fn for_update(now: DateTime<Utc>) -> Self {
        MetadataPatch::Touch { last_shared: now }
    }
}

/// Merge a patch into notebook metadata. Keys outside the patch are left alone.
pub fn apply_patch(metadata: &mut Map<String, Value>, patch: &MetadataPatch) {
    match patch {
        MetadataPatch::Identity {
            shared_id,
            readable_id,
            shared_name,
            last_shared,
        } => {
            metadata.insert(SHARED_ID_KEY.to_string(), Value::String(shared_id.clone()));
            match readable_id {
                Some(readable) => {
                    metadata.insert(
                        READABLE_ID_KEY.to_string(),
                        Value::String(readable.clone()),
                    );
                }
                None => {
                    metadata.remove(READABLE_ID_KEY);
                }
            }
            metadata.insert(
                SHARED_NAME_KEY.to_string(),
                Value::String(shared_name.clone()),
            );
            metadata.insert(
                LAST_SHARED_KEY.to_string(),
                Value::String(format_timestamp(last_shared)),
            );
        }
        MetadataPatch::Touch { last_shared } => {
            metadata.insert(
                LAST_SHARED_KEY.to_string(),
                Value::String(format_timestamp(last_shared)),
            );
        }
    }
}

/// `2024-06-20T00:10:20.123Z`
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `Notebook_YYYY-MM-DD_HH-MM-SS` for the given wall-clock time.
pub fn default_notebook_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("Notebook_%Y-%m-%d_%H-%M-%S").to_string()
}
