//! Override Store
//!
//! Administrator edits per component, persisted as whole records. A save
//! always replaces the full record for its id.

pub mod file_store;

pub use file_store::FileOverrideStore;

use crate::error::AppError;
use crate::template::Structure;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Persisted override for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRecord {
    pub form_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub structure: Structure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: String,
}

impl OverrideRecord {
    /// Build a record stamped with the current time and its revision.
    /// Save-only hints (previous header labels) are dropped.
    pub fn new(
        form_name: &str,
        title: Option<String>,
        mut structure: Structure,
        layout: Option<serde_json::Value>,
    ) -> Self {
        if let Structure::Table { columns } = &mut structure {
            for column in columns.iter_mut() {
                column.original_label = None;
            }
        }
        let revision = compute_revision(title.as_deref(), &structure, layout.as_ref());
        Self {
            form_name: form_name.to_string(),
            title,
            structure,
            layout,
            updated_at: Utc::now(),
            revision,
        }
    }
}

/// SHA-256 over the presentation payload; the timestamp is not part of it
pub fn compute_revision(
    title: Option<&str>,
    structure: &Structure,
    layout: Option<&serde_json::Value>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.unwrap_or_default().as_bytes());
    hasher.update([0u8]);
    // Serializing these types cannot fail: string keys, no non-finite floats
    hasher.update(serde_json::to_vec(structure).unwrap_or_default());
    hasher.update([0u8]);
    if let Some(layout) = layout {
        hasher.update(layout.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Key-value persistence for override records
#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<OverrideRecord>, AppError>;

    /// Replace the record for `record.form_name`. With `expected_revision`
    /// set, a stored record with a different revision fails with `Conflict`.
    async fn save(
        &self,
        record: &OverrideRecord,
        expected_revision: Option<&str>,
    ) -> Result<(), AppError>;

    /// Every stored record keyed by component id
    async fn list(&self) -> Result<BTreeMap<String, OverrideRecord>, AppError>;
}
