//! Filesystem override store
//!
//! One pretty-printed `<id>.json` per component plus `index.json`, the
//! aggregate of every record, rebuilt in full after each save.

use super::{OverrideRecord, OverrideStore};
use crate::error::AppError;
use crate::schema::is_valid_identifier;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const INDEX_FILE: &str = "index.json";

pub struct FileOverrideStore {
    dir: PathBuf,
    /// Serializes revision check, record write and index rebuild
    write_lock: Mutex<()>,
}

impl FileOverrideStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, AppError> {
        if !is_valid_identifier(id) || id == "index" {
            return Err(AppError::Validation(format!("Invalid component id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    async fn read_record(path: &Path) -> Result<Option<OverrideRecord>, AppError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a sibling temp file so readers never see a torn record
    async fn write_file(path: &Path, contents: &str) -> Result<(), AppError> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn rebuild_index(&self) -> Result<(), AppError> {
        let records = self.list().await?;
        let index = serde_json::to_string_pretty(&records)?;
        Self::write_file(&self.dir.join(INDEX_FILE), &index).await?;
        info!("Rebuilt {} with {} records", INDEX_FILE, records.len());
        Ok(())
    }
}

#[async_trait]
impl OverrideStore for FileOverrideStore {
    async fn load(&self, id: &str) -> Result<Option<OverrideRecord>, AppError> {
        let path = self.record_path(id)?;
        let record = Self::read_record(&path).await?;
        debug!("Override for {}: {}", id, if record.is_some() { "found" } else { "none" });
        Ok(record)
    }

    async fn save(
        &self,
        record: &OverrideRecord,
        expected_revision: Option<&str>,
    ) -> Result<(), AppError> {
        let path = self.record_path(&record.form_name)?;
        let _guard = self.write_lock.lock().await;

        if let Some(expected) = expected_revision {
            let current = Self::read_record(&path).await?;
            let current_revision = current.as_ref().map(|r| r.revision.as_str());
            if current_revision != Some(expected) {
                warn!(
                    "Stale save for {}: expected revision {}, stored {}",
                    record.form_name,
                    expected,
                    current_revision.unwrap_or("none")
                );
                return Err(AppError::Conflict(format!(
                    "Configuration for '{}' was changed by someone else; reload and retry",
                    record.form_name
                )));
            }
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let text = serde_json::to_string_pretty(record)?;
        Self::write_file(&path, &text).await?;
        info!("Saved override for {} (revision {})", record.form_name, record.revision);

        self.rebuild_index().await
    }

    async fn list(&self) -> Result<BTreeMap<String, OverrideRecord>, AppError> {
        let mut records = BTreeMap::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_record = path.extension().map_or(false, |ext| ext == "json")
                && path.file_name().map_or(false, |name| name != INDEX_FILE);
            if !is_record {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => {
                    records.insert(record.form_name.clone(), record);
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable override {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }
}
