//! Sync Orchestrator
//!
//! Read path: extract the template, load the override, merge.
//! Save path: persist the override, add columns for new form fields, wire
//! the added fields into the template, rename edited table headers.
//!
//! The three side effects are independent. Only the override write aborts a
//! save; column and template failures are itemized in the result.

use crate::catalog::{self, ComponentDescriptor, ComponentKind};
use crate::error::{not_found_error, AppError};
use crate::merge::merge;
use crate::overrides::{OverrideRecord, OverrideStore};
use crate::schema::{ColumnStatus, MigrationOutcome, SchemaMigrator};
use crate::template::{extract_file, rename_header, Extractor, FormField, Structure, TableColumn, TemplatePatcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Merged schema returned to the editor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSchema {
    pub form_name: String,
    pub display_name: String,
    pub title: String,
    #[serde(flatten)]
    pub structure: Structure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// Edited schema as sent by the editor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub structure: Structure,
    #[serde(default)]
    pub layout: Option<serde_json::Value>,
    /// Revision the edit was based on; enables the stale-save check
    #[serde(default)]
    pub expected_revision: Option<String>,
}

/// Consolidated result of a save
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<Vec<MigrationOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patched_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_headers: Option<Vec<String>>,
    pub revision: String,
}

pub struct SyncOrchestrator {
    extractor: Arc<dyn Extractor>,
    patcher: TemplatePatcher,
    store: Arc<dyn OverrideStore>,
    migrator: SchemaMigrator,
    templates_dir: PathBuf,
}

impl SyncOrchestrator {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn OverrideStore>,
        migrator: SchemaMigrator,
        templates_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            patcher: TemplatePatcher,
            store,
            migrator,
            templates_dir: templates_dir.into(),
        }
    }

    pub fn migrator(&self) -> &SchemaMigrator {
        &self.migrator
    }

    fn descriptor(id: &str) -> Result<&'static ComponentDescriptor, AppError> {
        catalog::find(id).ok_or_else(|| not_found_error(format!("Unknown form '{}'", id)))
    }

    fn template_path(&self, descriptor: &ComponentDescriptor) -> PathBuf {
        self.templates_dir.join(descriptor.source_path)
    }

    /// Extracted structure merged with the stored override
    pub async fn effective_schema(&self, id: &str) -> Result<EffectiveSchema, AppError> {
        let descriptor = Self::descriptor(id)?;
        let extraction = extract_file(
            self.extractor.as_ref(),
            &self.template_path(descriptor),
            descriptor.kind,
        )
        .await;
        let record = self.store.load(descriptor.id).await?;

        let structure = merge(&extraction.structure, record.as_ref().map(|r| &r.structure));
        let title = record
            .as_ref()
            .and_then(|r| r.title.clone())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| descriptor.display_name.to_string());

        debug!(
            "Effective schema for {}: {} {} entries (override: {})",
            descriptor.id,
            structure.len(),
            structure.kind(),
            record.is_some()
        );

        Ok(EffectiveSchema {
            form_name: descriptor.id.to_string(),
            display_name: descriptor.display_name.to_string(),
            title,
            structure,
            layout: record.as_ref().and_then(|r| r.layout.clone()),
            error: extraction.error,
            revision: record.map(|r| r.revision),
        })
    }

    /// Persist an edit and propagate it to the table and the template
    pub async fn update_form_schema(&self, id: &str, update: SchemaUpdate) -> Result<SyncReport, AppError> {
        let descriptor = Self::descriptor(id)?;
        let renames = match &update.structure {
            Structure::Table { columns } => header_renames(columns),
            _ => Vec::new(),
        };

        let record = OverrideRecord::new(descriptor.id, update.title, update.structure, update.layout);
        self.store
            .save(&record, update.expected_revision.as_deref())
            .await?;

        let mut report = SyncReport {
            success: true,
            message: format!("Configuration for '{}' saved", descriptor.id),
            migrations: None,
            patched_fields: None,
            renamed_headers: None,
            revision: record.revision.clone(),
        };
        let mut notes = Vec::new();

        // Side effects follow the catalog kind, never the payload's
        match (&record.structure, descriptor.kind) {
            (Structure::Form { fields }, ComponentKind::Form) if !fields.is_empty() => {
                if catalog::table_for(descriptor.id).is_some() {
                    self.sync_fields(descriptor, fields, &mut report, &mut notes).await;
                } else {
                    debug!("{} is not bound to a table, skipping column sync", descriptor.id);
                }
            }
            (Structure::Table { .. }, ComponentKind::Table) if !renames.is_empty() => {
                self.rename_headers(descriptor, &renames, &mut report, &mut notes).await;
            }
            (structure, kind) if structure.kind() != kind => {
                warn!(
                    "{} payload saved for {} component {}, nothing synchronized",
                    structure.kind(),
                    kind,
                    descriptor.id
                );
                notes.push(format!(
                    "{} payload for a {} component, nothing synchronized",
                    structure.kind(),
                    kind
                ));
            }
            _ => {}
        }

        if !notes.is_empty() {
            report.message = format!("{}; {}", report.message, notes.join("; "));
        }
        info!("{}", report.message);
        Ok(report)
    }

    async fn sync_fields(
        &self,
        descriptor: &ComponentDescriptor,
        fields: &[FormField],
        report: &mut SyncReport,
        notes: &mut Vec<String>,
    ) {
        let outcomes = match self.migrator.auto_sync_form_to_table(descriptor.id, fields).await {
            Ok((_, outcomes)) => outcomes,
            Err(e) => {
                warn!("Column sync for {} skipped: {}", descriptor.id, e);
                notes.push(format!("column sync skipped: {}", e));
                return;
            }
        };

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        notes.push(format!("{} of {} columns synchronized", succeeded, outcomes.len()));

        let added: Vec<&FormField> = outcomes
            .iter()
            .filter(|o| o.status == ColumnStatus::Added)
            .filter_map(|o| fields.iter().find(|f| f.name == o.field))
            .collect();
        if !added.is_empty() {
            let path = self.template_path(descriptor);
            match self.patch_template(&path, &added).await {
                Ok(patched) => {
                    if !patched.is_empty() {
                        notes.push(format!("template updated with {}", patched.join(", ")));
                    }
                    report.patched_fields = Some(patched);
                }
                Err(e) => {
                    warn!("Could not patch template {}: {}", path.display(), e);
                    notes.push(format!("template not updated: {}", e));
                }
            }
        }
        report.migrations = Some(outcomes);
    }

    /// Apply the patcher for each field and write the template once
    async fn patch_template(&self, path: &Path, fields: &[&FormField]) -> Result<Vec<String>, AppError> {
        let mut source = tokio::fs::read_to_string(path).await?;
        let mut patched = Vec::new();
        for field in fields {
            let patch = self.patcher.patch(&source, field);
            if patch.changed() {
                debug!("Patched {} into {}: {:?}", field.name, path.display(), patch.applied);
                patched.push(field.name.clone());
                source = patch.source;
            } else {
                debug!("Template {} already renders {}", path.display(), field.name);
            }
        }
        if !patched.is_empty() {
            tokio::fs::write(path, &source).await?;
            info!("Wrote {} with new fields: {}", path.display(), patched.join(", "));
        }
        Ok(patched)
    }

    async fn rename_headers(
        &self,
        descriptor: &ComponentDescriptor,
        renames: &[(String, String)],
        report: &mut SyncReport,
        notes: &mut Vec<String>,
    ) {
        let path = self.template_path(descriptor);
        let mut source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) => {
                warn!("Could not read template {}: {}", path.display(), e);
                notes.push(format!("headers not renamed: {}", e));
                return;
            }
        };

        let mut renamed = Vec::new();
        let mut missing = Vec::new();
        for (old, new) in renames {
            match rename_header(&source, old, new) {
                Some(text) => {
                    source = text;
                    renamed.push(new.clone());
                }
                None => missing.push(old.clone()),
            }
        }

        if !renamed.is_empty() {
            if let Err(e) = tokio::fs::write(&path, &source).await {
                warn!("Could not write template {}: {}", path.display(), e);
                notes.push(format!("headers not renamed: {}", e));
                return;
            }
            info!("Renamed headers in {}: {}", path.display(), renamed.join(", "));
            notes.push(format!("renamed headers: {}", renamed.join(", ")));
        }
        if !missing.is_empty() {
            warn!("Headers not found in {}: {}", path.display(), missing.join(", "));
            notes.push(format!("headers not found: {}", missing.join(", ")));
        }
        report.renamed_headers = Some(renamed);
    }
}

/// (previous label, new label) for every edited header
fn header_renames(columns: &[TableColumn]) -> Vec<(String, String)> {
    columns
        .iter()
        .filter_map(|c| {
            let old = c.original_label.as_deref()?.trim();
            let new = c.label.trim();
            (!old.is_empty() && !new.is_empty() && old != new).then(|| (old.to_string(), new.to_string()))
        })
        .collect()
}
