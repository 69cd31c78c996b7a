//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::UiConfig;
use crate::overrides::{FileOverrideStore, OverrideStore};
use crate::schema::{SchemaCatalog, SchemaMigrator};
use crate::sync::SyncOrchestrator;
use crate::template::PatternExtractor;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Read/save entry point for UI configuration
    pub orchestrator: SyncOrchestrator,

    /// Persisted overrides, for bulk listing
    pub overrides: Arc<dyn OverrideStore>,

    /// JWT secret key for token validation
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(catalog: Arc<dyn SchemaCatalog>, ui: &UiConfig, jwt_secret: String) -> Self {
        let overrides: Arc<dyn OverrideStore> = Arc::new(FileOverrideStore::new(&ui.overrides_dir));
        let orchestrator = SyncOrchestrator::new(
            Arc::new(PatternExtractor),
            overrides.clone(),
            SchemaMigrator::new(catalog),
            &ui.templates_dir,
        );

        Self {
            orchestrator,
            overrides,
            jwt_secret,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
