//! Schema Migrator
//!
//! Adds one nullable-by-default column per new form field. Every failure is
//! reported as a per-field outcome; nothing here returns early for a batch.

use super::introspector::{CatalogError, SchemaCatalog};
use super::queries::SqlBuilder;
use super::{is_valid_identifier, FieldType, MigrationOutcome};
use crate::catalog::{self, ComponentKind};
use crate::error::AppError;
use crate::template::FormField;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A column addition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewColumn {
    pub name: String,
    pub field_type: String,
    /// `None` keeps the field type's own nullability
    pub nullable: Option<bool>,
    pub default_value: Option<String>,
}

impl NewColumn {
    /// Column for a saved form field: NOT NULL only when required and a
    /// default can fill existing rows
    pub fn from_field(field: &FormField) -> Self {
        let default_value = field
            .default_value
            .clone()
            .filter(|v| !v.trim().is_empty());
        let nullable = (field.required && default_value.is_some()).then_some(false);
        Self {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
            nullable,
            default_value,
        }
    }
}

#[derive(Clone)]
pub struct SchemaMigrator {
    catalog: Arc<dyn SchemaCatalog>,
}

impl SchemaMigrator {
    pub fn new(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &dyn SchemaCatalog {
        self.catalog.as_ref()
    }

    /// Add `column` to `table` unless it already exists
    pub async fn add_column(&self, table: &str, column: &NewColumn) -> MigrationOutcome {
        let name = column.name.as_str();
        if !is_valid_identifier(table) {
            warn!("Rejected column '{}': invalid table name '{}'", name, table);
            return MigrationOutcome::rejected(name, format!("Invalid table name '{}'", table));
        }
        if !is_valid_identifier(name) {
            warn!("Rejected invalid column name '{}'", name);
            return MigrationOutcome::rejected(
                name,
                format!(
                    "Invalid column name '{}': use letters, digits and underscores, not starting with a digit",
                    name
                ),
            );
        }

        match self.catalog.column_exists(table, name).await {
            Ok(true) => {
                debug!("Column {}.{} already exists, nothing to do", table, name);
                return MigrationOutcome::already_exists(name, table);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Could not check column {}.{}: {}", table, name, e);
                return MigrationOutcome::failed(name, format!("Could not check column: {}", e));
            }
        }

        let field_type: FieldType = match column.field_type.parse() {
            Ok(t) => t,
            Err(message) => {
                warn!("Rejected column '{}': {}", name, message);
                return MigrationOutcome::rejected(name, message);
            }
        };
        let definition =
            match field_type.column_definition(column.nullable, column.default_value.as_deref()) {
                Ok(definition) => definition,
                Err(message) => {
                    warn!("Rejected column '{}': {}", name, message);
                    return MigrationOutcome::rejected(name, message);
                }
            };

        let statement = SqlBuilder::add_column(table, name, &definition);
        match self.catalog.execute_ddl(&statement).await {
            Ok(()) => {
                info!("Executed: {}", statement);
                MigrationOutcome::added(name, table)
            }
            Err(CatalogError::DuplicateColumn(_)) => {
                debug!("Column {}.{} was added concurrently", table, name);
                MigrationOutcome::already_exists(name, table)
            }
            Err(e) => {
                warn!("Failed to add column {}.{}: {}", table, name, e);
                MigrationOutcome::failed(name, format!("Failed to add column: {}", e))
            }
        }
    }

    /// Add every field in turn; one outcome per field
    pub async fn sync_form_fields(&self, table: &str, fields: &[FormField]) -> Vec<MigrationOutcome> {
        let mut outcomes = Vec::with_capacity(fields.len());
        for field in fields {
            outcomes.push(self.add_column(table, &NewColumn::from_field(field)).await);
        }
        let added = outcomes.iter().filter(|o| o.success).count();
        info!("Synced {}/{} fields into table '{}'", added, outcomes.len(), table);
        outcomes
    }

    /// Resolve the descriptor's table and sync its non-standard fields
    pub async fn auto_sync_form_to_table(
        &self,
        descriptor_id: &str,
        fields: &[FormField],
    ) -> Result<(&'static str, Vec<MigrationOutcome>), AppError> {
        let descriptor = catalog::find(descriptor_id)
            .ok_or_else(|| AppError::NotFound(format!("Unknown form '{}'", descriptor_id)))?;
        if descriptor.kind != ComponentKind::Form {
            return Err(AppError::BadRequest(format!(
                "'{}' is a {} component, not a form",
                descriptor.id, descriptor.kind
            )));
        }
        let table = catalog::table_for(descriptor.id).ok_or_else(|| {
            AppError::BadRequest(format!("Form '{}' is not bound to a table", descriptor.id))
        })?;

        let candidates: Vec<FormField> = fields
            .iter()
            .filter(|f| !catalog::is_standard_field(&f.name))
            .cloned()
            .collect();
        Ok((table, self.sync_form_fields(table, &candidates).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::memory::MemoryCatalog;
    use crate::schema::ColumnStatus;
    use pretty_assertions::assert_eq;

    fn column(name: &str, field_type: &str) -> NewColumn {
        NewColumn {
            name: name.to_string(),
            field_type: field_type.to_string(),
            nullable: None,
            default_value: None,
        }
    }

    fn field(name: &str, field_type: &str) -> FormField {
        FormField {
            name: name.to_string(),
            label: name.to_string(),
            field_type: field_type.to_string(),
            required: false,
            order: 1,
            visible: true,
            default_value: None,
        }
    }

    fn migrator(catalog: &Arc<MemoryCatalog>) -> SchemaMigrator {
        SchemaMigrator::new(catalog.clone())
    }

    #[tokio::test]
    async fn test_add_column_twice_issues_one_statement() {
        let catalog = Arc::new(MemoryCatalog::with_table("users", &["id", "name"]));
        let migrator = migrator(&catalog);

        let first = migrator.add_column("users", &column("phone", "tel")).await;
        let second = migrator.add_column("users", &column("phone", "tel")).await;

        assert_eq!(first.status, ColumnStatus::Added);
        assert!(first.success);
        assert_eq!(second.status, ColumnStatus::AlreadyExists);
        assert!(second.success);
        assert_eq!(
            catalog.ddl(),
            vec!["ALTER TABLE \"users\" ADD COLUMN \"phone\" VARCHAR(50) NULL".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_reaches_ddl() {
        let catalog = Arc::new(MemoryCatalog::with_table("users", &["id"]));
        let outcome = migrator(&catalog)
            .add_column("users", &column("1bad; DROP TABLE x", "text"))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.status, ColumnStatus::Rejected);
        assert!(catalog.ddl().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected() {
        let catalog = Arc::new(MemoryCatalog::with_table("users", &["id"]));
        let outcome = migrator(&catalog).add_column("users", &column("color", "colour")).await;

        assert_eq!(outcome.status, ColumnStatus::Rejected);
        assert!(outcome.message.contains("Unsupported field type"));
        assert!(catalog.ddl().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_column_error_counts_as_existing() {
        let mut catalog = MemoryCatalog::with_table("users", &["id", "email"]);
        catalog.blind_existence = true;
        let catalog = Arc::new(catalog);

        let outcome = migrator(&catalog).add_column("users", &column("email", "email")).await;
        assert_eq!(outcome.status, ColumnStatus::AlreadyExists);
        assert!(outcome.success);
        assert_eq!(catalog.ddl().len(), 1);
    }

    #[tokio::test]
    async fn test_database_failure_is_reported_per_field() {
        let mut catalog = MemoryCatalog::with_table("users", &["id"]);
        catalog.fail_ddl = Some("connection reset".to_string());
        let catalog = Arc::new(catalog);

        let outcomes = migrator(&catalog)
            .sync_form_fields("users", &[field("phone", "tel"), field("bio", "textarea")])
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == ColumnStatus::Failed));
        assert!(outcomes[0].message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_sync_continues_after_rejection() {
        let catalog = Arc::new(MemoryCatalog::with_table("vendors", &["id"]));
        let outcomes = migrator(&catalog)
            .sync_form_fields(
                "vendors",
                &[field("bad name", "text"), field("active", "checkbox")],
            )
            .await;

        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(statuses, vec![ColumnStatus::Rejected, ColumnStatus::Added]);
        assert_eq!(
            catalog.ddl(),
            vec!["ALTER TABLE \"vendors\" ADD COLUMN \"active\" BOOLEAN NOT NULL DEFAULT FALSE".to_string()]
        );
    }

    #[tokio::test]
    async fn test_required_field_with_default_is_not_null() {
        let catalog = Arc::new(MemoryCatalog::with_table("assets", &["id"]));
        let mut status = field("status", "select");
        status.required = true;
        status.default_value = Some("active".to_string());

        migrator(&catalog).sync_form_fields("assets", &[status]).await;
        assert_eq!(
            catalog.ddl(),
            vec!["ALTER TABLE \"assets\" ADD COLUMN \"status\" VARCHAR(100) NOT NULL DEFAULT 'active'".to_string()]
        );
    }

    #[tokio::test]
    async fn test_auto_sync_skips_standard_fields() {
        let catalog = Arc::new(MemoryCatalog::with_table("users", &["id", "name"]));
        let (table, outcomes) = migrator(&catalog)
            .auto_sync_form_to_table(
                "UserForm",
                &[field("id", "number"), field("name", "text"), field("createdAt", "date"), field("phone", "tel")],
            )
            .await
            .unwrap();

        assert_eq!(table, "users");
        let summary: Vec<_> = outcomes.iter().map(|o| (o.field.as_str(), o.status)).collect();
        assert_eq!(
            summary,
            vec![("name", ColumnStatus::AlreadyExists), ("phone", ColumnStatus::Added)]
        );
        assert!(catalog.has_column("users", "phone"));
    }

    #[tokio::test]
    async fn test_auto_sync_resolution_errors() {
        let catalog = Arc::new(MemoryCatalog::default());
        let migrator = migrator(&catalog);

        assert!(matches!(
            migrator.auto_sync_form_to_table("NoSuchForm", &[]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            migrator.auto_sync_form_to_table("Sidebar", &[]).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_sync_refuses_table_components() {
        let catalog = Arc::new(MemoryCatalog::with_table("assets", &["id", "name"]));
        let migrator = migrator(&catalog);

        let result = migrator
            .auto_sync_form_to_table("AssetList", &[field("foo", "text")])
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(catalog.ddl().is_empty());
    }
}
