//! In-memory catalog for unit tests

use super::introspector::{CatalogError, ColumnInfo, SchemaCatalog, TableInfo};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct MemoryCatalog {
    tables: Mutex<BTreeMap<String, BTreeSet<String>>>,
    ddl: Mutex<Vec<String>>,
    /// Report every column as missing, as a concurrent writer would see it
    pub blind_existence: bool,
    /// Fail every DDL statement with this message
    pub fail_ddl: Option<String>,
}

impl MemoryCatalog {
    pub fn with_table(table: &str, columns: &[&str]) -> Self {
        let catalog = Self::default();
        catalog.tables.lock().unwrap().insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        catalog
    }

    pub fn ddl(&self) -> Vec<String> {
        self.ddl.lock().unwrap().clone()
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(false, |columns| columns.contains(column))
    }
}

#[async_trait]
impl SchemaCatalog for MemoryCatalog {
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, CatalogError> {
        Ok(!self.blind_existence && self.has_column(table, column))
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, CatalogError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .keys()
            .map(|name| TableInfo {
                name: name.clone(),
                schema: "public".to_string(),
                owner: "postgres".to_string(),
                table_type: "table".to_string(),
            })
            .collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, CatalogError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .into_iter()
            .flatten()
            .map(|name| ColumnInfo {
                name: name.clone(),
                data_type: "character varying".to_string(),
                nullable: true,
                default_value: None,
                max_length: Some(255),
                is_primary_key: name == "id",
                is_unique: name == "id",
            })
            .collect())
    }

    // Understands the `ALTER TABLE "t" ADD COLUMN "c" ...` shape only
    async fn execute_ddl(&self, statement: &str) -> Result<(), CatalogError> {
        self.ddl.lock().unwrap().push(statement.to_string());
        if let Some(message) = &self.fail_ddl {
            return Err(CatalogError::Pool(message.clone()));
        }
        let parts: Vec<&str> = statement.split('"').collect();
        let (table, column) = (parts[1], parts[3]);
        let mut tables = self.tables.lock().unwrap();
        let columns = tables.entry(table.to_string()).or_default();
        if !columns.insert(column.to_string()) {
            return Err(CatalogError::DuplicateColumn(format!(
                "column \"{}\" of relation \"{}\" already exists",
                column, table
            )));
        }
        Ok(())
    }
}
