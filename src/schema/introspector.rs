//! Schema Introspector
//!
//! Read-only catalog queries plus the single DDL entry point the migrator
//! uses. `SchemaCatalog` is the seam unit tests replace.

use super::queries::{COLUMN_EXISTS, GET_COLUMNS, LIST_TABLES};
use crate::error::AppError;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_postgres::error::SqlState;
use tracing::debug;

/// Catalog failure, with duplicate-column split out so callers can treat it
/// as "already there"
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(String),
}

impl From<deadpool_postgres::PoolError> for CatalogError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        CatalogError::Pool(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Database(e) => AppError::Database(e),
            CatalogError::Pool(msg) => AppError::Internal(format!("Database pool error: {}", msg)),
            CatalogError::DuplicateColumn(msg) => AppError::Conflict(msg),
        }
    }
}

/// Table in the public schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    pub owner: String,
    #[serde(rename = "type")]
    pub table_type: String,
}

/// Column of a public table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    pub is_primary_key: bool,
    pub is_unique: bool,
}

/// Relational catalog as seen by the migrator
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, CatalogError>;

    async fn list_tables(&self) -> Result<Vec<TableInfo>, CatalogError>;

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, CatalogError>;

    /// Run one DDL statement
    async fn execute_ddl(&self, statement: &str) -> Result<(), CatalogError>;
}

/// `SchemaCatalog` over a PostgreSQL connection pool
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: Pool,
}

impl PostgresCatalog {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaCatalog for PostgresCatalog {
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, CatalogError> {
        let client = self.pool.get().await?;
        let row = client.query_one(COLUMN_EXISTS, &[&table, &column]).await?;
        Ok(row.get("column_exists"))
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, CatalogError> {
        let client = self.pool.get().await?;
        let rows = client.query(LIST_TABLES, &[]).await?;

        let tables: Vec<TableInfo> = rows
            .iter()
            .map(|row| TableInfo {
                name: row.get("name"),
                schema: row.get("schema"),
                owner: row.get("owner"),
                table_type: row.get("type"),
            })
            .collect();

        debug!("Found {} tables in public schema", tables.len());
        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, CatalogError> {
        let client = self.pool.get().await?;
        let rows = client.query(GET_COLUMNS, &[&table]).await?;

        Ok(rows
            .iter()
            .map(|row| ColumnInfo {
                name: row.get("name"),
                data_type: row.get("data_type"),
                nullable: row.get("nullable"),
                default_value: row.get("column_default"),
                max_length: row.get("max_length"),
                is_primary_key: row.get("is_primary_key"),
                is_unique: row.get("is_unique"),
            })
            .collect())
    }

    async fn execute_ddl(&self, statement: &str) -> Result<(), CatalogError> {
        let client = self.pool.get().await?;
        client.batch_execute(statement).await.map_err(|e| {
            if e.code() == Some(&SqlState::DUPLICATE_COLUMN) {
                CatalogError::DuplicateColumn(e.to_string())
            } else {
                CatalogError::Database(e)
            }
        })
    }
}
