//! Schema migration route handlers
//!
//! Column checks and additions against the bound tables, plus catalog
//! discovery passthroughs.

use crate::error::{validation_error, ApiResult, AppError};
use crate::models::{
    AddColumnRequest, ColumnExistsResponse, ColumnListResponse, SuccessResponse, SyncFormRequest,
    SyncFormResponse, TableListResponse,
};
use crate::schema::{is_valid_identifier, ColumnStatus, MigrationOutcome};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};
use validator::Validate;

fn check_identifier(kind: &str, name: &str) -> Result<(), AppError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(validation_error(format!("Invalid {} name '{}'", kind, name)))
    }
}

/// Whether a column exists on a table
pub async fn check_column(
    State(state): State<SharedState>,
    Path((table, column)): Path<(String, String)>,
) -> ApiResult<Json<SuccessResponse<ColumnExistsResponse>>> {
    check_identifier("table", &table)?;
    check_identifier("column", &column)?;

    let exists = state
        .orchestrator
        .migrator()
        .catalog()
        .column_exists(&table, &column)
        .await?;
    debug!("Column {}.{} exists: {}", table, column, exists);

    Ok(Json(SuccessResponse::with_data(
        if exists { "Column exists" } else { "Column does not exist" },
        ColumnExistsResponse {
            table_name: table,
            column_name: column,
            exists,
        },
    )))
}

/// Add one column; the outcome body is returned whatever the result
pub async fn add_column(
    State(state): State<SharedState>,
    Json(payload): Json<AddColumnRequest>,
) -> ApiResult<(StatusCode, Json<MigrationOutcome>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    let (table, column) = payload.into_column();

    let outcome = state.orchestrator.migrator().add_column(&table, &column).await;
    let status = match outcome.status {
        ColumnStatus::Added => StatusCode::CREATED,
        ColumnStatus::AlreadyExists => StatusCode::OK,
        ColumnStatus::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
        ColumnStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(outcome)))
}

/// Add the missing columns for a form's fields
pub async fn sync_form(
    State(state): State<SharedState>,
    Json(payload): Json<SyncFormRequest>,
) -> ApiResult<Json<SyncFormResponse>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let (table, results) = state
        .orchestrator
        .migrator()
        .auto_sync_form_to_table(&payload.form_name, &payload.fields)
        .await?;

    let succeeded = results.iter().filter(|o| o.success).count();
    info!(
        "Form {} synced into {}: {}/{} fields",
        payload.form_name,
        table,
        succeeded,
        results.len()
    );

    Ok(Json(SyncFormResponse {
        success: succeeded == results.len(),
        message: format!("{} of {} fields synchronized into '{}'", succeeded, results.len(), table),
        table_name: table.to_string(),
        results,
    }))
}

/// List all tables in the public schema
pub async fn list_tables(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<TableListResponse>>> {
    debug!("Listing all tables");
    let tables = state.orchestrator.migrator().catalog().list_tables().await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} tables", tables.len()),
        TableListResponse { tables },
    )))
}

/// List the columns of one table
pub async fn list_columns(
    State(state): State<SharedState>,
    Path(table): Path<String>,
) -> ApiResult<Json<SuccessResponse<ColumnListResponse>>> {
    check_identifier("table", &table)?;
    debug!("Listing columns for table: {}", table);

    let columns = state
        .orchestrator
        .migrator()
        .catalog()
        .list_columns(&table)
        .await?;
    if columns.is_empty() {
        return Err(AppError::NotFound(format!("Table '{}' not found", table)));
    }

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} columns in table '{}'", columns.len(), table),
        ColumnListResponse {
            table_name: table,
            columns,
        },
    )))
}
