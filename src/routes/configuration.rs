//! UI configuration route handlers
//!
//! Catalog listing, effective schema reads and schema saves.

use crate::catalog;
use crate::error::{validation_error, ApiResult};
use crate::models::{FormListResponse, FormSchemaQuery, FormSummary, SaveFormSchemaRequest, SuccessResponse};
use crate::overrides::OverrideRecord;
use crate::state::SharedState;
use crate::sync::{EffectiveSchema, SyncReport};
use axum::{
    extract::{Query, State},
    Json,
};
use std::collections::BTreeMap;
use tracing::{debug, info};
use validator::Validate;

/// List every configurable component
pub async fn list_forms() -> Json<SuccessResponse<FormListResponse>> {
    let forms: Vec<FormSummary> = catalog::COMPONENTS
        .iter()
        .map(|descriptor| FormSummary {
            descriptor,
            table_name: catalog::table_for(descriptor.id),
        })
        .collect();

    Json(SuccessResponse::with_data(
        format!("Found {} configurable components", forms.len()),
        FormListResponse { forms },
    ))
}

/// Effective (merged) schema of one component
pub async fn get_form_schema(
    State(state): State<SharedState>,
    Query(query): Query<FormSchemaQuery>,
) -> ApiResult<Json<EffectiveSchema>> {
    query.validate().map_err(|e| validation_error(e.to_string()))?;
    debug!("Loading effective schema for {}", query.form);

    let schema = state.orchestrator.effective_schema(&query.form).await?;
    Ok(Json(schema))
}

/// Persist an edited schema and synchronize it
pub async fn save_form_schema(
    State(state): State<SharedState>,
    Json(payload): Json<SaveFormSchemaRequest>,
) -> ApiResult<Json<SyncReport>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;
    info!(
        "Saving {} schema for {} ({} entries)",
        payload.schema.structure.kind(),
        payload.form_name,
        payload.schema.structure.len()
    );

    let report = state
        .orchestrator
        .update_form_schema(&payload.form_name, payload.schema)
        .await?;
    Ok(Json(report))
}

/// Every stored override, keyed by component id
pub async fn list_overrides(
    State(state): State<SharedState>,
) -> ApiResult<Json<BTreeMap<String, OverrideRecord>>> {
    let records = state.overrides.list().await?;
    debug!("Listing {} stored overrides", records.len());
    Ok(Json(records))
}
