//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains all request/response structures used by the API.

use crate::catalog::ComponentDescriptor;
use crate::schema::{ColumnInfo, MigrationOutcome, NewColumn, TableInfo};
use crate::sync::SchemaUpdate;
use crate::template::FormField;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

// ============================================
// Configuration
// ============================================

/// Query for `GET /configuration/form-schema`
#[derive(Debug, Deserialize, Validate)]
pub struct FormSchemaQuery {
    #[validate(length(min = 1, message = "Query parameter 'form' is required"))]
    pub form: String,
}

/// Body of `POST /configuration/form-schema`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveFormSchemaRequest {
    #[validate(length(min = 1, max = 100, message = "formName must be between 1 and 100 characters"))]
    pub form_name: String,
    pub schema: SchemaUpdate,
}

/// Catalog entry plus the table it is bound to
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    #[serde(flatten)]
    pub descriptor: &'static ComponentDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct FormListResponse {
    pub forms: Vec<FormSummary>,
}

// ============================================
// Schema migration
// ============================================

/// Body of `POST /schema-migration/add-column`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddColumnRequest {
    #[validate(length(min = 1, max = 63, message = "Table name must be between 1 and 63 characters"))]
    pub table_name: String,

    #[validate(length(min = 1, max = 63, message = "Column name must be between 1 and 63 characters"))]
    pub column_name: String,

    #[validate(length(min = 1, message = "Field type is required"))]
    pub field_type: String,

    #[serde(default)]
    pub nullable: Option<bool>,

    #[serde(default)]
    pub default_value: Option<String>,
}

impl AddColumnRequest {
    pub fn into_column(self) -> (String, NewColumn) {
        (
            self.table_name,
            NewColumn {
                name: self.column_name,
                field_type: self.field_type,
                nullable: self.nullable,
                default_value: self.default_value,
            },
        )
    }
}

/// Body of `POST /schema-migration/sync-form`
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncFormRequest {
    #[validate(length(min = 1, message = "formName is required"))]
    pub form_name: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFormResponse {
    pub success: bool,
    pub message: String,
    pub table_name: String,
    pub results: Vec<MigrationOutcome>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnExistsResponse {
    pub table_name: String,
    pub column_name: String,
    pub exists: bool,
}

/// Response containing list of tables
#[derive(Debug, Serialize)]
pub struct TableListResponse {
    pub tables: Vec<TableInfo>,
}

/// Response containing list of columns
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnListResponse {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_column_request_validation() {
        let request: AddColumnRequest = serde_json::from_value(serde_json::json!({
            "tableName": "",
            "columnName": "phone",
            "fieldType": "tel"
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request: AddColumnRequest = serde_json::from_value(serde_json::json!({
            "tableName": "users",
            "columnName": "phone",
            "fieldType": "tel",
            "nullable": false,
            "defaultValue": "-"
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        let (table, column) = request.into_column();
        assert_eq!(table, "users");
        assert_eq!(column.nullable, Some(false));
        assert_eq!(column.default_value.as_deref(), Some("-"));
    }

    #[test]
    fn test_save_request_carries_flat_schema() {
        let request: SaveFormSchemaRequest = serde_json::from_value(serde_json::json!({
            "formName": "UserForm",
            "schema": {
                "title": "Usuarios",
                "type": "form",
                "fields": [{ "name": "email", "label": "Correo", "order": 1 }],
                "expectedRevision": "abc"
            }
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.schema.title.as_deref(), Some("Usuarios"));
        assert_eq!(request.schema.expected_revision.as_deref(), Some("abc"));
        assert_eq!(request.schema.structure.len(), 1);
    }

    #[test]
    fn test_success_response_flattens_data() {
        let body = SuccessResponse::with_data(
            "ok",
            ColumnExistsResponse {
                table_name: "users".to_string(),
                column_name: "email".to_string(),
                exists: true,
            },
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["exists"], true);
        assert_eq!(json["tableName"], "users");
    }
}
