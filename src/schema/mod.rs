//! Schema Module
//!
//! Introspects the relational catalog and adds columns for newly introduced
//! form fields. Only additive DDL is ever generated.

pub mod introspector;
#[cfg(test)]
pub(crate) mod memory;
pub mod migrator;
pub mod queries;

pub use introspector::{CatalogError, ColumnInfo, PostgresCatalog, SchemaCatalog, TableInfo};
pub use migrator::{NewColumn, SchemaMigrator};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid numeric regex"));

/// Whether `name` may be spliced into a DDL statement
pub fn is_valid_identifier(name: &str) -> bool {
    IDENT_RE.is_match(name)
}

/// Supported form field types and the column each one maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    #[serde(alias = "datetime-local")]
    Datetime,
    Email,
    Tel,
    Url,
    Select,
    Radio,
    File,
    Checkbox,
    Password,
    Time,
}

impl FieldType {
    pub const ALL: [FieldType; 14] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Email,
        FieldType::Tel,
        FieldType::Url,
        FieldType::Select,
        FieldType::Radio,
        FieldType::File,
        FieldType::Checkbox,
        FieldType::Password,
        FieldType::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Email => "email",
            FieldType::Tel => "tel",
            FieldType::Url => "url",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::File => "file",
            FieldType::Checkbox => "checkbox",
            FieldType::Password => "password",
            FieldType::Time => "time",
        }
    }

    /// Target column type
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Text | FieldType::Email | FieldType::Password => "VARCHAR(255)",
            FieldType::Textarea => "TEXT",
            FieldType::Number => "NUMERIC",
            FieldType::Date | FieldType::Datetime => "TIMESTAMP",
            FieldType::Tel => "VARCHAR(50)",
            FieldType::Url | FieldType::File => "VARCHAR(500)",
            FieldType::Select | FieldType::Radio => "VARCHAR(100)",
            FieldType::Checkbox => "BOOLEAN",
            FieldType::Time => "TIME",
        }
    }

    /// Nullability and default used when the caller specifies neither
    pub fn column_default(&self) -> (bool, Option<&'static str>) {
        match self {
            FieldType::Checkbox => (false, Some("FALSE")),
            _ => (true, None),
        }
    }

    /// Render a default value as a SQL literal of this type
    pub fn default_literal(&self, raw: &str) -> Result<String, String> {
        let value = raw.trim();
        match self {
            FieldType::Checkbox => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok("TRUE".to_string()),
                "false" | "0" | "no" | "off" => Ok("FALSE".to_string()),
                _ => Err(format!("'{}' is not a boolean default", raw)),
            },
            FieldType::Number => {
                if NUMERIC_RE.is_match(value) {
                    Ok(value.to_string())
                } else {
                    Err(format!("'{}' is not a numeric default", raw))
                }
            }
            _ => Ok(format!("'{}'", raw.replace('\'', "''"))),
        }
    }

    /// Column definition after the name: type, nullability, default
    pub fn column_definition(
        &self,
        nullable: Option<bool>,
        default_value: Option<&str>,
    ) -> Result<String, String> {
        let (default_nullable, variant_default) = self.column_default();
        let default = match default_value.filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(self.default_literal(raw)?),
            None => variant_default.map(str::to_string),
        };
        let nullable = nullable.unwrap_or(default_nullable);

        let mut definition = self.sql_type().to_string();
        definition.push_str(if nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = default {
            definition.push_str(" DEFAULT ");
            definition.push_str(&default);
        }
        Ok(definition)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "datetime-local" {
            return Ok(FieldType::Datetime);
        }
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| format!("Unsupported field type '{}'", s))
    }
}

/// How a column addition ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnStatus {
    Added,
    AlreadyExists,
    Rejected,
    Failed,
}

/// Per-field result of a column addition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub field: String,
    pub success: bool,
    pub message: String,
    pub status: ColumnStatus,
}

impl MigrationOutcome {
    fn new(field: &str, status: ColumnStatus, message: String) -> Self {
        Self {
            field: field.to_string(),
            success: matches!(status, ColumnStatus::Added | ColumnStatus::AlreadyExists),
            message,
            status,
        }
    }

    pub fn added(field: &str, table: &str) -> Self {
        Self::new(
            field,
            ColumnStatus::Added,
            format!("Column '{}' added to table '{}'", field, table),
        )
    }

    pub fn already_exists(field: &str, table: &str) -> Self {
        Self::new(
            field,
            ColumnStatus::AlreadyExists,
            format!("Column '{}' already exists in table '{}'", field, table),
        )
    }

    pub fn rejected(field: &str, message: impl Into<String>) -> Self {
        Self::new(field, ColumnStatus::Rejected, message.into())
    }

    pub fn failed(field: &str, message: impl Into<String>) -> Self {
        Self::new(field, ColumnStatus::Failed, message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identifier_pattern() {
        assert!(is_valid_identifier("email"));
        assert!(is_valid_identifier("_purchase_date2"));
        assert!(!is_valid_identifier("1bad"));
        assert!(!is_valid_identifier("bad; DROP TABLE x"));
        assert!(!is_valid_identifier("name\""));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_parse_field_type() {
        assert_eq!("email".parse::<FieldType>(), Ok(FieldType::Email));
        assert_eq!("Checkbox".parse::<FieldType>(), Ok(FieldType::Checkbox));
        assert_eq!("datetime-local".parse::<FieldType>(), Ok(FieldType::Datetime));
        assert!("color".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_every_type_round_trips_through_its_name() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>(), Ok(t));
        }
    }

    #[test]
    fn test_sql_types() {
        assert_eq!(FieldType::Text.sql_type(), "VARCHAR(255)");
        assert_eq!(FieldType::Textarea.sql_type(), "TEXT");
        assert_eq!(FieldType::Number.sql_type(), "NUMERIC");
        assert_eq!(FieldType::Datetime.sql_type(), "TIMESTAMP");
        assert_eq!(FieldType::Tel.sql_type(), "VARCHAR(50)");
        assert_eq!(FieldType::Checkbox.sql_type(), "BOOLEAN");
    }

    #[test]
    fn test_column_definition() {
        assert_eq!(
            FieldType::Text.column_definition(None, None).unwrap(),
            "VARCHAR(255) NULL"
        );
        assert_eq!(
            FieldType::Checkbox.column_definition(None, None).unwrap(),
            "BOOLEAN NOT NULL DEFAULT FALSE"
        );
        assert_eq!(
            FieldType::Text
                .column_definition(Some(false), Some("O'Brien"))
                .unwrap(),
            "VARCHAR(255) NOT NULL DEFAULT 'O''Brien'"
        );
        assert_eq!(
            FieldType::Number.column_definition(None, Some("12.50")).unwrap(),
            "NUMERIC NULL DEFAULT 12.50"
        );
    }

    #[test]
    fn test_default_literal_rejects_mismatched_values() {
        assert!(FieldType::Number.default_literal("12; DROP").is_err());
        assert!(FieldType::Checkbox.default_literal("maybe").is_err());
        assert_eq!(FieldType::Checkbox.default_literal("Yes").unwrap(), "TRUE");
    }

    #[test]
    fn test_outcome_success_follows_status() {
        assert!(MigrationOutcome::added("email", "users").success);
        assert!(MigrationOutcome::already_exists("email", "users").success);
        assert!(!MigrationOutcome::rejected("1bad", "invalid").success);
        assert!(!MigrationOutcome::failed("email", "boom").success);

        let json = serde_json::to_value(MigrationOutcome::already_exists("email", "users")).unwrap();
        assert_eq!(json["status"], "alreadyExists");
    }
}
