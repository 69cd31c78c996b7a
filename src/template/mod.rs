//! Template Module
//!
//! Derives a structural schema (form fields, table columns, menu entries)
//! from hand-written JSX templates and patches new fields back into them.
//!
//! Extraction recognises a handful of idioms only:
//! - bound inputs (`<input value={formData.name} />`) for forms
//! - `<thead>`/`<tbody>` header and first body row for tables
//! - a `{ path, label, icon }` array literal or an emoji-prefixed `<nav>` link
//!   list for menus
//!
//! Anything else is ignored rather than rejected.

pub mod form;
pub mod menu;
pub mod patcher;
pub mod scan;
pub mod table;

use crate::catalog::ComponentKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub use patcher::{rename_header, FieldPatch, PatchStep, TemplatePatcher};

/// A form field bound to the form state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// How a table cell renders its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnDataType {
    #[default]
    Text,
    Date,
    Number,
    Action,
    Conditional,
}

/// A table column, keyed by its header label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub label: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub data_type: ColumnDataType,
    /// Header text before an edit; only meaningful on save requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_label: Option<String>,
}

/// A navigation entry, keyed by its path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub path: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_field_type() -> String {
    "text".to_string()
}

/// Structural descriptor of one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Structure {
    Form {
        #[serde(default)]
        fields: Vec<FormField>,
    },
    Table {
        #[serde(default)]
        columns: Vec<TableColumn>,
    },
    Menu {
        #[serde(default)]
        items: Vec<MenuItem>,
    },
}

impl Structure {
    /// Empty structure matching a component kind (views fall back to forms)
    pub fn empty(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Table => Structure::Table { columns: Vec::new() },
            ComponentKind::Menu => Structure::Menu { items: Vec::new() },
            ComponentKind::Form | ComponentKind::View => Structure::Form { fields: Vec::new() },
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Structure::Form { .. } => ComponentKind::Form,
            Structure::Table { .. } => ComponentKind::Table,
            Structure::Menu { .. } => ComponentKind::Menu,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Structure::Form { fields } => fields.len(),
            Structure::Table { columns } => columns.len(),
            Structure::Menu { items } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns template text into a structural descriptor.
///
/// Implementations must be pure: same text in, same structure out.
pub trait Extractor: Send + Sync {
    fn extract(&self, source: &str) -> Structure;
}

/// Heuristic extractor over the JSX idioms listed in the module docs
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternExtractor;

impl Extractor for PatternExtractor {
    fn extract(&self, source: &str) -> Structure {
        match detect_kind(source) {
            ComponentKind::Table => Structure::Table {
                columns: table::extract_columns(source),
            },
            ComponentKind::Menu => Structure::Menu {
                items: menu::extract_items(source),
            },
            ComponentKind::Form | ComponentKind::View => Structure::Form {
                fields: form::extract_fields(source),
            },
        }
    }
}

static TABLE_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<thead\b|<th[\s>]").expect("valid table header regex"));
static NAV_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<nav\b").expect("valid nav regex"));

/// Table header idiom ⇒ table; navigation idiom ⇒ menu; otherwise form.
pub fn detect_kind(source: &str) -> ComponentKind {
    if TABLE_HEADER_RE.is_match(source) {
        ComponentKind::Table
    } else if NAV_RE.is_match(source) || menu::has_menu_array(source) {
        ComponentKind::Menu
    } else {
        ComponentKind::Form
    }
}

/// Result of extracting a template file from disk
#[derive(Debug, Clone)]
pub struct Extraction {
    pub structure: Structure,
    pub error: Option<String>,
}

/// Read and extract a template; a missing or unreadable file yields an
/// empty structure of `fallback` kind annotated with an error.
pub async fn extract_file(
    extractor: &dyn Extractor,
    path: &Path,
    fallback: ComponentKind,
) -> Extraction {
    match tokio::fs::read_to_string(path).await {
        Ok(source) => {
            let structure = extractor.extract(&source);
            debug!(
                "Extracted {} {} entries from {}",
                structure.len(),
                structure.kind(),
                path.display()
            );
            Extraction {
                structure,
                error: None,
            }
        }
        Err(e) => {
            warn!("Template {} could not be read: {}", path.display(), e);
            let error = if e.kind() == std::io::ErrorKind::NotFound {
                format!("Template file not found: {}", path.display())
            } else {
                format!("Template file could not be read: {} ({})", path.display(), e)
            };
            Extraction {
                structure: Structure::empty(fallback),
                error: Some(error),
            }
        }
    }
}
