//! Component catalog
//!
//! Static list of the configurable UI units, the template file backing each
//! one, and the relational table behind the form/table components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of structure a component renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Form,
    Table,
    Menu,
    View,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Form => write!(f, "form"),
            ComponentKind::Table => write!(f, "table"),
            ComponentKind::Menu => write!(f, "menu"),
            ComponentKind::View => write!(f, "view"),
        }
    }
}

/// Catalog entry identifying a configurable template
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub source_path: &'static str,
    pub kind: ComponentKind,
}

const fn descriptor(
    id: &'static str,
    display_name: &'static str,
    source_path: &'static str,
    kind: ComponentKind,
) -> ComponentDescriptor {
    ComponentDescriptor {
        id,
        display_name,
        source_path,
        kind,
    }
}

/// Every configurable component of the portal
pub const COMPONENTS: &[ComponentDescriptor] = &[
    descriptor("AssetForm", "Formulario de Activos", "src/pages/assets/AssetForm.jsx", ComponentKind::Form),
    descriptor("AssetList", "Listado de Activos", "src/pages/assets/AssetList.jsx", ComponentKind::Table),
    descriptor("MovementForm", "Formulario de Movimientos", "src/pages/movements/MovementForm.jsx", ComponentKind::Form),
    descriptor("MaintenanceForm", "Formulario de Mantenimiento", "src/pages/maintenance/MaintenanceForm.jsx", ComponentKind::Form),
    descriptor("LicenseForm", "Formulario de Licencias", "src/pages/licenses/LicenseForm.jsx", ComponentKind::Form),
    descriptor("LicenseList", "Listado de Licencias", "src/pages/licenses/LicenseList.jsx", ComponentKind::Table),
    descriptor("VendorForm", "Formulario de Proveedores", "src/pages/vendors/VendorForm.jsx", ComponentKind::Form),
    descriptor("UserForm", "Formulario de Usuarios", "src/pages/users/UserForm.jsx", ComponentKind::Form),
    descriptor("Sidebar", "Menú Lateral", "src/components/Sidebar.jsx", ComponentKind::Menu),
    descriptor("Dashboard", "Panel Principal", "src/pages/Dashboard.jsx", ComponentKind::View),
];

/// Descriptor id → relational table
const TABLE_BINDINGS: &[(&str, &str)] = &[
    ("AssetForm", "assets"),
    ("AssetList", "assets"),
    ("MovementForm", "movements"),
    ("MaintenanceForm", "maintenances"),
    ("LicenseForm", "licenses"),
    ("LicenseList", "licenses"),
    ("VendorForm", "vendors"),
    ("UserForm", "users"),
];

/// Columns every table already carries; never synchronized
pub const STANDARD_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// Look up a descriptor by id
pub fn find(id: &str) -> Option<&'static ComponentDescriptor> {
    COMPONENTS.iter().find(|d| d.id == id)
}

/// Resolve the table bound to a descriptor (form/table kinds only)
pub fn table_for(id: &str) -> Option<&'static str> {
    let descriptor = find(id)?;
    if !matches!(descriptor.kind, ComponentKind::Form | ComponentKind::Table) {
        return None;
    }
    TABLE_BINDINGS
        .iter()
        .find(|(component, _)| *component == id)
        .map(|(_, table)| *table)
}

pub fn is_standard_field(name: &str) -> bool {
    STANDARD_FIELDS.contains(&name)
}
