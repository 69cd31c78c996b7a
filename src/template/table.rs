//! Table column extraction
//!
//! Header labels come from the `<th>` cells; each column's data type is
//! inferred from the matching `<td>` of the first body row.

use super::scan::{element_content, strip_template_literals, tag_end, text_fragments};
use super::{ColumnDataType, TableColumn};
use once_cell::sync::Lazy;
use regex::Regex;

static TH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<th[\s>]").expect("valid th regex"));
static TD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<td[\s>]").expect("valid td regex"));
static TR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<tr[\s>]").expect("valid tr regex"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"new\s+Date\s*\(|toLocaleDateString|toLocaleString\s*\(|formatDate\s*\(|dayjs\s*\(|moment\s*\(")
        .expect("valid date regex")
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"toFixed\s*\(|formatCurrency\s*\(|Intl\.NumberFormat|[$€£]")
        .expect("valid number regex")
});
static ACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<button\b|<Link\b|<a\s|onClick\s*=").expect("valid action regex")
});
static TERNARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\?\s[^?]*?\s:\s").expect("valid ternary regex"));

/// A located cell: range of the whole element and of its content
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cell {
    pub content_start: usize,
    pub content_end: usize,
}

/// `<th>` cells of the header row
pub(crate) fn header_cells(source: &str) -> Vec<Cell> {
    let Some(thead) = source.find("<thead") else {
        return Vec::new();
    };
    let region_end = source[thead..]
        .find("</thead>")
        .map_or(source.len(), |p| p + thead);
    cells(source, thead, region_end, &TH_RE, "th")
}

/// `<td>` cells of the first body row
fn first_row_cells(source: &str) -> Vec<Cell> {
    let Some(tbody) = source.find("<tbody") else {
        return Vec::new();
    };
    let Some(row) = TR_RE.find_at(source, tbody) else {
        return Vec::new();
    };
    let Some(open_end) = tag_end(source, row.start()) else {
        return Vec::new();
    };
    let Some((_, row_end)) = element_content(source, "tr", open_end) else {
        return Vec::new();
    };
    cells(source, open_end, row_end, &TD_RE, "td")
}

fn cells(source: &str, from: usize, to: usize, re: &Regex, name: &str) -> Vec<Cell> {
    let mut found = Vec::new();
    let mut at = from;
    while let Some(m) = re.find_at(source, at) {
        if m.start() >= to {
            break;
        }
        let Some(open_end) = tag_end(source, m.start()) else {
            break;
        };
        let Some((content_start, content_end)) = element_content(source, name, open_end) else {
            break;
        };
        found.push(Cell {
            content_start,
            content_end,
        });
        at = content_end;
    }
    found
}

/// Trailing visible text fragment of a header cell's content
pub(crate) fn header_label(content: &str) -> String {
    text_fragments(content).pop().unwrap_or_default()
}

/// Extract columns; missing header or body rows give an empty result
pub fn extract_columns(source: &str) -> Vec<TableColumn> {
    let headers = header_cells(source);
    let body = first_row_cells(source);
    if headers.is_empty() || body.is_empty() {
        return Vec::new();
    }

    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let label = header_label(&source[header.content_start..header.content_end]);
            let data_type = body
                .get(i)
                .map(|cell| infer_data_type(&source[cell.content_start..cell.content_end]))
                .unwrap_or_default();
            TableColumn {
                label,
                visible: true,
                order: i as u32 + 1,
                data_type,
                original_label: None,
            }
        })
        .collect()
}

/// Classify a body cell by what its content renders
pub fn infer_data_type(cell: &str) -> ColumnDataType {
    let cell = strip_template_literals(cell);
    if DATE_RE.is_match(&cell) {
        ColumnDataType::Date
    } else if NUMBER_RE.is_match(&cell) {
        ColumnDataType::Number
    } else if ACTION_RE.is_match(&cell) {
        ColumnDataType::Action
    } else if TERNARY_RE.is_match(&cell) {
        ColumnDataType::Conditional
    } else {
        ColumnDataType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ASSET_LIST: &str = r#"
export default function AssetList({ assets }) {
  return (
    <table className="table">
      <thead>
        <tr>
          <th onClick={() => sortBy('name')}>Nombre {sortIcon('name')}</th>
          <th><span className="sort" onClick={() => sortBy('date')}>⇅</span> Fecha de compra</th>
          <th>Costo</th>
          <th>Estado</th>
          <th>{'Acciones'}</th>
          <th>Serie</th>
        </tr>
      </thead>
      <tbody>
        {assets.map((asset) => (
          <tr key={asset.id} className={`row ${asset.active ? 'on' : 'off'}`}>
            <td>{asset.name}</td>
            <td>{new Date(asset.purchaseDate).toLocaleDateString('es-ES')}</td>
            <td>${Number(asset.cost).toFixed(2)}</td>
            <td>{asset.active ? 'Activo' : 'Inactivo'}</td>
            <td>
              <button onClick={() => onEdit(asset)}>Editar</button>
            </td>
          </tr>
        ))}
      </tbody>
    </table>
  );
}
"#;

    #[test]
    fn test_extract_columns() {
        let columns = extract_columns(ASSET_LIST);
        let summary: Vec<_> = columns
            .iter()
            .map(|c| (c.label.as_str(), c.data_type, c.order, c.visible))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Nombre", ColumnDataType::Text, 1, true),
                ("Fecha de compra", ColumnDataType::Date, 2, true),
                ("Costo", ColumnDataType::Number, 3, true),
                ("Estado", ColumnDataType::Conditional, 4, true),
                ("Acciones", ColumnDataType::Action, 5, true),
                ("Serie", ColumnDataType::Text, 6, true),
            ]
        );
    }

    #[test]
    fn test_missing_body_gives_empty_result() {
        let source = "<table><thead><tr><th>Nombre</th></tr></thead></table>";
        assert!(extract_columns(source).is_empty());
    }

    #[test]
    fn test_missing_header_gives_empty_result() {
        let source = "<table><tbody><tr><td>x</td></tr></tbody></table>";
        assert!(extract_columns(source).is_empty());
    }

    #[test]
    fn test_infer_data_type() {
        assert_eq!(infer_data_type("{formatDate(row.at)}"), ColumnDataType::Date);
        assert_eq!(infer_data_type("{row.total.toFixed(2)}"), ColumnDataType::Number);
        assert_eq!(infer_data_type("€{row.total}"), ColumnDataType::Number);
        assert_eq!(infer_data_type("<Link to={`/a/${row.id}`}>Ver</Link>"), ColumnDataType::Action);
        assert_eq!(infer_data_type("{row.tag ?? '-'}"), ColumnDataType::Text);
        assert_eq!(infer_data_type("{row.owner?.name}"), ColumnDataType::Text);
    }
}
