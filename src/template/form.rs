//! Form field extraction
//!
//! Recognises `<input>`, `<select>` and `<textarea>` elements whose `value`
//! (or `checked`) is bound to a property of the form-state object.

use super::scan::{element_content, tag_end, text_fragments};
use super::FormField;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static STATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"const\s*\[\s*([A-Za-z_$][\w$]*)\s*,\s*([A-Za-z_$][\w$]*)\s*\]\s*=\s*(?:React\.)?useState\s*\(\s*\{")
        .expect("valid form state regex")
});
static ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(input|select|textarea)\b").expect("valid element regex"));
static BINDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:value|checked)\s*=\s*\{\s*([A-Za-z_$][\w$]*)\.([A-Za-z_$][\w$]*)\s*\}")
        .expect("valid binding regex")
});
static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\btype\s*=\s*["']([\w-]+)["']"#).expect("valid type regex"));
static REQUIRED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\srequired(?:\s*=\s*(?:\{\s*(\w+)\s*\}|""))?(?:[\s/>]|$)"#).expect("valid required regex")
});
static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid quoted regex"));

/// The `useState({...})` holding the form values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub value: String,
    pub setter: String,
    /// Offset of the `{` opening the initializer object
    pub initializer_open: usize,
}

/// First `const [x, setX] = useState({ ... })` in the template
pub fn find_form_state(source: &str) -> Option<FormState> {
    let caps = STATE_RE.captures(source)?;
    let whole = caps.get(0)?;
    Some(FormState {
        value: caps[1].to_string(),
        setter: caps[2].to_string(),
        initializer_open: whole.end() - 1,
    })
}

/// A bound element located in the source
#[derive(Debug, Clone)]
pub(crate) struct BoundElement {
    pub element: String,
    pub object: String,
    pub property: String,
    pub start: usize,
    pub end: usize,
}

/// All input-like elements, bound or not, in document order
pub(crate) fn scan_elements(source: &str) -> Vec<(usize, usize, Option<BoundElement>)> {
    let mut found = Vec::new();
    for m in ELEMENT_RE.find_iter(source) {
        let start = m.start();
        let Some(open_end) = tag_end(source, start) else {
            continue;
        };
        let element = source[start + 1..m.end()].to_string();
        let tag = &source[start..open_end];
        let end = if element != "input" && !tag.ends_with("/>") {
            element_content(source, &element, open_end)
                .map(|(_, close)| close + element.len() + 3)
                .unwrap_or(open_end)
        } else {
            open_end
        };
        let bound = BINDING_RE.captures(tag).map(|caps| BoundElement {
            element: element.clone(),
            object: caps[1].to_string(),
            property: caps[2].to_string(),
            start,
            end,
        });
        found.push((start, end, bound));
    }
    found
}

/// Extract bound form fields in first-occurrence order
pub fn extract_fields(source: &str) -> Vec<FormField> {
    let state = find_form_state(source);
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    let mut region_start = 0;

    for (start, end, bound) in scan_elements(source) {
        // Nested inside the previous element's content
        if start < region_start {
            continue;
        }
        let label_region = &source[region_start..start];
        region_start = end;

        let Some(bound) = bound else {
            continue;
        };
        if let Some(state) = &state {
            if bound.object != state.value {
                continue;
            }
        }
        if !seen.insert(bound.property.clone()) {
            continue;
        }

        let tag_close = tag_end(source, bound.start).unwrap_or(bound.end);
        let tag = &source[bound.start..tag_close];
        let label = wrapped_label(label_region, &source[bound.end..])
            .unwrap_or_else(|| capitalize(&bound.property));

        fields.push(FormField {
            name: bound.property.clone(),
            label,
            field_type: field_type(&bound.element, tag),
            required: is_required(tag),
            order: fields.len() as u32 + 1,
            visible: true,
            default_value: None,
        });
    }
    fields
}

/// Text of the label wrapping or directly preceding an element.
///
/// `before` is the source between the previous input-like element and this
/// one; `after` is the source following this element. A `<label>` still open
/// at the element contributes the text that follows the element when it has
/// none before it (`<label><input type="checkbox" /> Activo</label>`).
fn wrapped_label(before: &str, after: &str) -> Option<String> {
    let label_start = before.rfind("<label")?;
    let open_end = tag_end(before, label_start)?;
    let rest = &before[open_end..];
    let mut text = match rest.find("</label>") {
        Some(close) => text_fragments(&rest[..close]).join(" "),
        None => text_fragments(rest).join(" "),
    };
    if text.is_empty() && !rest.contains("</label>") {
        if let Some(close) = after.find("</label>") {
            let tail = &after[..close];
            if !tail.contains("<label") {
                text = text_fragments(tail).join(" ");
            }
        }
    }
    let label = text.trim_end_matches([':', '*', ' ']).trim().to_string();
    (!label.is_empty()).then_some(label)
}

fn field_type(element: &str, tag: &str) -> String {
    match element {
        "select" => "select".to_string(),
        "textarea" => "textarea".to_string(),
        _ => TYPE_RE
            .captures(tag)
            .map(|caps| caps[1].to_lowercase())
            .unwrap_or_else(|| "text".to_string()),
    }
}

/// `required` as an attribute; quoted attribute values are blanked first
fn is_required(tag: &str) -> bool {
    let attributes = QUOTED_RE.replace_all(tag, "\"\"");
    match REQUIRED_RE.captures(&attributes) {
        Some(caps) => caps.get(1).map_or(true, |v| v.as_str() != "false"),
        None => false,
    }
}

pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ASSET_FORM: &str = r#"
import { useState } from 'react';

export default function AssetForm({ onSaved }) {
  const [formData, setFormData] = useState({
    name: '',
    serial: '',
    category: '',
    notes: '',
    active: true,
  });
  const [filter, setFilter] = useState({ q: '' });

  return (
    <form onSubmit={handleSubmit} className="asset-form">
      <input value={filter.q} onChange={(e) => setFilter({ q: e.target.value })} />
      <div className="form-group">
        <label htmlFor="name">Nombre del activo *</label>
        <input id="name" type="text" name="name" value={formData.name} onChange={handleChange} required />
      </div>
      <div className="form-group">
        <label>Número de serie:</label>
        <input name="serial" value={formData.serial} onChange={(e) => setFormData({ ...formData, serial: e.target.value })} required={false} />
      </div>
      <div className="form-group">
        <label>Categoría</label>
        <select name="category" value={formData.category} onChange={handleChange}>
          <option value="">Seleccione...</option>
          <option value="laptop">Laptop</option>
        </select>
      </div>
      <textarea name="notes" value={formData.notes} onChange={handleChange}></textarea>
      <label>
        <input type="checkbox" name="active" checked={formData.active} onChange={handleChange} /> Activo
      </label>
      <input type="text" value={formData.name} onChange={handleChange} />
      <button type="submit">Guardar</button>
    </form>
  );
}
"#;

    #[test]
    fn test_find_form_state() {
        let state = find_form_state(ASSET_FORM).unwrap();
        assert_eq!(state.value, "formData");
        assert_eq!(state.setter, "setFormData");
        assert_eq!(&ASSET_FORM[state.initializer_open..state.initializer_open + 1], "{");
    }

    #[test]
    fn test_extract_fields() {
        let fields = extract_fields(ASSET_FORM);
        let summary: Vec<_> = fields
            .iter()
            .map(|f| (f.name.as_str(), f.label.as_str(), f.field_type.as_str(), f.required, f.order))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("name", "Nombre del activo", "text", true, 1),
                ("serial", "Número de serie", "text", false, 2),
                ("category", "Categoría", "select", false, 3),
                ("notes", "Notes", "textarea", false, 4),
                ("active", "Activo", "checkbox", false, 5),
            ]
        );
    }

    #[test]
    fn test_duplicate_bindings_are_ignored() {
        let fields = extract_fields(ASSET_FORM);
        assert_eq!(fields.iter().filter(|f| f.name == "name").count(), 1);
    }

    #[test]
    fn test_bindings_without_form_state_accept_any_object() {
        let source = r#"<input value={props.title} /><input value={props.body} />"#;
        let names: Vec<_> = extract_fields(source).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["title", "body"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("serialNumber"), "SerialNumber");
        assert_eq!(capitalize("ñandu"), "Ñandu");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_element_nested_in_select_is_skipped() {
        let source = "<form><select value={formData.a}><input value={formData.b} /></select></form>";
        let names: Vec<_> = extract_fields(source).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_required_only_as_attribute() {
        assert!(is_required(r#"<input value={f.a} required />"#));
        assert!(is_required(r#"<input value={f.a} required>"#));
        assert!(is_required(r#"<input value={f.a} required={true} />"#));
        assert!(!is_required(r#"<input value={f.a} required={false} />"#));
        assert!(!is_required(r#"<input placeholder="Campo required" value={f.a} />"#));
        assert!(!is_required(r#"<input title='required field' value={f.a} />"#));
    }
}
