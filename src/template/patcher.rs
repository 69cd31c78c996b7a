//! Template patcher
//!
//! Wires a newly migrated field into a form template: state initializer,
//! payload assembly, reset block and a rendered input before the submit
//! control. Every insertion is skipped when the template already carries it,
//! so patching the same field twice leaves the text unchanged. When an anchor
//! shape is not found the matching step is skipped.

use super::form::{capitalize, find_form_state, FormState};
use super::scan::{indentation_at, line_start, matching_brace, text_spans};
use super::table::header_cells;
use super::FormField;
use crate::schema::is_valid_identifier;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

static SUBMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"type\s*=\s*["']submit["']"#).expect("valid submit regex"));
static HANDLER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"onChange\s*=\s*\{\s*([A-Za-z_$][\w$]*)\s*\}").expect("valid handler regex"));
static WRAPPER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div\s+className\s*=\s*["']([^"']+)["']\s*>\s*<label"#).expect("valid wrapper regex")
});
static RESET_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[A-Za-z_$][\w$]*\s*:\s*(?:''|""|false|true|null|0|\[\])$"#).expect("valid reset regex")
});

/// One kind of insertion the patcher performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchStep {
    StateInitializer,
    PayloadAssignment,
    ResetBlock,
    RenderedInput,
}

/// Patched text plus the steps that actually changed it
#[derive(Debug, Clone)]
pub struct FieldPatch {
    pub source: String,
    pub applied: Vec<PatchStep>,
}

impl FieldPatch {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplatePatcher;

impl TemplatePatcher {
    /// Wire `field` into `source`
    pub fn patch(&self, source: &str, field: &FormField) -> FieldPatch {
        let mut patch = FieldPatch {
            source: source.to_string(),
            applied: Vec::new(),
        };
        if !is_valid_identifier(&field.name) {
            debug!("Not patching '{}': not an identifier", field.name);
            return patch;
        }
        let Some(state) = find_form_state(source) else {
            debug!("Not patching '{}': no form state initializer", field.name);
            return patch;
        };

        let initial = initial_value(&field.field_type);
        if let Some(text) = add_to_initializer(&patch.source, &state, &field.name, initial) {
            patch.source = text;
            patch.applied.push(PatchStep::StateInitializer);
        }
        if let Some(text) = add_payload_line(&patch.source, &state, &field.name) {
            patch.source = text;
            patch.applied.push(PatchStep::PayloadAssignment);
        }
        if let Some(text) = add_to_reset_blocks(&patch.source, &state, &field.name, initial) {
            patch.source = text;
            patch.applied.push(PatchStep::ResetBlock);
        }
        if let Some(text) = add_rendered_input(&patch.source, &state, field) {
            patch.source = text;
            patch.applied.push(PatchStep::RenderedInput);
        }
        patch
    }
}

fn initial_value(field_type: &str) -> &'static str {
    if field_type == "checkbox" {
        "false"
    } else {
        "''"
    }
}

fn property_re(name: &str) -> Regex {
    Regex::new(&format!(r"(?:^|[\s,{{]){}\s*:", regex::escape(name))).expect("valid property regex")
}

/// Insert `name: value` into the object literal opening at `open`
fn insert_property(source: &str, open: usize, name: &str, value: &str) -> Option<String> {
    let close = matching_brace(source, open)?;
    let body = &source[open + 1..close];
    if property_re(name).is_match(body) {
        return None;
    }

    let mut text = String::with_capacity(source.len() + name.len() + 16);
    if body.trim().is_empty() {
        text.push_str(&source[..=open]);
        text.push_str(&format!(" {}: {} ", name, value));
        text.push_str(&source[close..]);
        return Some(text);
    }

    // A trailing comment shape we cannot place a property after is an anchor miss
    let code_end = open + 1 + last_entry_end(body)?;
    let body_end = open + 1 + body.trim_end().len();
    let trailing_comma = source[..code_end].ends_with(',');

    if body.contains('\n') {
        let indent = indentation_at(source, code_end - 1);
        text.push_str(&source[..code_end]);
        if !trailing_comma {
            text.push(',');
        }
        text.push_str(&source[code_end..body_end]);
        text.push_str(&format!("\n{}{}: {}", indent, name, value));
        if trailing_comma {
            text.push(',');
        }
        text.push_str(&source[body_end..]);
    } else {
        if code_end != body_end {
            return None;
        }
        text.push_str(&source[..code_end]);
        text.push_str(&if trailing_comma {
            format!(" {}: {}", name, value)
        } else {
            format!(", {}: {}", name, value)
        });
        text.push_str(&source[code_end..]);
    }
    Some(text)
}

/// Offset in `body` just past the last entry's code, before any `//`
/// comment on its line. `None` when the body ends in a block comment or a
/// comment-only line.
fn last_entry_end(body: &str) -> Option<usize> {
    let trimmed = body.trim_end();
    if trimmed.ends_with("*/") {
        return None;
    }
    let line_begin = trimmed.rfind('\n').map_or(0, |p| p + 1);
    let line = &trimmed[line_begin..];
    let code = match line_comment_start(line) {
        Some(at) => &line[..at],
        None => line,
    };
    let code = code.trim_end();
    if code.trim().is_empty() {
        return None;
    }
    Some(line_begin + code.len())
}

/// Offset of a `//` outside string literals
fn line_comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        match (quote, bytes[i]) {
            (Some(_), b'\\') => i += 1,
            (Some(q), c) if c == q => quote = None,
            (None, b'"' | b'\'' | b'`') => quote = Some(bytes[i]),
            (None, b'/') if bytes.get(i + 1) == Some(&b'/') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn add_to_initializer(source: &str, state: &FormState, name: &str, value: &str) -> Option<String> {
    insert_property(source, state.initializer_open, name, value)
}

/// Copy the first `if (form.x) payload.x = ...;` line for the new field
fn add_payload_line(source: &str, state: &FormState, name: &str) -> Option<String> {
    let line_re = Regex::new(&format!(
        r"(?m)^[ \t]*if\s*\(\s*{}\.([A-Za-z_$][\w$]*)\s*\)\s*([A-Za-z_$][\w$]*)\.([A-Za-z_$][\w$]*)\s*=[^\n]*$",
        regex::escape(&state.value)
    ))
    .ok()?;

    let mut reference: Option<(String, String, String)> = None;
    let mut insert_at = None;
    for caps in line_re.captures_iter(source) {
        if caps[1] != caps[3] {
            continue;
        }
        let whole = caps.get(0)?;
        if reference.is_none() {
            reference = Some((whole.as_str().to_string(), caps[1].to_string(), caps[2].to_string()));
        }
        insert_at = Some(whole.end());
    }
    let (line, field, payload) = reference?;
    let insert_at = insert_at?;

    let existing = Regex::new(&format!(
        r"\b{}\.{}\s*=",
        regex::escape(&payload),
        regex::escape(name)
    ))
    .ok()?;
    if existing.is_match(source) {
        return None;
    }

    let field_re = Regex::new(&format!(r"\b{}\b", regex::escape(&field))).ok()?;
    let new_line = field_re.replace_all(&line, regex::NoExpand(name));

    let mut text = String::with_capacity(source.len() + new_line.len() + 1);
    text.push_str(&source[..insert_at]);
    text.push('\n');
    text.push_str(&new_line);
    text.push_str(&source[insert_at..]);
    Some(text)
}

/// Add the field to every `setForm({ a: '', b: '' })` reset call
fn add_to_reset_blocks(source: &str, state: &FormState, name: &str, value: &str) -> Option<String> {
    let call_re = Regex::new(&format!(r"\b{}\s*\(\s*\{{", regex::escape(&state.setter))).ok()?;
    let mut text = source.to_string();
    let mut changed = false;
    let mut from = 0;

    while let Some(m) = call_re.find_at(&text, from) {
        let open = m.end() - 1;
        from = m.end();
        let Some(close) = matching_brace(&text, open) else {
            break;
        };
        if !is_reset_object(&text[open + 1..close]) {
            continue;
        }
        if let Some(patched) = insert_property(&text, open, name, value) {
            text = patched;
            changed = true;
        }
    }
    changed.then_some(text)
}

fn is_reset_object(body: &str) -> bool {
    let entries: Vec<&str> = body
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    !entries.is_empty() && entries.iter().all(|entry| RESET_ENTRY_RE.is_match(entry))
}

/// Render a label + input block right before the submit control
fn add_rendered_input(source: &str, state: &FormState, field: &FormField) -> Option<String> {
    let binding = Regex::new(&format!(
        r"\b(?:value|checked)\s*=\s*\{{\s*{}\.{}\s*\}}",
        regex::escape(&state.value),
        regex::escape(&field.name)
    ))
    .ok()?;
    if binding.is_match(source) {
        return None;
    }

    let submit = SUBMIT_RE.find(source)?;
    let tag_start = source[..submit.start()].rfind('<')?;
    let line = line_start(source, tag_start);
    let insert_at = if source[line..tag_start].trim().is_empty() {
        line
    } else {
        tag_start
    };
    let indent = indentation_at(source, tag_start).to_string();

    let block = render_block(source, state, field, &indent);
    let mut text = String::with_capacity(source.len() + block.len());
    text.push_str(&source[..insert_at]);
    text.push_str(&block);
    if insert_at == tag_start {
        text.push_str(&indent);
    }
    text.push_str(&source[insert_at..]);
    Some(text)
}

fn render_block(source: &str, state: &FormState, field: &FormField, indent: &str) -> String {
    let name = &field.name;
    let wrapper = WRAPPER_RE
        .captures(source)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "form-group".to_string());
    let label = if field.label.trim().is_empty() {
        capitalize(name)
    } else {
        field.label.trim().to_string()
    };
    let label = jsx_text(&format!("{}{}", label, if field.required { " *" } else { "" }));
    let required = if field.required { " required" } else { "" };
    let is_checkbox = field.field_type == "checkbox";
    let on_change = match HANDLER_RE.captures(source) {
        Some(caps) => caps[1].to_string(),
        None => format!(
            "(e) => {}({{ ...{}, {}: e.target.{} }})",
            state.setter,
            state.value,
            name,
            if is_checkbox { "checked" } else { "value" }
        ),
    };
    let bound = format!("{}.{}", state.value, name);

    let control = match field.field_type.as_str() {
        "select" => format!(
            "{i}  <select id=\"{n}\" name=\"{n}\" value={{{b}}} onChange={{{h}}}{r}>\n{i}    <option value=\"\">Seleccione...</option>\n{i}  </select>\n",
            i = indent, n = name, b = bound, h = on_change, r = required
        ),
        "textarea" => format!(
            "{i}  <textarea id=\"{n}\" name=\"{n}\" value={{{b}}} onChange={{{h}}} rows={{3}}{r} />\n",
            i = indent, n = name, b = bound, h = on_change, r = required
        ),
        "checkbox" => format!(
            "{i}  <input id=\"{n}\" type=\"checkbox\" name=\"{n}\" checked={{{b}}} onChange={{{h}}} />\n",
            i = indent, n = name, b = bound, h = on_change
        ),
        other => format!(
            "{i}  <input id=\"{n}\" type=\"{t}\" name=\"{n}\" value={{{b}}} onChange={{{h}}}{r} />\n",
            i = indent, n = name, t = html_input_type(other), b = bound, h = on_change, r = required
        ),
    };

    format!(
        "{i}<div className=\"{w}\">\n{i}  <label htmlFor=\"{n}\">{l}</label>\n{c}{i}</div>\n",
        i = indent,
        w = wrapper,
        n = name,
        l = label,
        c = control
    )
}

fn html_input_type(field_type: &str) -> &str {
    match field_type {
        "datetime" | "datetime-local" => "datetime-local",
        "number" | "date" | "email" | "tel" | "url" | "file" | "password" | "time" => field_type,
        _ => "text",
    }
}

fn jsx_text(text: &str) -> String {
    if text.contains(['{', '}', '<', '>']) {
        format!("{{{}}}", serde_json::Value::String(text.to_string()))
    } else {
        text.to_string()
    }
}

/// Rewrite the visible text of the header cell labelled `old`.
///
/// Only the trailing text run of the cell is replaced; expressions in the
/// cell are left alone. Returns `None` when no header cell carries that label.
pub fn rename_header(source: &str, old: &str, new: &str) -> Option<String> {
    if old.is_empty() || old == new {
        return None;
    }
    let mut edits = Vec::new();
    for cell in header_cells(source) {
        let content = &source[cell.content_start..cell.content_end];
        let Some(span) = text_spans(content).pop() else {
            continue;
        };
        if span.text != old {
            continue;
        }
        let replacement = if span.literal {
            format!("{{{}}}", serde_json::Value::String(new.to_string()))
        } else {
            jsx_text(new)
        };
        edits.push((cell.content_start + span.start, cell.content_start + span.end, replacement));
    }
    if edits.is_empty() {
        return None;
    }

    let mut text = source.to_string();
    for (start, end, replacement) in edits.into_iter().rev() {
        text.replace_range(start..end, &replacement);
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::form::extract_fields;
    use crate::template::table::extract_columns;
    use pretty_assertions::assert_eq;

    const VENDOR_FORM: &str = r#"import { useState } from 'react';
import api from '../../services/api';

export default function VendorForm({ onSaved }) {
  const [formData, setFormData] = useState({
    name: '',
    email: '',
  });

  const handleChange = (e) => {
    const { name, value, type, checked } = e.target;
    setFormData({ ...formData, [name]: type === 'checkbox' ? checked : value });
  };

  const handleSubmit = async (e) => {
    e.preventDefault();
    const payload = {};
    if (formData.name) payload.name = formData.name;
    if (formData.email) payload.email = formData.email;
    await api.post('/vendors', payload);
    setFormData({ name: '', email: '' });
    onSaved();
  };

  return (
    <form onSubmit={handleSubmit}>
      <div className="field">
        <label>Nombre</label>
        <input type="text" name="name" value={formData.name} onChange={handleChange} required />
      </div>
      <div className="field">
        <label>Correo</label>
        <input type="email" name="email" value={formData.email} onChange={handleChange} />
      </div>
      <button type="submit" className="btn">Guardar</button>
    </form>
  );
}
"#;

    fn field(name: &str, label: &str, field_type: &str, required: bool) -> FormField {
        FormField {
            name: name.to_string(),
            label: label.to_string(),
            field_type: field_type.to_string(),
            required,
            order: 0,
            visible: true,
            default_value: None,
        }
    }

    #[test]
    fn test_patch_applies_every_step() {
        let patch = TemplatePatcher.patch(VENDOR_FORM, &field("taxId", "RUC", "text", true));

        assert_eq!(
            patch.applied,
            vec![
                PatchStep::StateInitializer,
                PatchStep::PayloadAssignment,
                PatchStep::ResetBlock,
                PatchStep::RenderedInput,
            ]
        );
        let text = &patch.source;
        assert!(text.contains("    email: '',\n    taxId: '',\n  });"));
        assert!(text.contains(
            "    if (formData.email) payload.email = formData.email;\n    if (formData.taxId) payload.taxId = formData.taxId;\n"
        ));
        assert!(text.contains("setFormData({ name: '', email: '', taxId: '' });"));
        assert!(text.contains(
            "      <div className=\"field\">\n        <label htmlFor=\"taxId\">RUC *</label>\n        <input id=\"taxId\" type=\"text\" name=\"taxId\" value={formData.taxId} onChange={handleChange} required />\n      </div>\n      <button type=\"submit\""
        ));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let new_field = field("phone", "Teléfono", "tel", false);
        let first = TemplatePatcher.patch(VENDOR_FORM, &new_field);
        assert!(first.changed());

        let second = TemplatePatcher.patch(&first.source, &new_field);
        assert!(!second.changed());
        assert_eq!(second.source, first.source);
    }

    #[test]
    fn test_patched_field_is_extracted() {
        let patch = TemplatePatcher.patch(VENDOR_FORM, &field("active", "Activo", "checkbox", false));
        assert!(patch.source.contains("active: false"));

        let names: Vec<_> = extract_fields(&patch.source)
            .into_iter()
            .map(|f| (f.name, f.label, f.field_type))
            .collect();
        assert_eq!(
            names,
            vec![
                ("name".to_string(), "Nombre".to_string(), "text".to_string()),
                ("email".to_string(), "Correo".to_string(), "email".to_string()),
                ("active".to_string(), "Activo".to_string(), "checkbox".to_string()),
            ]
        );
    }

    #[test]
    fn test_existing_field_is_left_alone() {
        let patch = TemplatePatcher.patch(VENDOR_FORM, &field("email", "Correo", "email", false));
        assert!(!patch.changed());
        assert_eq!(patch.source, VENDOR_FORM);
    }

    #[test]
    fn test_missing_anchors_skip_steps() {
        let source = r#"
const [form, setForm] = useState({ title: '' });
return <form><input value={form.title} onChange={handleChange} /></form>;
"#;
        let patch = TemplatePatcher.patch(source, &field("summary", "Resumen", "textarea", false));
        assert_eq!(patch.applied, vec![PatchStep::StateInitializer]);
        assert!(patch.source.contains("useState({ title: '', summary: '' })"));
    }

    #[test]
    fn test_no_form_state_is_a_no_op() {
        let source = "<form><button type=\"submit\">Ok</button></form>";
        let patch = TemplatePatcher.patch(source, &field("x", "X", "text", false));
        assert!(!patch.changed());
    }

    #[test]
    fn test_invalid_name_is_a_no_op() {
        let patch = TemplatePatcher.patch(VENDOR_FORM, &field("bad name", "X", "text", false));
        assert!(!patch.changed());
    }

    #[test]
    fn test_select_block_renders_placeholder_option() {
        let patch = TemplatePatcher.patch(VENDOR_FORM, &field("country", "País", "select", false));
        assert!(patch.source.contains(
            "        <select id=\"country\" name=\"country\" value={formData.country} onChange={handleChange}>\n          <option value=\"\">Seleccione...</option>\n        </select>\n"
        ));
    }

    #[test]
    fn test_rename_header() {
        let source = r#"<table><thead><tr>
  <th onClick={() => sortBy('cost')}>Costo {icon}</th>
  <th>Estado</th>
</tr></thead><tbody><tr><td>{a.cost}</td><td>{a.state}</td></tr></tbody></table>"#;

        let renamed = rename_header(source, "Costo", "Precio").unwrap();
        assert!(renamed.contains("sortBy('cost')}>Precio {icon}</th>"));
        let labels: Vec<_> = extract_columns(&renamed).into_iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["Precio", "Estado"]);

        assert!(rename_header(source, "Missing", "X").is_none());
    }

    #[test]
    fn test_rename_header_ignores_label_inside_expressions() {
        let source = r#"<table><thead><tr><th>Nombre {sortIcon('Nombre')}</th><th>{'Fecha'}</th></tr></thead>
<tbody><tr><td>{a.name}</td><td>{a.date}</td></tr></tbody></table>"#;

        let renamed = rename_header(source, "Nombre", "Name").unwrap();
        assert!(renamed.contains("<th>Name {sortIcon('Nombre')}</th>"));

        let renamed = rename_header(&renamed, "Fecha", "Date").unwrap();
        assert!(renamed.contains(r#"<th>{"Date"}</th>"#));
        let labels: Vec<_> = extract_columns(&renamed).into_iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["Name", "Date"]);
    }

    #[test]
    fn test_insert_property_keeps_trailing_comment_intact() {
        let source = "useState({\n    name: '' // nombre\n  })";
        let open = source.find('{').unwrap();
        assert_eq!(
            insert_property(source, open, "phone", "''").unwrap(),
            "useState({\n    name: '', // nombre\n    phone: ''\n  })"
        );

        let source = "useState({\n    name: '', // nombre\n  })";
        assert_eq!(
            insert_property(source, open, "phone", "''").unwrap(),
            "useState({\n    name: '', // nombre\n    phone: '',\n  })"
        );
    }

    #[test]
    fn test_insert_property_skips_comment_only_tail() {
        let source = "useState({\n    name: '',\n    // more fields later\n  })";
        let open = source.find('{').unwrap();
        assert_eq!(insert_property(source, open, "phone", "''"), None);

        let source = "useState({ name: '' /* nombre */ })";
        assert_eq!(insert_property(source, open, "phone", "''"), None);
    }
}
