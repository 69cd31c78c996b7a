//! Menu item extraction
//!
//! Prefers an explicit `[{ path, label, icon, visible, order }]` array literal;
//! falls back to the emoji-prefixed links of a `<nav>` list.

use super::scan::{element_content, tag_end, text_fragments};
use super::MenuItem;
use once_cell::sync::Lazy;
use regex::Regex;

static OBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{[^{}]*\bpath\s*:\s*['"][^'"]*['"][^{}]*\}"#).expect("valid menu object regex")
});
static PATH_RE: Lazy<Regex> = Lazy::new(|| string_prop("path"));
static LABEL_RE: Lazy<Regex> = Lazy::new(|| string_prop("label"));
static ICON_RE: Lazy<Regex> = Lazy::new(|| string_prop("icon"));
static PARENT_RE: Lazy<Regex> = Lazy::new(|| string_prop("parentPath"));
static VISIBLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bvisible\s*:\s*(true|false)\b").expect("valid visible regex"));
static ORDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\border\s*:\s*(\d+)").expect("valid order regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(Link|NavLink|a)\b").expect("valid link regex"));
static HREF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:to|href)\s*=\s*(?:\{\s*)?["']([^"']+)["']"#).expect("valid href regex")
});

fn string_prop(name: &str) -> Regex {
    Regex::new(&format!(r#"\b{}\s*:\s*['"]([^'"]*)['"]"#, name)).expect("valid property regex")
}

/// Whether the source declares a menu array literal
pub fn has_menu_array(source: &str) -> bool {
    OBJECT_RE
        .find_iter(source)
        .any(|m| LABEL_RE.is_match(m.as_str()))
}

pub fn extract_items(source: &str) -> Vec<MenuItem> {
    let items = from_array(source);
    if items.is_empty() {
        from_nav_links(source)
    } else {
        items
    }
}

fn from_array(source: &str) -> Vec<MenuItem> {
    OBJECT_RE
        .find_iter(source)
        .map(|m| m.as_str())
        .filter(|object| LABEL_RE.is_match(object))
        .enumerate()
        .filter_map(|(i, object)| {
            let path = PATH_RE.captures(object)?[1].to_string();
            let label = LABEL_RE
                .captures(object)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| path.clone());
            Some(MenuItem {
                label,
                icon: ICON_RE
                    .captures(object)
                    .map(|c| c[1].to_string())
                    .unwrap_or_default(),
                visible: VISIBLE_RE
                    .captures(object)
                    .map_or(true, |c| &c[1] == "true"),
                order: ORDER_RE
                    .captures(object)
                    .and_then(|c| c[1].parse().ok())
                    .unwrap_or(i as u32 + 1),
                parent_path: PARENT_RE.captures(object).map(|c| c[1].to_string()),
                path,
            })
        })
        .collect()
}

fn from_nav_links(source: &str) -> Vec<MenuItem> {
    let region = match source.find("<nav") {
        Some(start) => {
            let end = tag_end(source, start)
                .and_then(|open_end| element_content(source, "nav", open_end))
                .map_or(source.len(), |(_, close)| close);
            &source[start..end]
        }
        None => source,
    };

    let mut items: Vec<MenuItem> = Vec::new();
    for m in LINK_RE.captures_iter(region) {
        let (Some(whole), Some(name)) = (m.get(0), m.get(1)) else {
            continue;
        };
        let Some(open_end) = tag_end(region, whole.start()) else {
            continue;
        };
        let Some(path) = HREF_RE
            .captures(&region[whole.start()..open_end])
            .map(|c| c[1].to_string())
        else {
            continue;
        };
        let Some((start, end)) = element_content(region, name.as_str(), open_end) else {
            continue;
        };
        let text = text_fragments(&region[start..end]).join(" ");
        let (icon, label) = split_icon(&text);
        if label.is_empty() || items.iter().any(|item| item.path == path) {
            continue;
        }
        items.push(MenuItem {
            order: items.len() as u32 + 1,
            path,
            label,
            icon,
            visible: true,
            parent_path: None,
        });
    }
    items
}

/// Split a leading emoji (with any joiners/variation selectors) from the text
pub fn split_icon(text: &str) -> (String, String) {
    let text = text.trim();
    let icon_len: usize = text
        .chars()
        .take_while(|c| !c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    let (icon, rest) = text.split_at(icon_len);
    (icon.to_string(), rest.trim().to_string())
}
