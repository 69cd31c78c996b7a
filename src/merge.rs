//! Merge Engine
//!
//! Combines freshly extracted structure with an administrator's override.
//! The template decides which items exist; the override decides their
//! order, label and visibility.

use crate::template::{FormField, MenuItem, Structure, TableColumn};
use std::collections::HashSet;

/// An item with a stable natural key and override-able presentation
pub trait Keyed: Clone {
    fn key(&self) -> &str;
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
    /// Take label, order and visibility from the override entry
    fn apply_override(&mut self, entry: &Self);
}

impl Keyed for FormField {
    fn key(&self) -> &str {
        &self.name
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    fn apply_override(&mut self, entry: &Self) {
        if !entry.label.trim().is_empty() {
            self.label = entry.label.clone();
        }
        self.order = entry.order;
        self.visible = entry.visible;
    }
}

impl Keyed for TableColumn {
    fn key(&self) -> &str {
        &self.label
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    // The label is the key, so only order and visibility can differ
    fn apply_override(&mut self, entry: &Self) {
        self.order = entry.order;
        self.visible = entry.visible;
    }
}

impl Keyed for MenuItem {
    fn key(&self) -> &str {
        &self.path
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }

    fn apply_override(&mut self, entry: &Self) {
        if !entry.label.trim().is_empty() {
            self.label = entry.label.clone();
        }
        if !entry.icon.is_empty() {
            self.icon = entry.icon.clone();
        }
        self.order = entry.order;
        self.visible = entry.visible;
        self.parent_path = entry.parent_path.clone();
    }
}

/// Merge one list: matched override entries first (by their order), then
/// extracted items the override does not mention, numbered after them.
pub fn merge_items<T: Keyed>(extracted: &[T], overrides: &[T]) -> Vec<T> {
    let mut used = HashSet::new();
    let mut merged: Vec<T> = Vec::with_capacity(extracted.len());

    for entry in overrides {
        if used.contains(entry.key()) {
            continue;
        }
        if let Some(found) = extracted.iter().find(|item| item.key() == entry.key()) {
            let mut item = found.clone();
            item.apply_override(entry);
            used.insert(entry.key().to_string());
            merged.push(item);
        }
    }
    merged.sort_by_key(|item| item.order());

    let appended = extracted.len().saturating_sub(merged.len());
    let last = merged.last().map_or(0, Keyed::order);
    // `next` is bumped once past the final appended item
    if u32::try_from(appended)
        .ok()
        .and_then(|n| n.checked_add(1))
        .and_then(|n| last.checked_add(n))
        .is_none()
    {
        // Renumber so the appended items still fit after the matched ones
        for (i, item) in merged.iter_mut().enumerate() {
            item.set_order(i as u32 + 1);
        }
    }

    let mut next = merged.last().map_or(0, Keyed::order) + 1;
    for item in extracted {
        if used.contains(item.key()) {
            continue;
        }
        let mut item = item.clone();
        item.set_order(next);
        next += 1;
        used.insert(item.key().to_string());
        merged.push(item);
    }
    merged
}

/// Place every root item directly before its children (depth first);
/// items whose parent is not in the set go last.
pub fn group_menu(items: Vec<MenuItem>) -> Vec<MenuItem> {
    let paths: HashSet<&str> = items.iter().map(|item| item.path.as_str()).collect();

    let mut sorted: Vec<&MenuItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.path.cmp(&b.path)));

    let mut placed: HashSet<&str> = HashSet::new();
    let mut grouped: Vec<MenuItem> = Vec::with_capacity(items.len());

    fn place<'a>(
        item: &'a MenuItem,
        sorted: &[&'a MenuItem],
        placed: &mut HashSet<&'a str>,
        grouped: &mut Vec<MenuItem>,
    ) {
        if !placed.insert(item.path.as_str()) {
            return;
        }
        grouped.push(item.clone());
        for child in sorted
            .iter()
            .filter(|c| c.parent_path.as_deref() == Some(item.path.as_str()))
        {
            place(*child, sorted, placed, grouped);
        }
    }

    for root in sorted.iter().filter(|item| item.parent_path.is_none()) {
        place(*root, &sorted, &mut placed, &mut grouped);
    }

    // Orphans, plus anything stuck in a parent cycle
    for item in &sorted {
        let orphan = item
            .parent_path
            .as_deref()
            .map_or(false, |parent| !paths.contains(parent));
        if orphan {
            place(*item, &sorted, &mut placed, &mut grouped);
        }
    }
    for item in &sorted {
        if !placed.contains(item.path.as_str()) {
            placed.insert(item.path.as_str());
            grouped.push((*item).clone());
        }
    }
    grouped
}

/// Effective structure: extraction is authoritative on existence, the
/// override on presentation. An override of a different kind is ignored.
pub fn merge(extracted: &Structure, overrides: Option<&Structure>) -> Structure {
    match (extracted, overrides) {
        (Structure::Form { fields }, Some(Structure::Form { fields: o })) => Structure::Form {
            fields: merge_items(fields, o),
        },
        (Structure::Table { columns }, Some(Structure::Table { columns: o })) => Structure::Table {
            columns: merge_items(columns, o),
        },
        (Structure::Menu { items }, Some(Structure::Menu { items: o })) => Structure::Menu {
            items: group_menu(merge_items(items, o)),
        },
        (Structure::Menu { items }, _) => Structure::Menu {
            items: group_menu(items.clone()),
        },
        (other, _) => other.clone(),
    }
}
