//! Per-module selection lists and the pure edits applied to them.
//!
//! A selection list is an ordered `Vec<String>` treated as a set: entries are
//! unique by exact, case-sensitive comparison, so built-in suggestions and
//! custom entries share one namespace.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{KnowledgeBase, RecommendationKind};
use crate::integrity::ProjectSnapshot;
use crate::models::Module;

/// Why an edit left the list unchanged. Hosts show this instead of silently
/// doing nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// `select_all` found every candidate already selected.
    NothingNewToSelect,
    EmptyText,
    AlreadySelected(String),
    NotSelected(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingNewToSelect => f.write_str("All recommendations are already selected"),
            Self::EmptyText => f.write_str("Enter some text first"),
            Self::AlreadySelected(item) => write!(f, "'{item}' is already selected"),
            Self::NotSelected(item) => write!(f, "'{item}' is not in the selection"),
        }
    }
}

/// Result of an edit: the new list, plus a notice when nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Edit {
    pub items: Vec<String>,
    pub notice: Option<Notice>,
}

impl Edit {
    fn changed(items: Vec<String>) -> Self {
        Self {
            items,
            notice: None,
        }
    }

    fn unchanged(items: &[String], notice: Notice) -> Self {
        Self {
            items: items.to_vec(),
            notice: Some(notice),
        }
    }

    pub fn is_changed(&self) -> bool {
        self.notice.is_none()
    }
}

// ============================================================
// Pure list operations
// ============================================================

/// Candidates not yet selected, in candidate order.
pub fn available(candidates: &[String], selected: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| !selected.contains(c))
        .cloned()
        .collect()
}

/// `selected ∪ candidates`, new entries appended in candidate order.
pub fn select_all(candidates: &[String], selected: &[String]) -> Edit {
    let new = available(candidates, selected);
    if new.is_empty() {
        return Edit::unchanged(selected, Notice::NothingNewToSelect);
    }
    let mut items = selected.to_vec();
    items.extend(new);
    Edit::changed(items)
}

/// Append `text` (trimmed) unless it is empty or already present.
pub fn add_custom(selected: &[String], text: &str) -> Edit {
    let text = text.trim();
    if text.is_empty() {
        return Edit::unchanged(selected, Notice::EmptyText);
    }
    if selected.iter().any(|s| s == text) {
        return Edit::unchanged(selected, Notice::AlreadySelected(text.to_string()));
    }
    let mut items = selected.to_vec();
    items.push(text.to_string());
    Edit::changed(items)
}

/// Remove `item`, keeping the order of everything else.
pub fn remove(selected: &[String], item: &str) -> Edit {
    match selected.iter().position(|s| s == item) {
        Some(index) => {
            let mut items = selected.to_vec();
            items.remove(index);
            Edit::changed(items)
        }
        None => Edit::unchanged(selected, Notice::NotSelected(item.to_string())),
    }
}

/// Replace `old` with `new` in place.
///
/// Renaming to an empty string or to another entry already in the list is
/// refused, since either would break the set semantics.
pub fn rename(selected: &[String], old: &str, new: &str) -> Edit {
    let new = new.trim();
    let Some(index) = selected.iter().position(|s| s == old) else {
        return Edit::unchanged(selected, Notice::NotSelected(old.to_string()));
    };
    if new.is_empty() {
        return Edit::unchanged(selected, Notice::EmptyText);
    }
    if new == old {
        return Edit::changed(selected.to_vec());
    }
    if selected.iter().any(|s| s == new) {
        return Edit::unchanged(selected, Notice::AlreadySelected(new.to_string()));
    }
    let mut items = selected.to_vec();
    items[index] = new.to_string();
    Edit::changed(items)
}

// ============================================================
// Per-module selection maps
// ============================================================

/// Selected features and business rules, keyed by module id.
///
/// Owned by the host; nothing here is global. Each module's lists are
/// independent of every other module's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selections {
    #[serde(default)]
    features: HashMap<Uuid, Vec<String>>,
    #[serde(default)]
    rules: HashMap<Uuid, Vec<String>>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: RecommendationKind) -> &HashMap<Uuid, Vec<String>> {
        match kind {
            RecommendationKind::Feature => &self.features,
            RecommendationKind::BusinessRule => &self.rules,
        }
    }

    fn map_mut(&mut self, kind: RecommendationKind) -> &mut HashMap<Uuid, Vec<String>> {
        match kind {
            RecommendationKind::Feature => &mut self.features,
            RecommendationKind::BusinessRule => &mut self.rules,
        }
    }

    pub fn get(&self, module_id: Uuid, kind: RecommendationKind) -> &[String] {
        self.map(kind)
            .get(&module_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace a module's list wholesale, e.g. when loading from storage.
    pub fn set(&mut self, module_id: Uuid, kind: RecommendationKind, items: Vec<String>) {
        let map = self.map_mut(kind);
        if items.is_empty() {
            map.remove(&module_id);
        } else {
            map.insert(module_id, items);
        }
    }

    /// Module ids with at least one selection of `kind`.
    pub fn module_ids(&self, kind: RecommendationKind) -> impl Iterator<Item = Uuid> + '_ {
        self.map(kind).keys().copied()
    }

    pub fn available(
        &self,
        kb: &KnowledgeBase,
        module: &Module,
        kind: RecommendationKind,
    ) -> Vec<String> {
        available(kb.candidates(&module.name, kind), self.get(module.id, kind))
    }

    pub fn select_all(
        &mut self,
        kb: &KnowledgeBase,
        module: &Module,
        kind: RecommendationKind,
    ) -> Option<Notice> {
        let edit = select_all(kb.candidates(&module.name, kind), self.get(module.id, kind));
        self.commit(module.id, kind, edit)
    }

    pub fn add_custom(
        &mut self,
        module_id: Uuid,
        kind: RecommendationKind,
        text: &str,
    ) -> Option<Notice> {
        let edit = add_custom(self.get(module_id, kind), text);
        self.commit(module_id, kind, edit)
    }

    pub fn remove(
        &mut self,
        module_id: Uuid,
        kind: RecommendationKind,
        item: &str,
    ) -> Option<Notice> {
        let edit = remove(self.get(module_id, kind), item);
        self.commit(module_id, kind, edit)
    }

    pub fn rename(
        &mut self,
        module_id: Uuid,
        kind: RecommendationKind,
        old: &str,
        new: &str,
    ) -> Option<Notice> {
        let edit = rename(self.get(module_id, kind), old, new);
        self.commit(module_id, kind, edit)
    }

    /// Empty one list for a module.
    pub fn reset(&mut self, module_id: Uuid, kind: RecommendationKind) {
        self.map_mut(kind).remove(&module_id);
    }

    /// Empty both lists for a module.
    pub fn reset_module(&mut self, module_id: Uuid) {
        self.features.remove(&module_id);
        self.rules.remove(&module_id);
    }

    /// Drop selections belonging to modules that no longer exist.
    pub fn prune(&mut self, snapshot: &ProjectSnapshot) -> usize {
        let before = self.features.len() + self.rules.len();
        self.features.retain(|id, _| snapshot.module(*id).is_some());
        self.rules.retain(|id, _| snapshot.module(*id).is_some());
        let pruned = before - (self.features.len() + self.rules.len());
        if pruned > 0 {
            tracing::debug!(pruned, "dropped selections of deleted modules");
        }
        pruned
    }

    fn commit(&mut self, module_id: Uuid, kind: RecommendationKind, edit: Edit) -> Option<Notice> {
        if edit.notice.is_none() {
            self.set(module_id, kind, edit.items);
        }
        edit.notice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rename_keeps_position() {
        let edit = rename(&list(&["a", "b", "c"]), "b", "B");
        assert_eq!(edit.items, list(&["a", "B", "c"]));
        assert!(edit.is_changed());
    }

    #[test]
    fn rename_onto_existing_entry_is_refused() {
        let edit = rename(&list(&["a", "b"]), "a", "b");
        assert_eq!(edit.items, list(&["a", "b"]));
        assert_eq!(edit.notice, Some(Notice::AlreadySelected("b".into())));
    }

    #[test]
    fn remove_missing_item_reports_notice() {
        let edit = remove(&list(&["a"]), "z");
        assert_eq!(edit.items, list(&["a"]));
        assert_eq!(edit.notice, Some(Notice::NotSelected("z".into())));
    }

    #[test]
    fn add_custom_trims_and_rejects_blank() {
        assert_eq!(add_custom(&[], "  x ").items, list(&["x"]));
        assert_eq!(add_custom(&[], "   ").notice, Some(Notice::EmptyText));
    }

    #[test]
    fn set_with_empty_list_removes_entry() {
        let id = Uuid::new_v4();
        let mut sel = Selections::new();
        sel.set(id, RecommendationKind::Feature, list(&["a"]));
        sel.set(id, RecommendationKind::Feature, Vec::new());
        assert_eq!(sel.module_ids(RecommendationKind::Feature).count(), 0);
    }
}
