//! Identity-keyed diff over two todo lists.
//!
//! # Invariants
//! - `todo_id` is the only identity key; items with an empty id are skipped.
//! - When an id repeats inside one list, the last occurrence wins.
//! - Output order is deterministic: `added` and `modified` follow the new
//!   list, `removed` follows the old list.

use crate::model::card::TodoItem;
use std::collections::{HashMap, HashSet};

/// Field of a todo item that participates in modification detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoField {
    Text,
    Completed,
}

impl TodoField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Completed => "completed",
        }
    }
}

/// One changed field with its human-readable `old → new` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFieldChange {
    pub field: TodoField,
    pub transition: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoModification<'a> {
    pub old: &'a TodoItem,
    pub new: &'a TodoItem,
    pub changed_fields: Vec<TodoFieldChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoDiff<'a> {
    pub added: Vec<&'a TodoItem>,
    pub removed: Vec<&'a TodoItem>,
    pub modified: Vec<TodoModification<'a>>,
}

impl TodoDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Computes added/removed/modified todo items between two lists.
pub fn diff_todos<'a>(old: &'a [TodoItem], new: &'a [TodoItem]) -> TodoDiff<'a> {
    let old_map = identity_map(old);
    let new_map = identity_map(new);
    let mut diff = TodoDiff::default();

    for id in unique_ids(new) {
        let Some(&new_item) = new_map.get(id) else {
            continue;
        };
        match old_map.get(id) {
            None => diff.added.push(new_item),
            Some(&old_item) => {
                let changed_fields = changed_fields(old_item, new_item);
                if !changed_fields.is_empty() {
                    diff.modified.push(TodoModification {
                        old: old_item,
                        new: new_item,
                        changed_fields,
                    });
                }
            }
        }
    }

    for id in unique_ids(old) {
        if new_map.contains_key(id) {
            continue;
        }
        if let Some(&old_item) = old_map.get(id) {
            diff.removed.push(old_item);
        }
    }

    diff
}

fn identity_map(items: &[TodoItem]) -> HashMap<&str, &TodoItem> {
    items
        .iter()
        .filter(|item| !item.todo_id.is_empty())
        .map(|item| (item.todo_id.as_str(), item))
        .collect()
}

fn unique_ids(items: &[TodoItem]) -> Vec<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .map(|item| item.todo_id.as_str())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .collect()
}

fn changed_fields(old: &TodoItem, new: &TodoItem) -> Vec<TodoFieldChange> {
    let mut changes = Vec::new();
    if old.text != new.text {
        changes.push(TodoFieldChange {
            field: TodoField::Text,
            transition: format!("\"{}\" → \"{}\"", old.text, new.text),
        });
    }
    if old.completed != new.completed {
        changes.push(TodoFieldChange {
            field: TodoField::Completed,
            transition: format!(
                "{} → {}",
                completion_label(old.completed),
                completion_label(new.completed)
            ),
        });
    }
    changes
}

fn completion_label(completed: bool) -> &'static str {
    if completed {
        "done"
    } else {
        "open"
    }
}
