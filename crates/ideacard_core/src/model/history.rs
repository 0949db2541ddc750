//! Edit history model.
//!
//! # Invariants
//! - A persisted `HistoryEntry` always carries a non-empty `ChangeSet`.
//! - `ChangeSet` is sparse: unchanged fields are absent, never null-filled.

use crate::model::card::{CardStyle, TodoItem};
use serde::{Deserialize, Serialize};

/// Operator recorded when the caller does not supply one.
pub const ANONYMOUS_OPERATOR: &str = "anonymous";

/// Old/new pair for one changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange<T> {
    pub old: T,
    pub new: T,
}

impl<T> FieldChange<T> {
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }
}

/// Sparse diff of one accepted edit.
///
/// `todos` keeps both full lists; the added/removed/modified breakdown is
/// recomputed on read by the timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldChange<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FieldChange<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<FieldChange<CardStyle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todos: Option<FieldChange<Vec<TodoItem>>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.style.is_none()
            && self.todos.is_none()
    }

    /// Names of the fields present in this change-set, in fixed order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.content.is_some() {
            fields.push("content");
        }
        if self.style.is_some() {
            fields.push("style");
        }
        if self.todos.is_some() {
            fields.push("todos");
        }
        fields
    }
}

/// Immutable record of one accepted edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub history_id: String,
    /// Unix epoch milliseconds.
    pub edit_time: i64,
    pub operator: String,
    pub change_set: ChangeSet,
    pub note: Option<String>,
}
