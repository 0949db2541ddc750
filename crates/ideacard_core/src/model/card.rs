//! Idea card domain model.
//!
//! # Responsibility
//! - Define the canonical card record, its style and embedded todo list.
//! - Provide lifecycle helpers for soft-delete semantics.
//! - Validate caller-supplied snapshots before they reach diffing logic.
//!
//! # Invariants
//! - `id` is stable and never reused for another card.
//! - `is_deleted` is the source of truth for tombstone state; a deleted card
//!   keeps its full document and history.
//! - `history` is append-only and ordered by insertion.

use crate::model::history::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one idea card.
pub type CardId = Uuid;

pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 2000;
pub const TODO_TEXT_MAX_CHARS: usize = 500;

/// Visual style of a card.
///
/// Compared as a whole record by the change detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStyle {
    pub bg_color: String,
    pub text_color: String,
    pub border_radius: String,
    pub shadow: String,
}

const PRESET_BG_COLORS: [&str; 6] = [
    "#FFF9C4", // yellow
    "#FED7E2", // pink
    "#E6F7FF", // blue
    "#E8F5E9", // green
    "#F3E5F5", // purple
    "#FFE0B2", // orange
];

impl CardStyle {
    /// Returns the built-in style presets; the first one is the default.
    pub fn presets() -> Vec<CardStyle> {
        PRESET_BG_COLORS
            .iter()
            .map(|bg| CardStyle {
                bg_color: (*bg).to_string(),
                text_color: "#333333".to_string(),
                border_radius: "20px".to_string(),
                shadow: "soft".to_string(),
            })
            .collect()
    }

    /// Substitutes the default preset for an omitted style.
    pub fn or_default(style: Option<CardStyle>) -> CardStyle {
        style.unwrap_or_default()
    }
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            bg_color: PRESET_BG_COLORS[0].to_string(),
            text_color: "#333333".to_string(),
            border_radius: "20px".to_string(),
            shadow: "soft".to_string(),
        }
    }
}

/// One entry of a card's embedded to-do list.
///
/// `todo_id` is caller-supplied and is the only identity key used for
/// diffing; text or position changes never change identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub todo_id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl TodoItem {
    /// Creates an open todo with both timestamps set to `now_ms`.
    pub fn new(todo_id: impl Into<String>, text: impl Into<String>, now_ms: i64) -> Self {
        Self {
            todo_id: todo_id.into(),
            text: text.into(),
            completed: false,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Fully hydrated card document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub content: String,
    pub style: CardStyle,
    pub todos: Vec<TodoItem>,
    pub is_deleted: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Refreshed by edits, soft-delete and recovery.
    pub updated_at: i64,
    /// Optimistic-concurrency token, bumped on every accepted state change.
    pub version: i64,
    pub history: Vec<HistoryEntry>,
}

impl Card {
    /// Creates a new active card with a generated stable ID.
    ///
    /// # Invariants
    /// - `todos` and `history` start empty.
    /// - `created_at == updated_at == now_ms`.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        style: Option<CardStyle>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            style: CardStyle::or_default(style),
            todos: Vec::new(),
            is_deleted: false,
            created_at: now_ms,
            updated_at: now_ms,
            version: 1,
            history: Vec::new(),
        }
    }
}

/// Editable state of a card as seen by one caller.
///
/// `style = None` means "omitted"; the default preset is substituted
/// before comparison and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub style: Option<CardStyle>,
    #[serde(default)]
    pub todos: Vec<TodoItem>,
}

impl CardSnapshot {
    /// Validates field bounds and todo identity uniqueness.
    pub fn validate(&self) -> Result<(), CardValidationError> {
        check_len("title", &self.title, TITLE_MAX_CHARS)?;
        check_len("content", &self.content, CONTENT_MAX_CHARS)?;
        validate_todos(&self.todos)
    }
}

/// Validation failure for caller-supplied card data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardValidationError {
    Empty(&'static str),
    TooLong { field: &'static str, max: usize },
    MissingTodoId,
    DuplicateTodoId(String),
}

impl Display for CardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(field) => write!(f, "{field} must not be empty"),
            Self::TooLong { field, max } => {
                write!(f, "{field} exceeds the maximum of {max} characters")
            }
            Self::MissingTodoId => write!(f, "todo_id must not be empty"),
            Self::DuplicateTodoId(id) => write!(f, "duplicate todo_id `{id}`"),
        }
    }
}

impl Error for CardValidationError {}

/// Checks a required, bounded text field.
pub fn check_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), CardValidationError> {
    if value.is_empty() {
        return Err(CardValidationError::Empty(field));
    }
    if value.chars().count() > max {
        return Err(CardValidationError::TooLong { field, max });
    }
    Ok(())
}

fn validate_todos(todos: &[TodoItem]) -> Result<(), CardValidationError> {
    let mut seen = HashSet::new();
    for todo in todos {
        if todo.todo_id.trim().is_empty() {
            return Err(CardValidationError::MissingTodoId);
        }
        if !seen.insert(todo.todo_id.as_str()) {
            return Err(CardValidationError::DuplicateTodoId(todo.todo_id.clone()));
        }
        check_len("todo text", &todo.text, TODO_TEXT_MAX_CHARS)?;
    }
    Ok(())
}
