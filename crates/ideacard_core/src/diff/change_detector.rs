//! Change detection between two card snapshots.
//!
//! # Invariants
//! - `title` and `content` compare as plain strings.
//! - `style` compares as a whole record after substituting the default
//!   preset for an omitted style.
//! - `todos` count as changed iff the identity-keyed todo diff is non-empty.
//!   A pure reorder, or a change limited to todo timestamps, is not a change.
//! - The returned flag is true iff the change-set is non-empty.

use crate::diff::todo_diff::diff_todos;
use crate::model::card::{CardSnapshot, CardStyle};
use crate::model::history::{ChangeSet, FieldChange};

/// Compares `old` against `new` and returns the sparse change-set together
/// with a "has any change" verdict.
pub fn detect_changes(old: &CardSnapshot, new: &CardSnapshot) -> (ChangeSet, bool) {
    let mut change_set = ChangeSet::default();

    if old.title != new.title {
        change_set.title = Some(FieldChange::new(old.title.clone(), new.title.clone()));
    }
    if old.content != new.content {
        change_set.content = Some(FieldChange::new(old.content.clone(), new.content.clone()));
    }

    let old_style = CardStyle::or_default(old.style.clone());
    let new_style = CardStyle::or_default(new.style.clone());
    if old_style != new_style {
        change_set.style = Some(FieldChange::new(old_style, new_style));
    }

    if !diff_todos(&old.todos, &new.todos).is_empty() {
        change_set.todos = Some(FieldChange::new(old.todos.clone(), new.todos.clone()));
    }

    let has_change = !change_set.is_empty();
    (change_set, has_change)
}
