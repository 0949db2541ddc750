//! History entry construction and atomic edit commit.
//!
//! # Responsibility
//! - Turn a detected change-set into an immutable `HistoryEntry`.
//! - Persist the new field values and the entry as one store operation.
//! - Classify a rejected atomic update (missing, deleted, stale version).
//!
//! # Invariants
//! - An empty change-set never becomes a history entry.
//! - Field update and history append are a single `update_atomic` call.

use crate::model::card::CardId;
use crate::model::history::{ChangeSet, HistoryEntry, ANONYMOUS_OPERATOR};
use crate::repo::card_repo::{CardFieldSet, CardStore, CardUpdate, RepoError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug)]
pub enum HistoryError {
    /// The change-set was empty; nothing to record.
    NoChange,
    NotFound(CardId),
    /// The card is soft-deleted and cannot be edited.
    Deleted(CardId),
    VersionConflict {
        card_id: CardId,
        expected: i64,
        actual: i64,
    },
    Repo(RepoError),
}

impl Display for HistoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoChange => write!(f, "nothing to save: the edit changes no field"),
            Self::NotFound(card_id) => write!(f, "card not found: {card_id}"),
            Self::Deleted(card_id) => write!(f, "deleted card cannot be edited: {card_id}"),
            Self::VersionConflict {
                card_id,
                expected,
                actual,
            } => write!(
                f,
                "card {card_id} was modified concurrently: expected version {expected}, found {actual}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HistoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for HistoryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Builds a history entry for one accepted edit.
///
/// A missing or blank `operator` is recorded as `anonymous`; any other
/// value is stored as supplied.
///
/// # Errors
/// - `NoChange` when `change_set` is empty.
pub fn record(
    card_id: CardId,
    change_set: ChangeSet,
    operator: Option<&str>,
    note: Option<String>,
    now_ms: i64,
) -> Result<HistoryEntry, HistoryError> {
    if change_set.is_empty() {
        return Err(HistoryError::NoChange);
    }

    let operator = operator
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(ANONYMOUS_OPERATOR)
        .to_string();
    let entry = HistoryEntry {
        history_id: Uuid::new_v4().to_string(),
        edit_time: now_ms,
        operator,
        change_set,
        note,
    };
    debug!(
        "event=history_record module=history status=ok card_id={} history_id={} changed={}",
        card_id,
        entry.history_id,
        entry.change_set.changed_fields().join(",")
    );
    Ok(entry)
}

/// Writes `fields` and appends `entry` in one atomic store operation.
///
/// The update only applies to an active card and, when `expected_version`
/// is supplied, only to that exact version.
pub fn commit_edit<S: CardStore>(
    store: &mut S,
    card_id: CardId,
    fields: CardFieldSet,
    entry: HistoryEntry,
    expected_version: Option<i64>,
) -> Result<(), HistoryError> {
    let update = CardUpdate {
        fields,
        history_append: Some(entry),
        expect_deleted: Some(false),
        expect_version: expected_version,
    };
    if store.update_atomic(card_id, &update)? > 0 {
        return Ok(());
    }

    let err = match store.find_by_id(card_id)? {
        None => HistoryError::NotFound(card_id),
        Some(card) if card.is_deleted => HistoryError::Deleted(card_id),
        Some(card) => match expected_version {
            Some(expected) if expected != card.version => HistoryError::VersionConflict {
                card_id,
                expected,
                actual: card.version,
            },
            _ => HistoryError::Repo(RepoError::NoRowsModified(card_id)),
        },
    };
    warn!(
        "event=history_commit module=history status=rejected card_id={} reason={}",
        card_id, err
    );
    Err(err)
}
