//! Card use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/edit/delete/recover/history/timeline entry
//!   points for transport layers.
//! - Orchestrate validation, change detection, history recording and the
//!   single atomic store write of each edit.
//!
//! # Invariants
//! - An edit that changes nothing is rejected before any write.
//! - Deleted cards reject edits; delete/recover never touch history.
//! - The service is storage-agnostic and clock-agnostic.

use crate::config::ServiceLimits;
use crate::diff::change_detector::detect_changes;
use crate::history::recorder::{commit_edit, record, HistoryError};
use crate::model::card::{
    check_len, Card, CardId, CardSnapshot, CardStyle, CardValidationError, TodoItem,
    CONTENT_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::model::history::HistoryEntry;
use crate::model::timeline::TimeWindow;
use crate::repo::card_repo::{CardFieldSet, CardQuery, CardStore, CardUpdate, RepoError};
use crate::timeline::reconstruct::{build_timeline, Timeline};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Source of "now" in epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Service error for card use-cases.
#[derive(Debug)]
pub enum CardServiceError {
    /// Malformed identifier or out-of-range field.
    Validation(String),
    NotFound(CardId),
    /// Operation conflicts with the card's current state.
    InvalidState(String),
    /// The edit changes no field; nothing to save.
    NoChange,
    /// Store failure or an unexpected zero-row write.
    Persistence(RepoError),
}

impl CardServiceError {
    /// True for `InvalidState` and its `NoChange` special case.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_) | Self::NoChange)
    }
}

impl Display for CardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::NotFound(card_id) => write!(f, "card not found: {card_id}"),
            Self::InvalidState(reason) => write!(f, "{reason}"),
            Self::NoChange => write!(f, "nothing to save: the edit changes no field"),
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
        }
    }
}

impl Error for CardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CardServiceError {
    fn from(value: RepoError) -> Self {
        Self::Persistence(value)
    }
}

impl From<CardValidationError> for CardServiceError {
    fn from(value: CardValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<HistoryError> for CardServiceError {
    fn from(value: HistoryError) -> Self {
        match value {
            HistoryError::NoChange => Self::NoChange,
            HistoryError::NotFound(card_id) => Self::NotFound(card_id),
            HistoryError::Deleted(_) => {
                Self::InvalidState("deleted card cannot be edited".to_string())
            }
            conflict @ HistoryError::VersionConflict { .. } => {
                Self::InvalidState(conflict.to_string())
            }
            HistoryError::Repo(err) => Self::from(err),
        }
    }
}

pub type ServiceResult<T> = Result<T, CardServiceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCardRequest {
    pub title: String,
    pub content: String,
    /// Default preset when omitted.
    pub style: Option<CardStyle>,
}

/// Edit input carrying both the caller's old and new snapshots.
///
/// The stored card is consulted for existence, deletion state and version
/// only; the diff is computed between `old_*` and the new values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditCardRequest {
    pub title: String,
    pub content: String,
    pub style: Option<CardStyle>,
    pub todos: Vec<TodoItem>,
    pub old_title: String,
    pub old_content: String,
    pub old_style: Option<CardStyle>,
    pub old_todos: Vec<TodoItem>,
    pub operator: Option<String>,
    pub note: Option<String>,
    /// When set, the edit only applies to this stored version.
    pub expected_version: Option<i64>,
}

impl EditCardRequest {
    fn old_snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            title: self.old_title.clone(),
            content: self.old_content.clone(),
            style: self.old_style.clone(),
            todos: self.old_todos.clone(),
        }
    }

    fn new_snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            title: self.title.clone(),
            content: self.content.clone(),
            style: self.style.clone(),
            todos: self.todos.clone(),
        }
    }

    fn validate(&self) -> Result<(), CardValidationError> {
        self.new_snapshot().validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardList {
    pub cards: Vec<Card>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardHistory {
    pub card_id: CardId,
    pub card_title: String,
    pub total_edits: usize,
    /// Sorted by `edit_time DESC`; equal times list the later edit first.
    pub entries: Vec<HistoryEntry>,
}

/// Acknowledgement for state flips without a document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub card_id: CardId,
    pub message: &'static str,
}

/// Card service facade over a store and a clock.
pub struct CardService<S: CardStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    limits: ServiceLimits,
}

impl<S: CardStore> CardService<S, SystemClock> {
    /// Creates a service on the wall clock with default limits.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: CardStore, C: Clock> CardService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            limits: ServiceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ServiceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Creates one active card with an empty todo list and no history.
    pub fn create_card(&mut self, request: CreateCardRequest) -> ServiceResult<Card> {
        check_len("title", &request.title, TITLE_MAX_CHARS)?;
        check_len("content", &request.content, CONTENT_MAX_CHARS)?;

        let card = Card::new(
            request.title,
            request.content,
            request.style,
            self.clock.now_ms(),
        );
        let card_id = self.store.insert(&card)?;
        info!(
            "event=card_create module=service status=ok card_id={}",
            card_id
        );
        self.read_back(card_id)
    }

    /// Gets one card by id, deleted or not.
    pub fn get_card(&self, card_id: &str) -> ServiceResult<Card> {
        let card_id = parse_card_id(card_id)?;
        self.load(card_id)
    }

    /// Lists active cards, most recently updated first.
    pub fn list_active(&self) -> ServiceResult<CardList> {
        self.list(CardQuery::active(self.limits.list_limit))
    }

    /// Lists soft-deleted cards, most recently updated first.
    pub fn list_deleted(&self) -> ServiceResult<CardList> {
        self.list(CardQuery::deleted(self.limits.list_limit))
    }

    /// Applies one edit and appends its history entry atomically.
    ///
    /// # Errors
    /// - `Validation` for malformed id or out-of-range fields.
    /// - `NotFound` when the card does not exist.
    /// - `InvalidState` when the card is deleted or the version is stale.
    /// - `NoChange` when old and new snapshots are equivalent.
    pub fn edit_card(&mut self, card_id: &str, request: EditCardRequest) -> ServiceResult<Card> {
        let started_at = Instant::now();
        let result = self.edit_card_inner(card_id, request);
        match &result {
            Ok(card) => info!(
                "event=card_edit module=service status=ok card_id={} version={} duration_ms={}",
                card.id,
                card.version,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=card_edit module=service status=rejected duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn edit_card_inner(&mut self, card_id: &str, request: EditCardRequest) -> ServiceResult<Card> {
        request.validate()?;
        let card_id = parse_card_id(card_id)?;

        let current = self.load(card_id)?;
        if current.is_deleted {
            return Err(CardServiceError::InvalidState(
                "deleted card cannot be edited".to_string(),
            ));
        }

        let (change_set, has_change) =
            detect_changes(&request.old_snapshot(), &request.new_snapshot());
        if !has_change {
            return Err(CardServiceError::NoChange);
        }

        let now_ms = self.clock.now_ms();
        let entry = record(
            card_id,
            change_set,
            request.operator.as_deref(),
            request.note,
            now_ms,
        )?;
        let fields = CardFieldSet {
            title: Some(request.title),
            content: Some(request.content),
            style: Some(CardStyle::or_default(request.style)),
            todos: Some(request.todos),
            is_deleted: None,
            updated_at: now_ms,
        };
        commit_edit(
            &mut self.store,
            card_id,
            fields,
            entry,
            request.expected_version,
        )?;

        self.read_back(card_id)
    }

    /// Flags an active card as deleted, keeping its document and history.
    pub fn soft_delete(&mut self, card_id: &str) -> ServiceResult<Ack> {
        let card_id = parse_card_id(card_id)?;
        self.flip_deleted(card_id, true)?;
        Ok(Ack {
            card_id,
            message: "card deleted; it can be recovered from the deleted list",
        })
    }

    /// Clears the deleted flag of a soft-deleted card.
    pub fn recover(&mut self, card_id: &str) -> ServiceResult<Ack> {
        let card_id = parse_card_id(card_id)?;
        self.flip_deleted(card_id, false)?;
        Ok(Ack {
            card_id,
            message: "card recovered",
        })
    }

    /// Returns one card's history, newest edit first.
    pub fn get_history(&self, card_id: &str) -> ServiceResult<CardHistory> {
        let card = self.load(parse_card_id(card_id)?)?;
        let total_edits = card.history.len();

        let mut entries = card.history;
        entries.reverse();
        entries.sort_by(|a, b| b.edit_time.cmp(&a.edit_time));

        Ok(CardHistory {
            card_id: card.id,
            card_title: card.title,
            total_edits,
            entries,
        })
    }

    /// Rebuilds the global timeline over all cards, deleted ones included.
    pub fn get_timeline(&self, window: &TimeWindow) -> ServiceResult<Timeline> {
        let started_at = Instant::now();
        let cards = self
            .store
            .find_all(&CardQuery::all(self.limits.timeline_scan_limit))?;
        let timeline = build_timeline(&cards, window);
        info!(
            "event=timeline_build module=service status=ok cards={} events={} duration_ms={}",
            cards.len(),
            timeline.total,
            started_at.elapsed().as_millis()
        );
        Ok(timeline)
    }

    /// Same as `get_timeline`, with ISO-8601 bounds.
    pub fn get_timeline_iso(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> ServiceResult<Timeline> {
        let window = TimeWindow::parse(start, end).map_err(|value| {
            CardServiceError::Validation(format!("invalid timeline bound `{value}`"))
        })?;
        self.get_timeline(&window)
    }

    fn flip_deleted(&mut self, card_id: CardId, delete: bool) -> ServiceResult<()> {
        let current = self.load(card_id)?;
        if current.is_deleted == delete {
            return Err(CardServiceError::InvalidState(already_message(delete).to_string()));
        }

        let mut fields = CardFieldSet::touch(self.clock.now_ms());
        fields.is_deleted = Some(delete);
        let update = CardUpdate {
            fields,
            history_append: None,
            expect_deleted: Some(!delete),
            expect_version: None,
        };

        if self.store.update_atomic(card_id, &update)? == 0 {
            // Lost a race against another flip, or the row vanished.
            return match self.store.find_by_id(card_id)? {
                None => Err(CardServiceError::NotFound(card_id)),
                Some(card) if card.is_deleted == delete => Err(CardServiceError::InvalidState(
                    already_message(delete).to_string(),
                )),
                Some(_) => Err(CardServiceError::Persistence(RepoError::NoRowsModified(
                    card_id,
                ))),
            };
        }

        info!(
            "event={} module=service status=ok card_id={}",
            if delete { "card_delete" } else { "card_recover" },
            card_id
        );
        Ok(())
    }

    fn list(&self, query: CardQuery) -> ServiceResult<CardList> {
        let cards = self.store.find_all(&query)?;
        let total = cards.len();
        Ok(CardList { cards, total })
    }

    fn load(&self, card_id: CardId) -> ServiceResult<Card> {
        self.store
            .find_by_id(card_id)?
            .ok_or(CardServiceError::NotFound(card_id))
    }

    fn read_back(&self, card_id: CardId) -> ServiceResult<Card> {
        self.store
            .find_by_id(card_id)?
            .ok_or(CardServiceError::Persistence(RepoError::NoRowsModified(
                card_id,
            )))
    }
}

fn already_message(delete: bool) -> &'static str {
    if delete {
        "card is already deleted"
    } else {
        "card is not deleted; nothing to recover"
    }
}

/// Parses an opaque card id string.
pub fn parse_card_id(value: &str) -> ServiceResult<CardId> {
    Uuid::parse_str(value.trim())
        .map_err(|_| CardServiceError::Validation(format!("invalid card id `{value}`")))
}
