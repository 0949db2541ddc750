//! Core domain logic for idea cards.
//!
//! Owns change detection, edit history and timeline reconstruction; the
//! transport layer only hands in validated input and renders the results.

pub mod config;
pub mod db;
pub mod diff;
pub mod history;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod timeline;

pub use config::{ConfigError, CoreConfig, ServiceLimits};
pub use diff::change_detector::detect_changes;
pub use diff::todo_diff::{diff_todos, TodoDiff, TodoField, TodoFieldChange, TodoModification};
pub use history::recorder::{commit_edit, record, HistoryError};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::card::{Card, CardId, CardSnapshot, CardStyle, CardValidationError, TodoItem};
pub use model::history::{ChangeSet, FieldChange, HistoryEntry, ANONYMOUS_OPERATOR};
pub use model::timeline::{TimeWindow, TimelineEvent, TimelineEventType};
pub use repo::card_repo::{
    CardFieldSet, CardQuery, CardStore, CardUpdate, RepoError, RepoResult, SqliteCardStore,
};
pub use service::card_service::{
    Ack, CardHistory, CardList, CardService, CardServiceError, Clock, CreateCardRequest,
    EditCardRequest, ServiceResult, SystemClock,
};
pub use timeline::reconstruct::{build_timeline, Timeline};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
