//! Domain model for idea cards, their edit history and the derived timeline.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every card is identified by a stable `CardId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//! - History entries are immutable once created.

pub mod card;
pub mod history;
pub mod timeline;
