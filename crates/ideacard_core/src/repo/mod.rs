//! Card store gateway: contract and SQLite persistence.
//!
//! # Responsibility
//! - Define the document-store style contract the core depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Store APIs return semantic errors (`InvalidData`, `NoRowsModified`,
//!   `MissingRequiredTable`) in addition to DB transport errors.
//! - State update and history append are never split across two writes.

pub mod card_repo;
