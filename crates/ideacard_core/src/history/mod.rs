//! Edit history recording.
//!
//! # See also
//! - `repo::card_repo::CardStore::update_atomic` for the storage contract.

pub mod recorder;
