//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate detector, recorder, reconstructor and store into
//!   use-case level APIs.
//! - Keep transport layers decoupled from storage details.

pub mod card_service;
