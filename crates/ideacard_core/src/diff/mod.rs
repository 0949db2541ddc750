//! Pure diffing logic: todo list diff and card change detection.
//!
//! # Invariants
//! - No I/O and no shared state; results depend only on inputs.

pub mod change_detector;
pub mod todo_diff;
