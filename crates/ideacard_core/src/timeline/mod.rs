//! Timeline reconstruction over all cards, deleted ones included.

pub mod reconstruct;
