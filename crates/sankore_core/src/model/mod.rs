//! Book catalog domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by store and persistence layers.
//! - Keep validation and clamping rules next to the data they protect.
//!
//! # Invariants
//! - Every book is identified by a stable `BookId`.
//! - A book title is the user-facing natural key; ids are the internal key.

pub mod book;
pub mod library;
