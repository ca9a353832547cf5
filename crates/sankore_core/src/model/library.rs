//! Library domain model.
//!
//! # Responsibility
//! - Define named book collections and their behavior flags.
//! - Provide the default library set created at first run.
//!
//! # Invariants
//! - `name` is the unique key within a store.
//! - Book order inside a library is insertion order.

use crate::model::book::{Book, BookId};
use serde::{Deserialize, Serialize};

pub const TO_READ: &str = "To Read";
pub const CURRENTLY_READING: &str = "Currently Reading";
pub const READING_PAUSED: &str = "Reading Paused";
pub const ALREADY_READ: &str = "Already Read";

/// Named, described collection of books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Books in this library record a current run and reading position.
    #[serde(default)]
    pub tracks_progress: bool,
    /// Books in this library can receive a star rating.
    #[serde(default)]
    pub rateable: bool,
    #[serde(default)]
    pub books: Vec<Book>,
}

impl Library {
    /// Creates an empty library with both flags off.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tracks_progress: false,
            rateable: false,
            books: Vec::new(),
        }
    }

    pub fn tracking_progress(mut self) -> Self {
        self.tracks_progress = true;
        self
    }

    pub fn rateable(mut self) -> Self {
        self.rateable = true;
        self
    }

    /// Destination for books whose reading run reached the last page.
    pub fn already_read() -> Self {
        Self::new(ALREADY_READ, "Finished books.").rateable()
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.books.iter().any(|book| book.id == id)
    }

    pub fn position_of(&self, id: BookId) -> Option<usize> {
        self.books.iter().position(|book| book.id == id)
    }
}

/// Libraries created for a fresh store, in display order.
pub fn default_libraries() -> Vec<Library> {
    vec![
        Library::new(TO_READ, "Books waiting on the shelf."),
        Library::new(CURRENTLY_READING, "Books being read right now.").tracking_progress(),
        Library::new(READING_PAUSED, "Started, then put down for a while.").tracking_progress(),
        Library::already_read(),
    ]
}
