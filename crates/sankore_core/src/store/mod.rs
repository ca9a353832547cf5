//! In-memory library store.
//!
//! # Responsibility
//! - Own the mapping of library name to `Library`.
//! - Provide query/mutation operations with one result-or-error-kind contract.
//! - Compute the synthetic `All Books` view on demand.
//!
//! # Invariants
//! - A book id and a book title each appear at most once across all libraries.
//! - Failed operations leave the store unchanged.
//! - `All Books` is never stored as a real library.

use crate::model::book::{Book, BookId, BookValidationError};
use crate::model::library::{default_libraries, Library, ALREADY_READ};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name of the synthetic union-of-all-libraries view.
pub const ALL_BOOKS: &str = "All Books";

pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse failure category shared by every store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    LibraryNotFound(String),
    BookNotFound(String),
    InvalidBook(BookValidationError),
    /// Library name is blank or reserved.
    InvalidLibraryName(String),
    DuplicateLibrary(String),
    DuplicateTitle(String),
    DuplicateId(BookId),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::LibraryNotFound(_) | Self::BookNotFound(_) => StoreErrorKind::NotFound,
            Self::InvalidBook(_) | Self::InvalidLibraryName(_) => StoreErrorKind::InvalidInput,
            Self::DuplicateLibrary(_) | Self::DuplicateTitle(_) | Self::DuplicateId(_) => {
                StoreErrorKind::Conflict
            }
        }
    }

    /// Process-style status code: 1 invalid input, 2 not found, 3 conflict.
    pub fn status_code(&self) -> u8 {
        match self.kind() {
            StoreErrorKind::InvalidInput => 1,
            StoreErrorKind::NotFound => 2,
            StoreErrorKind::Conflict => 3,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LibraryNotFound(name) => write!(f, "library not found: `{name}`"),
            Self::BookNotFound(title) => write!(f, "book not found: `{title}`"),
            Self::InvalidBook(err) => write!(f, "{err}"),
            Self::InvalidLibraryName(name) => write!(f, "invalid library name: `{name}`"),
            Self::DuplicateLibrary(name) => write!(f, "library already exists: `{name}`"),
            Self::DuplicateTitle(title) => {
                write!(f, "a book titled `{title}` is already catalogued")
            }
            Self::DuplicateId(id) => write!(f, "book id {id} appears more than once"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidBook(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BookValidationError> for StoreError {
    fn from(value: BookValidationError) -> Self {
        Self::InvalidBook(value)
    }
}

/// Full collection of libraries, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    libraries: Vec<Library>,
}

impl Store {
    /// Creates a store seeded with the first-run library set.
    pub fn with_default_libraries() -> Self {
        Self {
            libraries: default_libraries(),
        }
    }

    /// Builds a store from already-persisted libraries.
    pub fn from_libraries(libraries: Vec<Library>) -> Self {
        Self { libraries }
    }

    pub fn libraries(&self) -> &[Library] {
        &self.libraries
    }

    pub fn library(&self, name: &str) -> Option<&Library> {
        self.libraries.iter().find(|library| library.name == name)
    }

    fn library_mut(&mut self, name: &str) -> Option<&mut Library> {
        self.libraries
            .iter_mut()
            .find(|library| library.name == name)
    }

    /// Library names in creation order, optionally prefixed with `All Books`.
    pub fn list_libraries(&self, include_all: bool) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.libraries.len() + 1);
        if include_all {
            names.push(ALL_BOOKS);
        }
        names.extend(self.libraries.iter().map(|library| library.name.as_str()));
        names
    }

    /// Books of one library, or of every library for `All Books`.
    pub fn list_books(&self, library_name: &str) -> StoreResult<Vec<&Book>> {
        if library_name == ALL_BOOKS {
            return Ok(self.all_books().collect());
        }
        self.library(library_name)
            .map(|library| library.books.iter().collect())
            .ok_or_else(|| StoreError::LibraryNotFound(library_name.to_string()))
    }

    fn all_books(&self) -> impl Iterator<Item = &Book> {
        self.libraries
            .iter()
            .flat_map(|library| library.books.iter())
    }

    /// Exact-title lookup across all libraries.
    pub fn find_book(&self, title: &str) -> Option<&Book> {
        self.all_books().find(|book| book.title == title)
    }

    /// Name of the library that currently holds `book` (matched by id).
    pub fn find_library(&self, book: &Book) -> Option<&str> {
        self.libraries
            .iter()
            .find(|library| library.contains(book.id))
            .map(|library| library.name.as_str())
    }

    /// Appends a validated book to an existing library.
    pub fn insert_book(&mut self, library_name: &str, book: Book) -> StoreResult<()> {
        let book = book.clamped();
        book.validate()?;
        if self.library(library_name).is_none() {
            return Err(StoreError::LibraryNotFound(library_name.to_string()));
        }
        if self.all_books().any(|existing| existing.id == book.id) {
            return Err(StoreError::DuplicateId(book.id));
        }
        if self.find_book(&book.title).is_some() {
            return Err(StoreError::DuplicateTitle(book.title));
        }

        if let Some(library) = self.library_mut(library_name) {
            library.books.push(book);
        }
        Ok(())
    }

    /// Replaces `book_old` wholesale with `book_new`.
    ///
    /// The replacement keeps `book_old.id`. When the destination tracks
    /// progress and the replacement's run reached the last page, the book is
    /// routed to `Already Read` (created on demand).
    ///
    /// Returns the name of the library now holding the book.
    pub fn update_book(
        &mut self,
        book_old: &Book,
        book_new: Book,
        old_library: &str,
        new_library: Option<&str>,
    ) -> StoreResult<String> {
        let source = self
            .library(old_library)
            .ok_or_else(|| StoreError::LibraryNotFound(old_library.to_string()))?;
        let index = source
            .position_of(book_old.id)
            .ok_or_else(|| StoreError::BookNotFound(book_old.title.clone()))?;

        let requested = new_library.unwrap_or(old_library);
        let target = self
            .library(requested)
            .ok_or_else(|| StoreError::LibraryNotFound(requested.to_string()))?;

        let mut replacement = book_new.clamped();
        replacement.id = book_old.id;
        replacement.validate()?;

        let title_taken = self
            .all_books()
            .any(|book| book.id != replacement.id && book.title == replacement.title);
        if title_taken {
            return Err(StoreError::DuplicateTitle(replacement.title));
        }

        let destination = if target.tracks_progress && replacement.run_reached_end() {
            ALREADY_READ.to_string()
        } else {
            target.name.clone()
        };

        if destination == old_library {
            if let Some(source) = self.library_mut(old_library) {
                source.books[index] = replacement;
            }
            return Ok(destination);
        }

        if self.library(&destination).is_none() {
            self.libraries.push(Library::already_read());
        }
        if let Some(source) = self.library_mut(old_library) {
            source.books.remove(index);
        }
        if let Some(target) = self.library_mut(&destination) {
            target.books.push(replacement);
        }
        Ok(destination)
    }

    /// Removes `book` (matched by id) from a library.
    ///
    /// Returns `Ok(None)` when the library exists but does not hold the book.
    pub fn remove_book(&mut self, book: &Book, library_name: &str) -> StoreResult<Option<Book>> {
        let library = self
            .library_mut(library_name)
            .ok_or_else(|| StoreError::LibraryNotFound(library_name.to_string()))?;
        Ok(library
            .position_of(book.id)
            .map(|index| library.books.remove(index)))
    }

    /// Adds a library under `name`. Duplicate names are rejected.
    ///
    /// Books carried by `library` are clamped and must be unique, both among
    /// themselves and against the store.
    pub fn create_library(&mut self, name: &str, mut library: Library) -> StoreResult<()> {
        let name = name.trim();
        if name.is_empty() || name == ALL_BOOKS {
            return Err(StoreError::InvalidLibraryName(name.to_string()));
        }
        if self.library(name).is_some() {
            return Err(StoreError::DuplicateLibrary(name.to_string()));
        }

        let mut seen = BookKeys::default();
        for book in self.all_books() {
            seen.admit(book)?;
        }
        library.books = std::mem::take(&mut library.books)
            .into_iter()
            .map(|book| seen.admit_clamped(book))
            .collect::<StoreResult<_>>()?;

        library.name = name.to_string();
        self.libraries.push(library);
        Ok(())
    }

    /// Clamps every book and re-checks store-wide invariants.
    ///
    /// Used on data read back from storage, where nothing guarantees the
    /// document went through this type's mutators.
    pub fn checked(self) -> StoreResult<Self> {
        let mut names = HashSet::new();
        let mut seen = BookKeys::default();
        let mut libraries = Vec::with_capacity(self.libraries.len());
        for mut library in self.libraries {
            let name = library.name.trim();
            if name.is_empty() || name == ALL_BOOKS {
                return Err(StoreError::InvalidLibraryName(library.name));
            }
            if !names.insert(name.to_string()) {
                return Err(StoreError::DuplicateLibrary(library.name));
            }
            library.books = std::mem::take(&mut library.books)
                .into_iter()
                .map(|book| seen.admit_clamped(book))
                .collect::<StoreResult<_>>()?;
            libraries.push(library);
        }
        Ok(Self { libraries })
    }

    /// Total number of catalogued books.
    pub fn book_count(&self) -> usize {
        self.libraries.iter().map(|library| library.books.len()).sum()
    }
}

/// Titles and ids already claimed while admitting a batch of books.
#[derive(Default)]
struct BookKeys {
    titles: HashSet<String>,
    ids: HashSet<BookId>,
}

impl BookKeys {
    fn admit(&mut self, book: &Book) -> StoreResult<()> {
        if !self.ids.insert(book.id) {
            return Err(StoreError::DuplicateId(book.id));
        }
        if !self.titles.insert(book.title.clone()) {
            return Err(StoreError::DuplicateTitle(book.title.clone()));
        }
        Ok(())
    }

    fn admit_clamped(&mut self, book: Book) -> StoreResult<Book> {
        let book = book.clamped();
        book.validate()?;
        self.admit(&book)?;
        Ok(book)
    }
}
