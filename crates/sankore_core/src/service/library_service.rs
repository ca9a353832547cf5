//! Library use-case service.
//!
//! # Responsibility
//! - Provide the catalog use-cases (new book, edit, progress, rating, quotes,
//!   reading log, move, delete, new library) over the in-memory store.
//! - Flush every successful mutation through a `LibraryRepository`.
//!
//! # Invariants
//! - Mutations run on a copy of the store; the copy replaces the live store
//!   only after the repository accepted it.
//! - Every mutation resolves the book's current location before replacing it.
//! - Service APIs never bypass store validation.

use crate::model::book::{Book, BookValidationError, NewBook};
use crate::model::library::{Library, ALREADY_READ};
use crate::repo::{LibraryRepository, RepoError, RepoResult};
use crate::store::{Store, StoreError};
use chrono::{Local, NaiveDate};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Store rejected the operation.
    Store(StoreError),
    /// Persistence-layer failure; the in-memory store was left untouched.
    Repo(RepoError),
    /// Book is not in a progress-tracking library.
    ProgressNotTracked { title: String, library: String },
    /// Book is not in a rateable library.
    RatingNotAllowed { title: String, library: String },
}

impl ServiceError {
    /// Process exit status for this failure.
    pub fn status_code(&self) -> u8 {
        match self {
            Self::Store(err) => err.status_code(),
            Self::ProgressNotTracked { .. } | Self::RatingNotAllowed { .. } => 1,
            Self::Repo(_) => 4,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::ProgressNotTracked { title, library } => write!(
                f,
                "`{title}` is in `{library}`, which does not track reading progress"
            ),
            Self::RatingNotAllowed { title, library } => write!(
                f,
                "`{title}` is in `{library}`, where books cannot be rated"
            ),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<BookValidationError> for ServiceError {
    fn from(value: BookValidationError) -> Self {
        Self::Store(StoreError::InvalidBook(value))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Full-replacement edit of the descriptive book fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookEdit {
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: Option<u32>,
}

/// Outcome of an edit or progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub book: Book,
    /// Library holding the book after the update.
    pub library: String,
    /// Whether this update finished the book.
    pub completed: bool,
}

/// Catalog service facade over a repository implementation.
pub struct LibraryService<R: LibraryRepository> {
    repo: R,
    store: Store,
    today: fn() -> NaiveDate,
}

impl<R: LibraryRepository> LibraryService<R> {
    /// Loads the store through `repo`.
    pub fn open(repo: R) -> RepoResult<Self> {
        let store = repo.load()?;
        Ok(Self {
            repo,
            store,
            today: local_today,
        })
    }

    /// Replaces the date source used for run starts and read records.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn list_libraries(&self, include_all: bool) -> Vec<&str> {
        self.store.list_libraries(include_all)
    }

    pub fn list_books(&self, library_name: &str) -> ServiceResult<Vec<&Book>> {
        Ok(self.store.list_books(library_name)?)
    }

    pub fn find_book(&self, title: &str) -> Option<&Book> {
        self.store.find_book(title)
    }

    pub fn find_library(&self, book: &Book) -> Option<&str> {
        self.store.find_library(book)
    }

    /// Catalogues a new book in `library_name`.
    pub fn add_book(&mut self, library_name: &str, new_book: NewBook) -> ServiceResult<Book> {
        let book = new_book.into_book()?;
        let stored = book.clone();
        self.commit("book_add", |store| {
            store.insert_book(library_name, book)?;
            Ok(())
        })?;
        Ok(stored)
    }

    /// Replaces title/author/pages of one book.
    ///
    /// In a progress-tracking library, lowering `pages` to the current run
    /// page finishes the book exactly like `update_progress` does.
    pub fn edit_book(&mut self, title: &str, edit: BookEdit) -> ServiceResult<UpdateOutcome> {
        let (current, library) = self.locate(title)?;
        let mut updated = current.clone();
        if let Some(new_title) = edit.title {
            updated.title = new_title;
        }
        if let Some(author) = edit.author {
            updated.author = author;
        }
        if let Some(pages) = edit.pages {
            updated.pages = pages;
        }
        let updated = updated.clamped();
        let completed = self.tracks_progress(&library) && updated.run_reached_end();
        self.settle("book_edit", &current, updated, &library, completed)
    }

    /// Records a new reading position for a book in a progress-tracking library.
    ///
    /// Reaching the last page closes the run into a read record and moves
    /// the book to `Already Read`.
    pub fn update_progress(&mut self, title: &str, page: u32) -> ServiceResult<UpdateOutcome> {
        let (current, library) = self.locate(title)?;
        if !self.tracks_progress(&library) {
            return Err(ServiceError::ProgressNotTracked {
                title: current.title,
                library,
            });
        }

        let updated = current.clone().with_progress(page, (self.today)());
        let completed = updated.current_run.is_none();
        self.settle("book_progress", &current, updated, &library, completed)
    }

    /// Rates a book in a rateable library, clamping to one..five stars.
    pub fn rate_book(&mut self, title: &str, stars: u8) -> ServiceResult<Book> {
        let (current, library) = self.locate(title)?;
        let rateable = self
            .store
            .library(&library)
            .map(|entry| entry.rateable)
            .unwrap_or(false);
        if !rateable {
            return Err(ServiceError::RatingNotAllowed {
                title: current.title,
                library,
            });
        }
        let updated = current.clone().with_rating(stars);
        self.replace("book_rate", &current, updated, &library)
    }

    /// Appends a quote to a book.
    pub fn add_quote(&mut self, title: &str, quote: &str) -> ServiceResult<Book> {
        let (current, library) = self.locate(title)?;
        let updated = current.clone().with_quote(quote)?;
        self.replace("book_quote", &current, updated, &library)
    }

    /// Logs a completed read with explicit dates.
    pub fn log_read(
        &mut self,
        title: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<Book> {
        let (current, library) = self.locate(title)?;
        let updated = current
            .clone()
            .with_logged_read(start, end, (self.today)())?;
        self.replace("book_log_read", &current, updated, &library)
    }

    /// Moves a book to another library, returning the library it ended in.
    ///
    /// A run left at its last page is closed first, so the move lands where
    /// it was asked to.
    pub fn move_book(&mut self, title: &str, to_library: &str) -> ServiceResult<String> {
        let (current, library) = self.locate(title)?;
        let updated = if current.run_reached_end() {
            current.clone().with_run_closed((self.today)())
        } else {
            current.clone()
        };
        self.commit("book_move", |store| {
            Ok(store.update_book(&current, updated, &library, Some(to_library))?)
        })
    }

    /// Deletes a book; callers confirm with the user beforehand.
    pub fn delete_book(&mut self, title: &str) -> ServiceResult<Book> {
        let (current, library) = self.locate(title)?;
        self.commit("book_delete", |store| {
            store
                .remove_book(&current, &library)?
                .ok_or_else(|| ServiceError::Store(StoreError::BookNotFound(current.title.clone())))
        })
    }

    /// Creates a new, empty library.
    pub fn create_library(
        &mut self,
        name: &str,
        description: &str,
        tracks_progress: bool,
        rateable: bool,
    ) -> ServiceResult<()> {
        let mut library = Library::new(name, description);
        library.tracks_progress = tracks_progress;
        library.rateable = rateable;
        self.commit("library_create", |store| {
            store.create_library(name, library)?;
            Ok(())
        })
    }

    fn locate(&self, title: &str) -> ServiceResult<(Book, String)> {
        let book = self
            .store
            .find_book(title)
            .ok_or_else(|| StoreError::BookNotFound(title.to_string()))?;
        let library = self
            .store
            .find_library(book)
            .ok_or_else(|| StoreError::BookNotFound(title.to_string()))?;
        Ok((book.clone(), library.to_string()))
    }

    fn tracks_progress(&self, library: &str) -> bool {
        self.store
            .library(library)
            .is_some_and(|entry| entry.tracks_progress)
    }

    /// Stores `updated`; a finished book gets its run closed today and moves
    /// to `Already Read`, which is created when missing.
    fn settle(
        &mut self,
        event: &str,
        current: &Book,
        updated: Book,
        library: &str,
        completed: bool,
    ) -> ServiceResult<UpdateOutcome> {
        let (updated, destination) = if completed {
            (updated.with_run_closed((self.today)()), Some(ALREADY_READ))
        } else {
            (updated, None)
        };
        let stored = updated.clone();

        let final_library = self.commit(event, |store| {
            if completed && store.library(ALREADY_READ).is_none() {
                store.create_library(ALREADY_READ, Library::already_read())?;
            }
            Ok(store.update_book(current, updated, library, destination)?)
        })?;

        Ok(UpdateOutcome {
            book: stored,
            library: final_library,
            completed,
        })
    }

    fn replace(
        &mut self,
        event: &str,
        current: &Book,
        updated: Book,
        library: &str,
    ) -> ServiceResult<Book> {
        let stored = updated.clone().clamped();
        self.commit(event, |store| {
            store.update_book(current, updated, library, None)?;
            Ok(())
        })?;
        Ok(stored)
    }

    /// Applies `mutate` to a copy of the store, persists it, then swaps it in.
    fn commit<T>(
        &mut self,
        event: &str,
        mutate: impl FnOnce(&mut Store) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut next = self.store.clone();
        let value = match mutate(&mut next) {
            Ok(value) => value,
            Err(err) => {
                warn!("event={event} module=service status=rejected error={err}");
                return Err(err);
            }
        };

        if let Err(err) = self.repo.save(&next) {
            warn!("event={event} module=service status=error error_code=save_failed error={err}");
            return Err(err.into());
        }
        self.store = next;
        info!(
            "event={event} module=service status=ok books={}",
            self.store.book_count()
        );
        Ok(value)
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
