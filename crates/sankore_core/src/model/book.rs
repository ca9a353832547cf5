//! Book domain model.
//!
//! # Responsibility
//! - Define the canonical book record and its reading-history value types.
//! - Provide replacement-style helpers for edit/progress/rating/quote flows.
//! - Validate user input (titles, authors, page counts) before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another book.
//! - `current_page()` never exceeds `pages` once `clamped()` was applied.
//! - A set rating is always within `[MIN_RATING, MAX_RATING]`.
//! - Read records satisfy `end >= start`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a catalogued book.
pub type BookId = Uuid;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

static PAGE_INPUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+$").expect("valid page input regex"));

/// Star rating for a finished book.
///
/// Construction always clamps into `[MIN_RATING, MAX_RATING]`, including
/// values read back from persisted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Creates a rating, clamping out-of-range input.
    pub fn clamped(stars: u8) -> Self {
        Self(stars.clamp(MIN_RATING, MAX_RATING))
    }

    /// Maps the persisted `0 = unrated` convention back to an optional rating.
    pub fn from_stored(value: u8) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self::clamped(value))
        }
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl From<u8> for Rating {
    fn from(value: u8) -> Self {
        Self::clamped(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

fn deserialize_rating<'de, D>(deserializer: D) -> Result<Option<Rating>, D::Error>
where
    D: Deserializer<'de>,
{
    let stored = Option::<u8>::deserialize(deserializer)?;
    Ok(stored.and_then(Rating::from_stored))
}

/// One completed reading attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRecord {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// In-progress reading attempt: start date and last page reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentRun {
    pub start: NaiveDate,
    pub page: u32,
}

/// Validation failures for book records and user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    EmptyTitle,
    EmptyAuthor,
    ZeroPages,
    /// Page input contained something other than ASCII digits.
    InvalidPageInput(String),
    EmptyQuote,
    ReadRangeInverted {
        start: NaiveDate,
        end: NaiveDate,
    },
    ReadInFuture {
        end: NaiveDate,
        today: NaiveDate,
    },
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "book title must not be blank"),
            Self::EmptyAuthor => write!(f, "book author must not be blank"),
            Self::ZeroPages => write!(f, "page count must be greater than zero"),
            Self::InvalidPageInput(value) => {
                write!(f, "page count must contain digits only, got `{value}`")
            }
            Self::EmptyQuote => write!(f, "quote must not be blank"),
            Self::ReadRangeInverted { start, end } => {
                write!(f, "read ends ({end}) before it starts ({start})")
            }
            Self::ReadInFuture { end, today } => {
                write!(f, "read end date {end} is after today ({today})")
            }
        }
    }
}

impl Error for BookValidationError {}

/// Canonical catalogued book record.
///
/// Mutations are expressed as full replacement records: every helper below
/// consumes `self` and returns the updated book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Missing in documents written before ids existed; a fresh id is assigned on load.
    #[serde(default = "Uuid::new_v4")]
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub pages: u32,
    /// Persisted as `0` (or absent) when unrated.
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub quotes: Vec<String>,
    /// Completed reads, newest first.
    #[serde(default)]
    pub reads: Vec<ReadRecord>,
    #[serde(default)]
    pub current_run: Option<CurrentRun>,
}

impl Book {
    /// Creates an unread, unrated book with a generated stable ID.
    pub fn new(title: impl Into<String>, author: impl Into<String>, pages: u32) -> Self {
        Self::with_id(Uuid::new_v4(), title, author, pages)
    }

    /// Creates a book with a caller-provided stable ID.
    ///
    /// Used by persistence paths where identity already exists.
    pub fn with_id(
        id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        pages: u32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            pages,
            rating: None,
            quotes: Vec::new(),
            reads: Vec::new(),
            current_run: None,
        }
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if self.title.trim().is_empty() {
            return Err(BookValidationError::EmptyTitle);
        }
        if self.author.trim().is_empty() {
            return Err(BookValidationError::EmptyAuthor);
        }
        if self.pages == 0 {
            return Err(BookValidationError::ZeroPages);
        }
        for read in &self.reads {
            if read.end < read.start {
                return Err(BookValidationError::ReadRangeInverted {
                    start: read.start,
                    end: read.end,
                });
            }
        }
        Ok(())
    }

    /// Returns a copy with trimmed text fields and the run page clamped to `pages`.
    pub fn clamped(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.author = self.author.trim().to_string();
        if let Some(run) = self.current_run.as_mut() {
            run.page = run.page.min(self.pages);
        }
        self
    }

    /// Reading position.
    ///
    /// - Active run: the run's page.
    /// - No run but at least one finished read: `pages`.
    /// - Otherwise `0`.
    pub fn current_page(&self) -> u32 {
        match self.current_run {
            Some(run) => run.page.min(self.pages),
            None if !self.reads.is_empty() => self.pages,
            None => 0,
        }
    }

    /// Whether the active run has reached the last page.
    pub fn run_reached_end(&self) -> bool {
        self.current_run
            .map(|run| run.page >= self.pages)
            .unwrap_or(false)
    }

    /// Records a new reading position.
    ///
    /// Starts a run dated `today` when none is active. Reaching the last page
    /// closes the run into a read record that is prepended to `reads`.
    pub fn with_progress(mut self, page: u32, today: NaiveDate) -> Self {
        let page = page.min(self.pages);
        let start = self.current_run.map(|run| run.start).unwrap_or(today);
        self.current_run = Some(CurrentRun { start, page });
        if page == self.pages {
            self = self.with_run_closed(today);
        }
        self
    }

    /// Turns the active run, if any, into a read record ending `today`.
    ///
    /// A run that started after `today` ends on its start date.
    pub fn with_run_closed(mut self, today: NaiveDate) -> Self {
        if let Some(run) = self.current_run.take() {
            self.reads.insert(
                0,
                ReadRecord {
                    start: run.start,
                    end: today.max(run.start),
                },
            );
        }
        self
    }

    pub fn with_rating(mut self, stars: u8) -> Self {
        self.rating = Some(Rating::clamped(stars));
        self
    }

    /// Appends a trimmed quote.
    pub fn with_quote(mut self, quote: &str) -> Result<Self, BookValidationError> {
        let trimmed = quote.trim();
        if trimmed.is_empty() {
            return Err(BookValidationError::EmptyQuote);
        }
        self.quotes.push(trimmed.to_string());
        Ok(self)
    }

    /// Prepends a manually logged read.
    pub fn with_logged_read(
        mut self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, BookValidationError> {
        if end < start {
            return Err(BookValidationError::ReadRangeInverted { start, end });
        }
        if end > today {
            return Err(BookValidationError::ReadInFuture { end, today });
        }
        self.reads.insert(0, ReadRecord { start, end });
        Ok(self)
    }
}

/// User input for the "new book" flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub pages: u32,
}

impl NewBook {
    /// Builds a validated book with a fresh ID.
    pub fn into_book(self) -> Result<Book, BookValidationError> {
        let book = Book::new(self.title, self.author, self.pages).clamped();
        book.validate()?;
        Ok(book)
    }
}

/// Parses a digit-only page count.
pub fn parse_page_count(input: &str) -> Result<u32, BookValidationError> {
    let trimmed = input.trim();
    if !PAGE_INPUT_RE.is_match(trimmed) {
        return Err(BookValidationError::InvalidPageInput(input.to_string()));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| BookValidationError::InvalidPageInput(input.to_string()))
}

/// Title-cases a name for display. Never used for identity.
pub fn display_title(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                output.extend(ch.to_uppercase());
            } else {
                output.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            output.push(ch);
            at_word_start = !ch.is_alphanumeric();
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{display_title, parse_page_count, Book, BookValidationError, Rating};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn rating_is_clamped_into_star_range() {
        assert_eq!(Rating::clamped(0).stars(), 1);
        assert_eq!(Rating::clamped(9).stars(), 5);
        assert_eq!(Rating::from_stored(0), None);
        assert_eq!(Rating::from_stored(3), Some(Rating::clamped(3)));
    }

    #[test]
    fn progress_starts_run_then_closes_it_on_last_page() {
        let book = Book::new("Meditations", "Marcus Aurelius", 254);
        let started = book.with_progress(10, date(2024, 1, 1));
        let run = started.current_run.expect("run should start");
        assert_eq!(run.start, date(2024, 1, 1));
        assert_eq!(started.current_page(), 10);

        let finished = started.with_progress(900, date(2024, 1, 20));
        assert!(finished.current_run.is_none());
        assert_eq!(finished.reads.len(), 1);
        assert_eq!(finished.reads[0].start, date(2024, 1, 1));
        assert_eq!(finished.reads[0].end, date(2024, 1, 20));
        assert_eq!(finished.current_page(), 254);
    }

    #[test]
    fn closing_a_run_records_a_read() {
        let mut book = Book::new("De Oratore", "Cicero", 380);
        book.current_run = Some(super::CurrentRun {
            start: date(2024, 4, 2),
            page: 380,
        });
        let closed = book.with_run_closed(date(2024, 4, 30));
        assert!(closed.current_run.is_none());
        assert_eq!(closed.reads[0].start, date(2024, 4, 2));
        assert_eq!(closed.reads[0].end, date(2024, 4, 30));
        assert_eq!(closed.current_page(), 380);

        let untouched = closed.clone().with_run_closed(date(2024, 5, 1));
        assert_eq!(untouched, closed);
    }

    #[test]
    fn stored_zero_rating_reads_back_as_unrated() {
        let unrated: Book = serde_json::from_str(
            r#"{"title": "Aeneid", "author": "Virgil", "pages": 442, "rating": 0}"#,
        )
        .unwrap();
        assert_eq!(unrated.rating, None);
        let rated: Book = serde_json::from_str(
            r#"{"title": "Aeneid", "author": "Virgil", "pages": 442, "rating": 4}"#,
        )
        .unwrap();
        assert_eq!(rated.rating, Some(Rating::clamped(4)));
    }

    #[test]
    fn clamped_limits_run_page_to_page_count() {
        let mut book = Book::new("  Aeneid ", "Virgil", 442);
        book.current_run = Some(super::CurrentRun {
            start: date(2024, 2, 1),
            page: 1000,
        });
        let book = book.clamped();
        assert_eq!(book.title, "Aeneid");
        assert_eq!(book.current_page(), 442);
    }

    #[test]
    fn logged_read_rejects_inverted_and_future_ranges() {
        let book = Book::new("Metamorphoses", "Ovid", 723);
        let today = date(2024, 3, 1);
        let inverted = book
            .clone()
            .with_logged_read(date(2024, 2, 10), date(2024, 2, 1), today)
            .unwrap_err();
        assert!(matches!(
            inverted,
            BookValidationError::ReadRangeInverted { .. }
        ));
        let future = book
            .with_logged_read(date(2024, 2, 10), date(2024, 4, 1), today)
            .unwrap_err();
        assert!(matches!(future, BookValidationError::ReadInFuture { .. }));
    }

    #[test]
    fn page_input_accepts_digits_only() {
        assert_eq!(parse_page_count(" 254 ").unwrap(), 254);
        assert!(parse_page_count("25a").is_err());
        assert!(parse_page_count("-3").is_err());
        assert!(parse_page_count("").is_err());
    }

    #[test]
    fn display_title_is_cosmetic() {
        assert_eq!(display_title("on the ideal orator"), "On The Ideal Orator");
        assert_eq!(display_title("the gallic WAR"), "The Gallic War");
    }
}
