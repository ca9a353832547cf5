//! SQLite catalog repository.
//!
//! # Responsibility
//! - Map the store onto `libraries`, `books`, `quotes`, `ongoing_reads` and
//!   `finished_reads` tables.
//! - Provide title-keyed row operations for single-book writes.
//!
//! # Invariants
//! - Every write path commits inside exactly one immediate transaction.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Ordering is kept through explicit `position` columns.

use crate::db::migrations::ensure_catalog_schema;
use crate::model::book::{Book, BookId, CurrentRun, Rating, ReadRecord};
use crate::model::library::Library;
use crate::repo::{LibraryRepository, RepoError, RepoResult};
use crate::store::Store;
use chrono::NaiveDate;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed catalog repository.
pub struct SqliteLibraryRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteLibraryRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_catalog_schema(conn)?;
        Ok(Self { conn })
    }

    /// Inserts or replaces one book, matched by id.
    ///
    /// An existing row keeps its position when it stays in the same library.
    /// A title held by a different stored book is rejected and nothing is
    /// written.
    pub fn upsert_book(&mut self, library_name: &str, book: &Book) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !library_exists(&tx, library_name)? {
            return Err(RepoError::InvalidData(format!(
                "unknown library `{library_name}` for book upsert"
            )));
        }

        let id_text = book.id.to_string();
        let title_holder: Option<String> = tx
            .query_row(
                "SELECT uuid FROM books WHERE title = ?1;",
                [book.title.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if title_holder.is_some_and(|holder| holder != id_text) {
            return Err(RepoError::DuplicateTitle(book.title.clone()));
        }

        let existing: Option<(String, i64)> = tx
            .query_row(
                "SELECT library_name, position FROM books WHERE uuid = ?1;",
                [id_text.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        delete_book_rows(&tx, BookKey::Uuid(&id_text))?;
        let position = match existing {
            Some((stored_library, position)) if stored_library == library_name => position,
            _ => next_book_position(&tx, library_name)?,
        };
        insert_book_rows(&tx, library_name, position, book)?;
        tx.commit()?;
        Ok(())
    }

    /// Deletes one book and its quotes and reading history by title.
    pub fn delete_book(&mut self, title: &str) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = delete_book_rows(&tx, BookKey::Title(title))?;
        if removed == 0 {
            return Err(RepoError::BookNotFound(title.to_string()));
        }
        tx.commit()?;
        Ok(())
    }

    /// Replaces the ongoing run and finished reads of one stored book.
    pub fn save_progress(&mut self, book: &Book) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let uuid: Option<String> = tx
            .query_row(
                "SELECT uuid FROM books WHERE title = ?1;",
                [book.title.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let uuid = uuid.ok_or_else(|| RepoError::BookNotFound(book.title.clone()))?;

        tx.execute("DELETE FROM ongoing_reads WHERE book_uuid = ?1;", [&uuid])?;
        tx.execute("DELETE FROM finished_reads WHERE book_uuid = ?1;", [&uuid])?;
        insert_history_rows(&tx, uuid.as_str(), book)?;
        tx.commit()?;
        Ok(())
    }
}

impl LibraryRepository for SqliteLibraryRepository<'_> {
    fn load(&self) -> RepoResult<Store> {
        let conn: &Connection = &*self.conn;
        let mut stmt = conn.prepare(
            "SELECT name, description, tracks_progress, rateable
             FROM libraries
             ORDER BY position ASC, name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut libraries = Vec::new();
        while let Some(row) = rows.next()? {
            let mut library = Library::new(
                row.get::<_, String>("name")?,
                row.get::<_, String>("description")?,
            );
            library.tracks_progress = int_to_bool(row.get("tracks_progress")?, "tracks_progress")?;
            library.rateable = int_to_bool(row.get("rateable")?, "rateable")?;
            libraries.push(library);
        }

        if libraries.is_empty() {
            info!("event=store_load module=repo backend=sqlite status=ok source=default reason=empty");
            return Ok(Store::with_default_libraries());
        }

        for library in &mut libraries {
            library.books = load_books(conn, library.name.as_str())?;
        }

        let store = Store::from_libraries(libraries)
            .checked()
            .map_err(|err| RepoError::InvalidData(err.to_string()))?;
        info!(
            "event=store_load module=repo backend=sqlite status=ok libraries={} books={}",
            store.libraries().len(),
            store.book_count()
        );
        Ok(store)
    }

    fn save(&mut self, store: &Store) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(
            "DELETE FROM quotes;
             DELETE FROM ongoing_reads;
             DELETE FROM finished_reads;
             DELETE FROM books;
             DELETE FROM libraries;",
        )?;

        for (library_position, library) in store.libraries().iter().enumerate() {
            tx.execute(
                "INSERT INTO libraries (name, description, tracks_progress, rateable, position)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    library.name.as_str(),
                    library.description.as_str(),
                    bool_to_int(library.tracks_progress),
                    bool_to_int(library.rateable),
                    position_to_db(library_position),
                ],
            )?;
            for (book_position, book) in library.books.iter().enumerate() {
                insert_book_rows(
                    &tx,
                    library.name.as_str(),
                    position_to_db(book_position),
                    book,
                )?;
            }
        }
        tx.commit()?;

        info!(
            "event=store_save module=repo backend=sqlite status=ok libraries={} books={}",
            store.libraries().len(),
            store.book_count()
        );
        Ok(())
    }
}

fn load_books(conn: &Connection, library_name: &str) -> RepoResult<Vec<Book>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, title, author, pages, rating
         FROM books
         WHERE library_name = ?1
         ORDER BY position ASC, title ASC;",
    )?;
    let mut rows = stmt.query([library_name])?;
    let mut books = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let id = parse_uuid(&uuid_text)?;

        let pages_value: i64 = row.get("pages")?;
        let pages = u32::try_from(pages_value).map_err(|_| {
            RepoError::InvalidData(format!("invalid page count `{pages_value}` in books.pages"))
        })?;
        let rating_value: i64 = row.get("rating")?;
        let rating = u8::try_from(rating_value)
            .ok()
            .filter(|value| *value <= 5)
            .ok_or_else(|| {
                RepoError::InvalidData(format!("invalid rating `{rating_value}` in books.rating"))
            })?;

        let mut book = Book::with_id(
            id,
            row.get::<_, String>("title")?,
            row.get::<_, String>("author")?,
            pages,
        );
        book.rating = Rating::from_stored(rating);
        book.quotes = load_quotes(conn, &uuid_text)?;
        book.reads = load_finished_reads(conn, &uuid_text)?;
        book.current_run = load_ongoing_read(conn, &uuid_text)?;
        book.validate().map_err(|err| {
            RepoError::InvalidData(format!("book `{uuid_text}` failed validation: {err}"))
        })?;
        books.push(book);
    }
    Ok(books)
}

fn load_quotes(conn: &Connection, book_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT content FROM quotes WHERE book_uuid = ?1 ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([book_uuid])?;
    let mut quotes = Vec::new();
    while let Some(row) = rows.next()? {
        quotes.push(row.get(0)?);
    }
    Ok(quotes)
}

fn load_finished_reads(conn: &Connection, book_uuid: &str) -> RepoResult<Vec<ReadRecord>> {
    let mut stmt = conn.prepare(
        "SELECT start_date, end_date
         FROM finished_reads
         WHERE book_uuid = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([book_uuid])?;
    let mut reads = Vec::new();
    while let Some(row) = rows.next()? {
        let start: String = row.get("start_date")?;
        let end: String = row.get("end_date")?;
        reads.push(ReadRecord {
            start: parse_date(&start, "finished_reads.start_date")?,
            end: parse_date(&end, "finished_reads.end_date")?,
        });
    }
    Ok(reads)
}

fn load_ongoing_read(conn: &Connection, book_uuid: &str) -> RepoResult<Option<CurrentRun>> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT start_date, page FROM ongoing_reads WHERE book_uuid = ?1;",
            [book_uuid],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((start, page)) => Ok(Some(CurrentRun {
            start: parse_date(&start, "ongoing_reads.start_date")?,
            page: u32::try_from(page).map_err(|_| {
                RepoError::InvalidData(format!("invalid page `{page}` in ongoing_reads.page"))
            })?,
        })),
        None => Ok(None),
    }
}

fn insert_book_rows(
    tx: &Transaction<'_>,
    library_name: &str,
    position: i64,
    book: &Book,
) -> RepoResult<()> {
    let uuid = book.id.to_string();
    tx.execute(
        "INSERT INTO books (uuid, title, author, pages, rating, library_name, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            uuid.as_str(),
            book.title.as_str(),
            book.author.as_str(),
            i64::from(book.pages),
            book.rating.map_or(0, |rating| i64::from(rating.stars())),
            library_name,
            position,
        ],
    )?;

    for (quote_position, quote) in book.quotes.iter().enumerate() {
        tx.execute(
            "INSERT INTO quotes (book_uuid, content, position) VALUES (?1, ?2, ?3);",
            params![uuid.as_str(), quote.as_str(), position_to_db(quote_position)],
        )?;
    }
    insert_history_rows(tx, uuid.as_str(), book)
}

fn insert_history_rows(tx: &Transaction<'_>, book_uuid: &str, book: &Book) -> RepoResult<()> {
    for (read_position, read) in book.reads.iter().enumerate() {
        tx.execute(
            "INSERT INTO finished_reads (book_uuid, start_date, end_date, position)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                book_uuid,
                format_date(read.start),
                format_date(read.end),
                position_to_db(read_position),
            ],
        )?;
    }

    if let Some(run) = book.current_run {
        tx.execute(
            "INSERT INTO ongoing_reads (book_uuid, start_date, page) VALUES (?1, ?2, ?3);",
            params![book_uuid, format_date(run.start), i64::from(run.page)],
        )?;
    }
    Ok(())
}

/// Column used to pick the book rows to delete.
enum BookKey<'a> {
    Title(&'a str),
    Uuid(&'a str),
}

/// Deletes one book row and its dependents.
fn delete_book_rows(tx: &Transaction<'_>, key: BookKey<'_>) -> RepoResult<usize> {
    let (column, value) = match key {
        BookKey::Title(title) => ("title", title),
        BookKey::Uuid(uuid) => ("uuid", uuid),
    };
    for table in ["quotes", "ongoing_reads", "finished_reads"] {
        tx.execute(
            &format!(
                "DELETE FROM {table} WHERE book_uuid IN (SELECT uuid FROM books WHERE {column} = ?1);"
            ),
            [value],
        )?;
    }
    let removed = tx.execute(&format!("DELETE FROM books WHERE {column} = ?1;"), [value])?;
    Ok(removed)
}

fn next_book_position(tx: &Transaction<'_>, library_name: &str) -> RepoResult<i64> {
    let position: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM books WHERE library_name = ?1;",
        [library_name],
        |row| row.get(0),
    )?;
    Ok(position)
}

fn library_exists(tx: &Transaction<'_>, library_name: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM libraries WHERE name = ?1);",
        [library_name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_uuid(value: &str) -> RepoResult<BookId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in books.uuid")))
}

fn parse_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in libraries.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn position_to_db(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}
