//! Reading statistics derived from the store.

use crate::store::Store;
use chrono::{Datelike, NaiveDate};

/// Aggregate reading figures for a store snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingStats {
    pub books: usize,
    pub in_progress: usize,
    pub completed_reads: usize,
    pub completed_this_month: usize,
    pub pages_read: u64,
}

/// Number of read records whose end date falls in `year`/`month`.
pub fn completed_in_month(store: &Store, year: i32, month: u32) -> usize {
    store
        .libraries()
        .iter()
        .flat_map(|library| library.books.iter())
        .flat_map(|book| book.reads.iter())
        .filter(|read| read.end.year() == year && read.end.month() == month)
        .count()
}

/// Computes aggregate figures, using `today` to pick the current month.
///
/// `pages_read` counts full page totals for every finished read plus the
/// position of every active run.
pub fn reading_stats(store: &Store, today: NaiveDate) -> ReadingStats {
    let books = || {
        store
            .libraries()
            .iter()
            .flat_map(|library| library.books.iter())
    };

    let pages_read = books()
        .map(|book| {
            let finished = u64::from(book.pages) * book.reads.len() as u64;
            let running = book
                .current_run
                .map_or(0, |run| u64::from(run.page.min(book.pages)));
            finished + running
        })
        .sum();

    ReadingStats {
        books: books().count(),
        in_progress: books().filter(|book| book.current_run.is_some()).count(),
        completed_reads: books().map(|book| book.reads.len()).sum(),
        completed_this_month: completed_in_month(store, today.year(), today.month()),
        pages_read,
    }
}
