//! Command-line front end for the Sankore book tracker.
//!
//! # Responsibility
//! - Bind each subcommand to exactly one catalog use-case.
//! - Resolve configuration, start logging and pick the persistence backend.
//!
//! # Invariants
//! - Exit status is 0 on success and the error's status code otherwise.
//! - Deleting a book requires explicit `--yes` confirmation.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::{info, warn};
use sankore_core::config::install_dir;
use sankore_core::db::open_db;
use sankore_core::{
    display_title, init_logging, parse_page_count, reading_stats, AppConfig, BackendKind, Book,
    BookEdit, ConfigError, JsonFileRepository, LibraryRepository, LibraryService, NewBook,
    RepoError, ServiceError, SqliteLibraryRepository, StoreError, ALL_BOOKS, TO_READ,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "sankore", version, about = "Catalog books, track reading progress and quotes")]
struct Cli {
    /// Catalog data file (.json, .sqlite3, .sqlite or .db), relative to the install directory.
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List library names.
    Libraries {
        /// Omit the synthetic "All Books" entry.
        #[arg(long)]
        no_all: bool,
    },
    /// List the books of one library.
    Books {
        #[arg(default_value = ALL_BOOKS)]
        library: String,
    },
    /// Show one book with its quotes and reading history.
    Show { title: String },
    /// Catalog a new book.
    Add {
        #[arg(long, default_value = TO_READ)]
        library: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long, value_parser = parse_pages)]
        pages: u32,
    },
    /// Edit title, author or page count.
    Edit {
        title: String,
        #[arg(long)]
        new_title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long, value_parser = parse_pages)]
        pages: Option<u32>,
    },
    /// Record the page reached.
    Progress {
        title: String,
        #[arg(value_parser = parse_pages)]
        page: u32,
    },
    /// Rate a finished book (1-5 stars).
    Rate { title: String, stars: u8 },
    /// Save a quote from a book.
    Quote { title: String, text: String },
    /// Log a completed read (YYYY-MM-DD or DD/MM/YYYY).
    LogRead {
        title: String,
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        #[arg(value_parser = parse_date)]
        end: NaiveDate,
    },
    /// Move a book to another library.
    Move { title: String, library: String },
    /// Delete a book.
    Delete {
        title: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Create a library.
    NewLibrary {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        track_progress: bool,
        #[arg(long)]
        rateable: bool,
    },
    /// Show reading statistics.
    Stats,
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Repo(RepoError),
    Service(ServiceError),
    /// Destructive command issued without confirmation.
    Unconfirmed(String),
}

impl CliError {
    fn status_code(&self) -> u8 {
        match self {
            Self::Service(err) => err.status_code(),
            Self::Unconfirmed(_) => 1,
            Self::Repo(_) => 4,
            Self::Config(_) => 5,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Unconfirmed(title) => {
                write!(f, "refusing to delete `{title}` without --yes")
            }
        }
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            warn!("event=cli_exit module=cli status=error code={}", err.status_code());
            eprintln!("error: {err}");
            ExitCode::from(err.status_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let install = install_dir()?;
    let mut config = AppConfig::for_install_dir(&install);
    if let Some(data) = cli.data.as_ref() {
        config = config.with_data_path(&install, data)?;
    }
    if let Some(level) = cli.log_level {
        config = config.with_log_level(level);
    }
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: file logging disabled: {err}");
    }
    info!(
        "event=cli_start module=cli status=ok backend={:?}",
        config.backend
    );

    match config.backend {
        BackendKind::Json => {
            let repo = JsonFileRepository::new(&config.data_path);
            execute(LibraryService::open(repo)?, cli.command)
        }
        BackendKind::Sqlite => {
            let mut conn = open_db(&config.data_path).map_err(RepoError::from)?;
            let repo = SqliteLibraryRepository::try_new(&mut conn)?;
            execute(LibraryService::open(repo)?, cli.command)
        }
    }
}

fn execute<R: LibraryRepository>(
    mut service: LibraryService<R>,
    command: Command,
) -> Result<(), CliError> {
    match command {
        Command::Libraries { no_all } => {
            for name in service.list_libraries(!no_all) {
                println!("{name}");
            }
        }
        Command::Books { library } => {
            for book in service.list_books(&library)? {
                println!("{}", book_line(book));
            }
        }
        Command::Show { title } => {
            let book = service
                .find_book(&title)
                .ok_or_else(|| ServiceError::Store(StoreError::BookNotFound(title)))?;
            print_book(book, service.find_library(book).unwrap_or("?"));
        }
        Command::Add {
            library,
            title,
            author,
            pages,
        } => {
            let book = service.add_book(
                &library,
                NewBook {
                    title,
                    author,
                    pages,
                },
            )?;
            println!("Added {} to {library}.", display_title(&book.title));
        }
        Command::Edit {
            title,
            new_title,
            author,
            pages,
        } => {
            let outcome = service.edit_book(
                &title,
                BookEdit {
                    title: new_title,
                    author,
                    pages,
                },
            )?;
            println!("{}", book_line(&outcome.book));
            if outcome.completed {
                println!("Finished! Moved to {}.", outcome.library);
            } else {
                println!("  library: {}", outcome.library);
            }
        }
        Command::Progress { title, page } => {
            let outcome = service.update_progress(&title, page)?;
            if outcome.completed {
                println!(
                    "Finished {}! Moved to {}.",
                    display_title(&outcome.book.title),
                    outcome.library
                );
            } else {
                println!(
                    "Reached page {} out of {}.",
                    outcome.book.current_page(),
                    outcome.book.pages
                );
            }
        }
        Command::Rate { title, stars } => {
            let book = service.rate_book(&title, stars)?;
            println!("{}", book_line(&book));
        }
        Command::Quote { title, text } => {
            let book = service.add_quote(&title, &text)?;
            println!(
                "Saved quote #{} for {}.",
                book.quotes.len(),
                display_title(&book.title)
            );
        }
        Command::LogRead { title, start, end } => {
            let book = service.log_read(&title, start, end)?;
            println!(
                "Logged read of {} ({} reads recorded).",
                display_title(&book.title),
                book.reads.len()
            );
        }
        Command::Move { title, library } => {
            let destination = service.move_book(&title, &library)?;
            println!("Moved {} to {destination}.", display_title(&title));
        }
        Command::Delete { title, yes } => {
            if !yes {
                return Err(CliError::Unconfirmed(title));
            }
            let book = service.delete_book(&title)?;
            println!("Deleted {}.", display_title(&book.title));
        }
        Command::NewLibrary {
            name,
            description,
            track_progress,
            rateable,
        } => {
            service.create_library(&name, &description, track_progress, rateable)?;
            println!("Created library {name}.");
        }
        Command::Stats => {
            let stats = reading_stats(service.store(), Local::now().date_naive());
            println!(
                "You've completed {} books this month!",
                stats.completed_this_month
            );
            println!(
                "{} books catalogued, {} in progress, {} reads finished, {} pages read.",
                stats.books, stats.in_progress, stats.completed_reads, stats.pages_read
            );
        }
    }
    Ok(())
}

fn book_line(book: &Book) -> String {
    let rating = book
        .rating
        .map(|rating| format!(" {}", "*".repeat(usize::from(rating.stars()))))
        .unwrap_or_default();
    format!(
        "{} by {} ({}/{} pages){}",
        display_title(&book.title),
        display_title(&book.author),
        book.current_page(),
        book.pages,
        rating
    )
}

fn print_book(book: &Book, library: &str) {
    println!("{}", book_line(book));
    println!("  library: {library}");
    if let Some(run) = book.current_run {
        println!("  reading since {} (page {})", run.start, run.page);
    }
    for read in &book.reads {
        println!("  read {} .. {}", read.start, read.end);
    }
    for quote in &book.quotes {
        println!("  \"{quote}\"");
    }
}

fn parse_pages(value: &str) -> Result<u32, String> {
    parse_page_count(value).map_err(|err| err.to_string())
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date `{value}`; expected YYYY-MM-DD or DD/MM/YYYY"))
}
