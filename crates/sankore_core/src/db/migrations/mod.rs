//! Catalog schema history.
//!
//! Version 1 holds libraries, books and quotes. Version 2 adds the
//! reading history (`ongoing_reads`, `finished_reads`). Each step runs in
//! its own transaction, so an interrupted upgrade stops at the last
//! completed version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    label: &'static str,
    sql: &'static str,
    /// Tables a connection must carry once this step is applied.
    tables: &'static [&'static str],
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        label: "catalog",
        sql: include_str!("0001_init.sql"),
        tables: &["libraries", "books", "quotes"],
    },
    SchemaStep {
        version: 2,
        label: "reading_history",
        sql: include_str!("0002_reading_history.sql"),
        tables: &["ongoing_reads", "finished_reads"],
    },
];

/// Schema version written by this build.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Upgrades the catalog schema to the latest version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    migrate_to(conn, latest_version())
}

/// Upgrades the catalog schema up to and including `target`.
///
/// Never downgrades: a connection already at or past `target` is left
/// alone unless it is newer than this build understands.
pub fn migrate_to(conn: &mut Connection, target: u32) -> DbResult<()> {
    let found = current_user_version(conn)?;
    if found > latest_version() {
        return Err(DbError::SchemaTooNew {
            found,
            supported: latest_version(),
        });
    }

    for step in STEPS
        .iter()
        .filter(|step| step.version > found && step.version <= target)
    {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok step={} to_version={}",
            step.label, step.version
        );
    }
    Ok(())
}

/// Confirms the connection is fully migrated and carries every catalog table.
pub fn ensure_catalog_schema(conn: &Connection) -> DbResult<()> {
    let found = current_user_version(conn)?;
    let expected = latest_version();
    if found > expected {
        return Err(DbError::SchemaTooNew {
            found,
            supported: expected,
        });
    }
    if found < expected {
        return Err(DbError::SchemaBehind { expected, found });
    }

    for table in STEPS.iter().flat_map(|step| step.tables.iter().copied()) {
        let present: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table],
            |row| row.get(0),
        )?;
        if !present {
            return Err(DbError::MissingTable(table));
        }
    }
    Ok(())
}

/// Reads `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}
