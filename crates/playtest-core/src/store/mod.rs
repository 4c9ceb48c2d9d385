//! SQLite store utilities for the program database.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while writers append
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` so enrollment/task/feedback rows cannot outlive
//!   their title

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, str::FromStr, time::Duration};

use crate::model::ParseEnumError;

/// Busy timeout used for program store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the program SQLite database, apply runtime pragmas,
/// and migrate schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    open_store_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// [`open_store`] with an explicit busy timeout, for callers that load one
/// from configuration.
///
/// # Errors
///
/// Returns an error if opening/configuring/migrating the database fails.
pub fn open_store_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create program db directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open program database {}", path.display()))?;

    configure_connection(&conn, busy_timeout).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply program store migrations")?;

    Ok(conn)
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}

/// Current wall-clock time in microseconds, the unit every `*_at_us`
/// column stores.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// Convert a SQLite COUNT into `usize` without panicking on weird values.
pub(crate) fn to_count(count: i64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Read a TEXT column holding one of the model enums.
///
/// Stored values are written via `as_str()`, so a parse failure means the
/// database was edited out-of-band; surface it as a conversion error rather
/// than panicking.
pub(crate) fn parse_enum_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|error: ParseEnumError| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}
