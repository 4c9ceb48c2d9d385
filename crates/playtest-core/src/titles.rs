//! Title registry and the one-way promotion gate.
//!
//! Titles enter the program in `testing` and leave it through [`promote`],
//! a single-row compare-and-set to `released`. There is no demotion: once
//! released, every further promote observes [`EngineError::AlreadyReleased`].

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::EngineError;
use crate::model::{Caller, PublisherId, ReleaseState, TitleId};
use crate::outbound::{Notification, Outbound, emit_notification};
use crate::store::{now_us, parse_enum_column, to_count};

/// A registered title and where it sits in its release lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleRecord {
    pub title_id: String,
    pub publisher_id: String,
    pub release_state: ReleaseState,
    pub registered_at_us: i64,
    pub released_at_us: Option<i64>,
}

/// Publisher dashboard aggregates for one title.
///
/// Every count is computed from the underlying tables at read time; nothing
/// here trusts the denormalized enrollment counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestingSummary {
    pub title: TitleRecord,
    pub active_testers: usize,
    pub total_enrollments: usize,
    pub tasks: usize,
    pub completions: usize,
    pub feedback_items: usize,
    pub open_bugs: usize,
    pub time_spent_seconds: i64,
}

const TITLE_COLUMNS: &str =
    "title_id, publisher_id, release_state, registered_at_us, released_at_us";

fn row_to_title(row: &rusqlite::Row<'_>) -> rusqlite::Result<TitleRecord> {
    Ok(TitleRecord {
        title_id: row.get(0)?,
        publisher_id: row.get(1)?,
        release_state: parse_enum_column(row, 2)?,
        registered_at_us: row.get(3)?,
        released_at_us: row.get(4)?,
    })
}

fn fetch(conn: &Connection, title_id: &str) -> Result<Option<TitleRecord>, EngineError> {
    let sql = format!("SELECT {TITLE_COLUMNS} FROM titles WHERE title_id = ?1");
    match conn.query_row(&sql, params![title_id], row_to_title) {
        Ok(title) => Ok(Some(title)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Look up a title by id.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub fn get(conn: &Connection, title_id: &TitleId) -> Result<Option<TitleRecord>, EngineError> {
    fetch(conn, title_id.as_str())
}

/// Like [`get`], but a missing title is an error. Used by every operation
/// that needs the title row as a precondition.
pub(crate) fn require(conn: &Connection, title_id: &str) -> Result<TitleRecord, EngineError> {
    fetch(conn, title_id)?.ok_or_else(|| EngineError::TitleNotFound(title_id.to_string()))
}

/// [`require`], plus an ownership check against the calling publisher.
pub(crate) fn require_owned(
    conn: &Connection,
    title_id: &str,
    publisher: &PublisherId,
) -> Result<TitleRecord, EngineError> {
    let title = require(conn, title_id)?;
    if title.publisher_id != publisher.as_str() {
        return Err(EngineError::Forbidden {
            action: "manage this title",
        });
    }
    Ok(title)
}

/// Register a title into the testing program. Publisher-only.
///
/// The title enters directly in the `testing` state; draft bookkeeping
/// belongs to the publisher's own catalog, not to this engine.
///
/// # Errors
///
/// Returns [`EngineError::TitleAlreadyRegistered`] for a duplicate id, or
/// [`EngineError::Forbidden`] when the caller is not a publisher.
pub fn register(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<TitleRecord, EngineError> {
    let publisher = caller.as_publisher()?;
    let now = now_us();

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO titles (title_id, publisher_id, release_state, registered_at_us)
         VALUES (?1, ?2, 'testing', ?3)",
        params![title_id.as_str(), publisher.as_str(), now],
    )?;
    if inserted == 0 {
        return Err(EngineError::TitleAlreadyRegistered(
            title_id.as_str().to_string(),
        ));
    }

    tracing::info!(
        title_id = %title_id,
        publisher_id = %publisher,
        "title registered for testing"
    );

    Ok(TitleRecord {
        title_id: title_id.as_str().to_string(),
        publisher_id: publisher.as_str().to_string(),
        release_state: ReleaseState::Testing,
        registered_at_us: now,
        released_at_us: None,
    })
}

/// Promote a title from `testing` to `released`. Publisher-only, one-way.
///
/// The transition is a compare-and-set on the single title row, so
/// concurrent calls resolve to exactly one winner; every loser re-reads the
/// row and reports the state it lost to.
///
/// # Errors
///
/// Returns [`EngineError::AlreadyReleased`] when the title has already been
/// promoted, [`EngineError::TitleNotInTesting`] when it never reached
/// testing, and ownership/lookup failures as usual.
pub fn promote(
    conn: &Connection,
    outbound: &mut dyn Outbound,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<TitleRecord, EngineError> {
    let publisher = caller.as_publisher()?;
    let title = require_owned(conn, title_id.as_str(), publisher)?;
    let now = now_us();

    let changed = conn.execute(
        "UPDATE titles
         SET release_state = 'released', released_at_us = ?2
         WHERE title_id = ?1 AND release_state = 'testing'",
        params![title_id.as_str(), now],
    )?;

    if changed == 0 {
        let current = require(conn, title_id.as_str())?;
        return Err(match current.release_state {
            ReleaseState::Released => EngineError::AlreadyReleased {
                title_id: title_id.as_str().to_string(),
            },
            state => EngineError::TitleNotInTesting {
                title_id: title_id.as_str().to_string(),
                state,
            },
        });
    }

    tracing::info!(title_id = %title_id, "title promoted to released");
    emit_notification(
        outbound,
        &Notification::TitleReleased {
            title_id: title_id.as_str().to_string(),
        },
    );

    Ok(TitleRecord {
        release_state: ReleaseState::Released,
        released_at_us: Some(now),
        ..title
    })
}

/// Aggregate testing statistics for the publisher's dashboard.
///
/// # Errors
///
/// Returns ownership/lookup failures, or a storage error if the aggregate
/// query fails.
pub fn testing_summary(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<TestingSummary, EngineError> {
    let publisher = caller.as_publisher()?;
    let title = require_owned(conn, title_id.as_str(), publisher)?;

    let summary = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM enrollments WHERE title_id = ?1 AND is_active = 1),
            (SELECT COUNT(*) FROM enrollments WHERE title_id = ?1),
            (SELECT COUNT(*) FROM tasks WHERE title_id = ?1),
            (SELECT COUNT(*)
               FROM task_completions tc
               JOIN tasks t ON t.task_id = tc.task_id
              WHERE t.title_id = ?1),
            (SELECT COUNT(*) FROM feedback WHERE title_id = ?1),
            (SELECT COUNT(*)
               FROM feedback
              WHERE title_id = ?1
                AND kind = 'bug'
                AND status IN ('new', 'in_progress')),
            (SELECT COALESCE(SUM(time_spent_seconds), 0) FROM enrollments WHERE title_id = ?1)",
        params![title_id.as_str()],
        |row| {
            Ok(TestingSummary {
                title: title.clone(),
                active_testers: to_count(row.get(0)?),
                total_enrollments: to_count(row.get(1)?),
                tasks: to_count(row.get(2)?),
                completions: to_count(row.get(3)?),
                feedback_items: to_count(row.get(4)?),
                open_bugs: to_count(row.get(5)?),
                time_spent_seconds: row.get(6)?,
            })
        },
    )?;

    Ok(summary)
}
