//! Enrollment registry: who is testing what, with lifetime counters.
//!
//! An enrollment row is never deleted. Leaving a program flips `is_active`
//! off and keeps the counters; rejoining flips it back on through a
//! conditional upsert, so two concurrent joins for the same pair resolve to
//! one winner and the loser observes `AlreadyEnrolled`. Counters are
//! lifetime totals across enrollment spells.

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::agreement;
use crate::error::EngineError;
use crate::model::{Caller, TesterId, TitleId};
use crate::outbound::{Notification, Outbound, emit_notification};
use crate::store::now_us;
use crate::titles;

/// A tester's membership in one title's program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrollment {
    pub tester_id: String,
    pub title_id: String,
    /// Time of the most recent join, not the first.
    pub joined_at_us: i64,
    pub is_active: bool,
    pub bugs_reported: u64,
    pub tasks_completed: u64,
    pub time_spent_seconds: u64,
}

const ENROLLMENT_COLUMNS: &str = "tester_id, title_id, joined_at_us, is_active, \
                                  bugs_reported, tasks_completed, time_spent_seconds";

fn row_to_enrollment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        tester_id: row.get(0)?,
        title_id: row.get(1)?,
        joined_at_us: row.get(2)?,
        is_active: row.get::<_, i64>(3)? != 0,
        bugs_reported: row.get(4)?,
        tasks_completed: row.get(5)?,
        time_spent_seconds: row.get(6)?,
    })
}

fn fetch(
    conn: &Connection,
    tester_id: &str,
    title_id: &str,
) -> Result<Option<Enrollment>, EngineError> {
    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE tester_id = ?1 AND title_id = ?2"
    );
    match conn.query_row(&sql, params![tester_id, title_id], row_to_enrollment) {
        Ok(enrollment) => Ok(Some(enrollment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// The active enrollment gate shared by task completion and feedback intake.
pub(crate) fn require_active(
    conn: &Connection,
    tester_id: &str,
    title_id: &str,
) -> Result<Enrollment, EngineError> {
    match fetch(conn, tester_id, title_id)? {
        Some(enrollment) if enrollment.is_active => Ok(enrollment),
        _ => Err(EngineError::NotEnrolled {
            tester_id: tester_id.to_string(),
            title_id: title_id.to_string(),
        }),
    }
}

/// Look up an enrollment for a pair, active or not.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub fn get(
    conn: &Connection,
    tester_id: &TesterId,
    title_id: &TitleId,
) -> Result<Option<Enrollment>, EngineError> {
    fetch(conn, tester_id.as_str(), title_id.as_str())
}

/// Enroll the calling tester in a title's testing program.
///
/// Preconditions, checked in order: the title is in `testing`, the
/// agreement ledger has a record for the pair, and no active enrollment
/// exists. A rejoin after deactivation reuses the original row, so lifetime
/// counters carry over; `joined_at_us` moves to the new join.
///
/// # Errors
///
/// Returns [`EngineError::TitleNotInTesting`], [`EngineError::AgreementRequired`],
/// or [`EngineError::AlreadyEnrolled`] when a precondition fails.
pub fn join(
    conn: &mut Connection,
    outbound: &mut dyn Outbound,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<Enrollment, EngineError> {
    let tester = caller.as_tester()?;
    let tx = conn.transaction()?;

    let title = titles::require(&tx, title_id.as_str())?;
    if !title.release_state.accepts_testers() {
        return Err(EngineError::TitleNotInTesting {
            title_id: title_id.as_str().to_string(),
            state: title.release_state,
        });
    }
    if !agreement::is_accepted(&tx, tester.as_str(), title_id.as_str())? {
        return Err(EngineError::AgreementRequired {
            tester_id: tester.as_str().to_string(),
            title_id: title_id.as_str().to_string(),
        });
    }

    let changed = tx.execute(
        "INSERT INTO enrollments (tester_id, title_id, joined_at_us, is_active)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT (tester_id, title_id) DO UPDATE
             SET is_active = 1, joined_at_us = excluded.joined_at_us
             WHERE enrollments.is_active = 0",
        params![tester.as_str(), title_id.as_str(), now_us()],
    )?;
    if changed == 0 {
        return Err(EngineError::AlreadyEnrolled {
            tester_id: tester.as_str().to_string(),
            title_id: title_id.as_str().to_string(),
        });
    }

    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE tester_id = ?1 AND title_id = ?2"
    );
    let enrollment = tx.query_row(
        &sql,
        params![tester.as_str(), title_id.as_str()],
        row_to_enrollment,
    )?;
    tx.commit()?;

    tracing::info!(tester_id = %tester, title_id = %title_id, "tester joined");
    emit_notification(
        outbound,
        &Notification::TesterJoined {
            tester_id: tester.as_str().to_string(),
            title_id: title_id.as_str().to_string(),
        },
    );

    Ok(enrollment)
}

/// Soft-deactivate an enrollment, keeping its history and counters.
///
/// Testers may deactivate themselves; the owning publisher may deactivate
/// any tester. Deactivating an already-inactive enrollment is a no-op
/// success.
///
/// # Errors
///
/// Returns [`EngineError::NotEnrolled`] when the pair never enrolled, or
/// [`EngineError::Forbidden`] for anyone else's enrollment.
pub fn deactivate(
    conn: &Connection,
    caller: &Caller,
    tester_id: &TesterId,
    title_id: &TitleId,
) -> Result<(), EngineError> {
    match caller {
        Caller::Tester(own_id) if own_id == tester_id => {}
        Caller::Tester(_) => {
            return Err(EngineError::Forbidden {
                action: "deactivate another tester",
            });
        }
        Caller::Publisher(publisher) => {
            titles::require_owned(conn, title_id.as_str(), publisher)?;
        }
    }

    let enrollment = fetch(conn, tester_id.as_str(), title_id.as_str())?.ok_or_else(|| {
        EngineError::NotEnrolled {
            tester_id: tester_id.as_str().to_string(),
            title_id: title_id.as_str().to_string(),
        }
    })?;
    if !enrollment.is_active {
        return Ok(());
    }

    conn.execute(
        "UPDATE enrollments SET is_active = 0 WHERE tester_id = ?1 AND title_id = ?2",
        params![tester_id.as_str(), title_id.as_str()],
    )?;

    tracing::info!(
        tester_id = %tester_id,
        title_id = %title_id,
        removed_by = %caller,
        "enrollment deactivated"
    );
    Ok(())
}

/// Add play time to the calling tester's active enrollment.
///
/// Time only accumulates; there is no reset. Zero is accepted and leaves
/// the counter unchanged, but still requires an active enrollment.
///
/// # Errors
///
/// Returns [`EngineError::NotEnrolled`] when the caller has no active
/// enrollment for the title.
pub fn record_session_time(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
    seconds: u32,
) -> Result<Enrollment, EngineError> {
    let tester = caller.as_tester()?;

    let changed = conn.execute(
        "UPDATE enrollments
         SET time_spent_seconds = time_spent_seconds + ?3
         WHERE tester_id = ?1 AND title_id = ?2 AND is_active = 1",
        params![tester.as_str(), title_id.as_str(), seconds],
    )?;
    if changed == 0 {
        return Err(EngineError::NotEnrolled {
            tester_id: tester.as_str().to_string(),
            title_id: title_id.as_str().to_string(),
        });
    }

    tracing::debug!(tester_id = %tester, title_id = %title_id, seconds, "session time recorded");
    require_active(conn, tester.as_str(), title_id.as_str())
}

/// Every enrollment for a title, newest join first. Publisher-only.
///
/// # Errors
///
/// Returns ownership/lookup failures, or a storage error.
pub fn roster(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<Vec<Enrollment>, EngineError> {
    let publisher = caller.as_publisher()?;
    titles::require_owned(conn, title_id.as_str(), publisher)?;

    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS}
         FROM enrollments
         WHERE title_id = ?1
         ORDER BY joined_at_us DESC, tester_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![title_id.as_str()], row_to_enrollment)?;

    let mut enrollments = Vec::new();
    for row in rows {
        enrollments.push(row?);
    }
    Ok(enrollments)
}

/// The calling tester's enrollments across all titles, newest join first.
///
/// # Errors
///
/// Returns [`EngineError::Forbidden`] for non-tester callers, or a storage
/// error.
pub fn list_for_tester(conn: &Connection, caller: &Caller) -> Result<Vec<Enrollment>, EngineError> {
    let tester = caller.as_tester()?;

    let sql = format!(
        "SELECT {ENROLLMENT_COLUMNS}
         FROM enrollments
         WHERE tester_id = ?1
         ORDER BY joined_at_us DESC, title_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![tester.as_str()], row_to_enrollment)?;

    let mut enrollments = Vec::new();
    for row in rows {
        enrollments.push(row?);
    }
    Ok(enrollments)
}
