//! Counter audit for the denormalized enrollment statistics.
//!
//! `tasks_completed` and `bugs_reported` are maintained transactionally, so
//! they should always match the completion and feedback tables. This module
//! recomputes them from the underlying rows and reports (or repairs) any
//! drift, covering stores touched by older builds or edited by hand.

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::error::EngineError;
use crate::model::{Caller, TitleId};
use crate::titles;

/// One enrollment counter that disagrees with the rows it summarizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterDrift {
    pub tester_id: String,
    pub title_id: String,
    /// Which counter drifted: `tasks_completed` or `bugs_reported`.
    pub field: &'static str,
    pub stored: u64,
    pub actual: u64,
}

const DRIFT_SCAN_SQL: &str = "SELECT e.tester_id,
            e.tasks_completed,
            (SELECT COUNT(*) FROM task_completions tc
             JOIN tasks t ON t.task_id = tc.task_id
             WHERE tc.tester_id = e.tester_id AND t.title_id = e.title_id),
            e.bugs_reported,
            (SELECT COUNT(*) FROM feedback f
             WHERE f.tester_id = e.tester_id
               AND f.title_id = e.title_id
               AND f.kind = 'bug')
     FROM enrollments e
     WHERE e.title_id = ?1
     ORDER BY e.tester_id";

fn scan(conn: &Connection, title_id: &str) -> Result<Vec<CounterDrift>, EngineError> {
    let mut stmt = conn.prepare(DRIFT_SCAN_SQL)?;
    let rows = stmt.query_map(params![title_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, u64>(1)?,
            row.get::<_, u64>(2)?,
            row.get::<_, u64>(3)?,
            row.get::<_, u64>(4)?,
        ))
    })?;

    let mut drifts = Vec::new();
    for row in rows {
        let (tester_id, tasks_stored, tasks_actual, bugs_stored, bugs_actual) = row?;
        if tasks_stored != tasks_actual {
            drifts.push(CounterDrift {
                tester_id: tester_id.clone(),
                title_id: title_id.to_string(),
                field: "tasks_completed",
                stored: tasks_stored,
                actual: tasks_actual,
            });
        }
        if bugs_stored != bugs_actual {
            drifts.push(CounterDrift {
                tester_id,
                title_id: title_id.to_string(),
                field: "bugs_reported",
                stored: bugs_stored,
                actual: bugs_actual,
            });
        }
    }
    Ok(drifts)
}

/// Recompute a title's enrollment counters and report any drift. Read-only.
/// Publisher-only.
///
/// # Errors
///
/// Returns ownership/lookup failures, or a storage error.
pub fn verify_counters(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<Vec<CounterDrift>, EngineError> {
    let publisher = caller.as_publisher()?;
    titles::require_owned(conn, title_id.as_str(), publisher)?;

    let drifts = scan(conn, title_id.as_str())?;
    for drift in &drifts {
        tracing::warn!(
            tester_id = %drift.tester_id,
            title_id = %drift.title_id,
            field = drift.field,
            stored = drift.stored,
            actual = drift.actual,
            "enrollment counter drift"
        );
    }
    Ok(drifts)
}

/// Rewrite drifted counters from the underlying rows, in one transaction.
/// Publisher-only. Returns the drifts that were repaired.
///
/// # Errors
///
/// Returns ownership/lookup failures, or a storage error.
pub fn repair_counters(
    conn: &mut Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<Vec<CounterDrift>, EngineError> {
    let publisher = caller.as_publisher()?;
    titles::require_owned(conn, title_id.as_str(), publisher)?;

    let tx = conn.transaction()?;
    let drifts = scan(&tx, title_id.as_str())?;
    if drifts.is_empty() {
        return Ok(drifts);
    }

    tx.execute(
        "UPDATE enrollments
         SET tasks_completed = (SELECT COUNT(*) FROM task_completions tc
                                JOIN tasks t ON t.task_id = tc.task_id
                                WHERE tc.tester_id = enrollments.tester_id
                                  AND t.title_id = enrollments.title_id),
             bugs_reported = (SELECT COUNT(*) FROM feedback f
                              WHERE f.tester_id = enrollments.tester_id
                                AND f.title_id = enrollments.title_id
                                AND f.kind = 'bug')
         WHERE title_id = ?1",
        params![title_id.as_str()],
    )?;
    tx.commit()?;

    tracing::info!(
        title_id = %title_id,
        repaired = drifts.len(),
        "enrollment counters repaired"
    );
    Ok(drifts)
}
