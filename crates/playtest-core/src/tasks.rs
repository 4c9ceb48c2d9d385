//! Task catalog and completion tracking.
//!
//! The (task, tester) completion row is the idempotency boundary for the
//! whole engine: inserting it, bumping the enrollment counter, and deciding
//! whether a reward exists happen in one transaction, and the reward is
//! emitted at most once per pair no matter how often completion is retried.
//!
//! Deleting a task destroys its completion history. The cascade is explicit:
//! the enrollment counters are walked back and the completion rows removed
//! in the same transaction as the task row, never via a silent FK cascade.

use rusqlite::{Connection, params};
use serde::Serialize;

use crate::enrollment;
use crate::error::EngineError;
use crate::model::{Caller, TaskId, TaskSpec, TitleId};
use crate::outbound::{Notification, Outbound, RewardEvent, emit_notification, emit_reward};
use crate::store::{now_us, parse_enum_column, to_count};
use crate::titles;

/// A catalog entry as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub task_id: String,
    pub title_id: String,
    pub name: String,
    pub description: String,
    pub kind: crate::model::TaskKind,
    pub xp_reward: u32,
    pub points_reward: u32,
    pub is_optional: bool,
    pub display_order: i64,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Publisher progress view: one task plus how far the cohort got.
///
/// `active_tester_count` is the denominator for every row (current active
/// enrollment count of the title); `completion_count` is per task. Both are
/// computed from the source tables at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub task: Task,
    pub completion_count: usize,
    pub active_tester_count: usize,
}

/// Tester catalog view: one task plus the caller's own completion, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TesterTask {
    pub task: Task,
    pub completed_at_us: Option<i64>,
}

/// What [`complete_task`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    /// `true` when the pair had already completed and nothing changed.
    pub already_completed: bool,
    /// The reward emitted by this call; `None` on the repeat path.
    pub reward: Option<RewardEvent>,
}

/// What [`delete_task`] removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDeletion {
    pub task_id: String,
    pub completions_removed: usize,
}

const TASK_COLUMNS: &str = "tasks.task_id, title_id, name, description, kind, xp_reward, \
                            points_reward, is_optional, display_order, created_at_us, \
                            updated_at_us";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        task_id: row.get(0)?,
        title_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        kind: parse_enum_column(row, 4)?,
        xp_reward: row.get(5)?,
        points_reward: row.get(6)?,
        is_optional: row.get::<_, i64>(7)? != 0,
        display_order: row.get(8)?,
        created_at_us: row.get(9)?,
        updated_at_us: row.get(10)?,
    })
}

fn fetch(conn: &Connection, task_id: &str) -> Result<Option<Task>, EngineError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1");
    match conn.query_row(&sql, params![task_id], row_to_task) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

pub(crate) fn require_task(conn: &Connection, task_id: &str) -> Result<Task, EngineError> {
    fetch(conn, task_id)?.ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))
}

/// Look up a task by id.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub fn get(conn: &Connection, task_id: &TaskId) -> Result<Option<Task>, EngineError> {
    fetch(conn, task_id.as_str())
}

/// Add a task to a title's catalog. Publisher-only.
///
/// # Errors
///
/// Returns validation or ownership failures before anything is written.
pub fn create_task(
    conn: &Connection,
    outbound: &mut dyn Outbound,
    caller: &Caller,
    title_id: &TitleId,
    spec: TaskSpec,
) -> Result<Task, EngineError> {
    let publisher = caller.as_publisher()?;
    titles::require_owned(conn, title_id.as_str(), publisher)?;
    let spec = spec.validated()?;

    let task_id = TaskId::generate();
    let now = now_us();
    conn.execute(
        "INSERT INTO tasks (
            task_id, title_id, name, description, kind, xp_reward, points_reward,
            is_optional, display_order, created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            task_id.as_str(),
            title_id.as_str(),
            spec.name,
            spec.description,
            spec.kind.as_str(),
            spec.xp_reward,
            spec.points_reward,
            spec.is_optional,
            spec.display_order,
            now,
        ],
    )?;

    tracing::info!(task_id = %task_id, title_id = %title_id, "task created");
    emit_notification(
        outbound,
        &Notification::TaskCreated {
            title_id: title_id.as_str().to_string(),
            task_id: task_id.as_str().to_string(),
            name: spec.name.clone(),
        },
    );

    Ok(Task {
        task_id: task_id.as_str().to_string(),
        title_id: title_id.as_str().to_string(),
        name: spec.name,
        description: spec.description,
        kind: spec.kind,
        xp_reward: spec.xp_reward,
        points_reward: spec.points_reward,
        is_optional: spec.is_optional,
        display_order: spec.display_order,
        created_at_us: now,
        updated_at_us: now,
    })
}

/// Replace a task's publisher-editable fields. Publisher-only.
///
/// Completions are untouched; a reworded task keeps its history.
///
/// # Errors
///
/// Returns [`EngineError::TaskNotFound`], ownership failures, or validation
/// failures.
pub fn update_task(
    conn: &Connection,
    caller: &Caller,
    task_id: &TaskId,
    spec: TaskSpec,
) -> Result<Task, EngineError> {
    let publisher = caller.as_publisher()?;
    let task = require_task(conn, task_id.as_str())?;
    titles::require_owned(conn, &task.title_id, publisher)?;
    let spec = spec.validated()?;

    let now = now_us();
    conn.execute(
        "UPDATE tasks
         SET name = ?2, description = ?3, kind = ?4, xp_reward = ?5, points_reward = ?6,
             is_optional = ?7, display_order = ?8, updated_at_us = ?9
         WHERE task_id = ?1",
        params![
            task_id.as_str(),
            spec.name,
            spec.description,
            spec.kind.as_str(),
            spec.xp_reward,
            spec.points_reward,
            spec.is_optional,
            spec.display_order,
            now,
        ],
    )?;

    tracing::info!(task_id = %task_id, "task updated");
    Ok(Task {
        name: spec.name,
        description: spec.description,
        kind: spec.kind,
        xp_reward: spec.xp_reward,
        points_reward: spec.points_reward,
        is_optional: spec.is_optional,
        display_order: spec.display_order,
        updated_at_us: now,
        ..task
    })
}

/// Delete a task and its completion history. Publisher-only.
///
/// Callers are expected to confirm first: completion history is lost. The
/// affected testers' `tasks_completed` counters are walked back so they stay
/// consistent with the remaining completion rows.
///
/// # Errors
///
/// Returns [`EngineError::TaskNotFound`] or ownership failures before
/// anything is deleted.
pub fn delete_task(
    conn: &mut Connection,
    caller: &Caller,
    task_id: &TaskId,
) -> Result<TaskDeletion, EngineError> {
    let publisher = caller.as_publisher()?;
    let task = require_task(conn, task_id.as_str())?;
    titles::require_owned(conn, &task.title_id, publisher)?;

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE enrollments
         SET tasks_completed = MAX(tasks_completed - 1, 0)
         WHERE title_id = ?1
           AND tester_id IN (SELECT tester_id FROM task_completions WHERE task_id = ?2)",
        params![task.title_id, task_id.as_str()],
    )?;
    let completions_removed = tx.execute(
        "DELETE FROM task_completions WHERE task_id = ?1",
        params![task_id.as_str()],
    )?;
    tx.execute("DELETE FROM tasks WHERE task_id = ?1", params![task_id.as_str()])?;
    tx.commit()?;

    tracing::info!(
        task_id = %task_id,
        title_id = %task.title_id,
        completions_removed,
        "task deleted with its completion history"
    );

    Ok(TaskDeletion {
        task_id: task_id.as_str().to_string(),
        completions_removed,
    })
}

/// The publisher's progress view over a title's catalog.
///
/// # Errors
///
/// Returns ownership/lookup failures, or a storage error.
pub fn list_with_progress(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<Vec<TaskProgress>, EngineError> {
    let publisher = caller.as_publisher()?;
    titles::require_owned(conn, title_id.as_str(), publisher)?;

    let active_tester_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM enrollments WHERE title_id = ?1 AND is_active = 1",
        params![title_id.as_str()],
        |row| row.get(0),
    )?;
    let active_tester_count = to_count(active_tester_count);

    let sql = format!(
        "SELECT {TASK_COLUMNS},
                (SELECT COUNT(*) FROM task_completions c WHERE c.task_id = tasks.task_id)
         FROM tasks
         WHERE title_id = ?1
         ORDER BY display_order, created_at_us"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![title_id.as_str()], |row| {
        let task = row_to_task(row)?;
        let completion_count: i64 = row.get(11)?;
        Ok((task, completion_count))
    })?;

    let mut progress = Vec::new();
    for row in rows {
        let (task, completion_count) = row?;
        progress.push(TaskProgress {
            task,
            completion_count: to_count(completion_count),
            active_tester_count,
        });
    }
    Ok(progress)
}

/// The catalog as the calling tester sees it, own completions included.
/// Requires an active enrollment.
///
/// # Errors
///
/// Returns [`EngineError::NotEnrolled`] when the caller is not actively
/// enrolled in the title.
pub fn list_for_tester(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<Vec<TesterTask>, EngineError> {
    let tester = caller.as_tester()?;
    enrollment::require_active(conn, tester.as_str(), title_id.as_str())?;

    let sql = format!(
        "SELECT {TASK_COLUMNS}, c.completed_at_us
         FROM tasks
         LEFT JOIN task_completions c
           ON c.task_id = tasks.task_id AND c.tester_id = ?2
         WHERE title_id = ?1
         ORDER BY display_order, created_at_us"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![title_id.as_str(), tester.as_str()], |row| {
        Ok(TesterTask {
            task: row_to_task(row)?,
            completed_at_us: row.get(11)?,
        })
    })?;

    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(row?);
    }
    Ok(tasks)
}

/// Mark a task complete for the calling tester and emit the reward.
///
/// The completion row, the `tasks_completed` bump, and the commit are one
/// atomic unit. A repeat call finds the existing row and returns
/// `already_completed = true` without touching the counter or re-emitting
/// the reward. Reward delivery failure is logged and dropped; the returned
/// outcome still carries the event, because the completion it pays for has
/// committed.
///
/// # Errors
///
/// Returns [`EngineError::TaskNotFound`] or [`EngineError::NotEnrolled`]
/// when the preconditions fail.
pub fn complete_task(
    conn: &mut Connection,
    outbound: &mut dyn Outbound,
    caller: &Caller,
    task_id: &TaskId,
) -> Result<CompletionOutcome, EngineError> {
    let tester = caller.as_tester()?;
    let tx = conn.transaction()?;

    let task = require_task(&tx, task_id.as_str())?;
    enrollment::require_active(&tx, tester.as_str(), &task.title_id)?;

    let inserted = tx.execute(
        "INSERT OR IGNORE INTO task_completions (task_id, tester_id, completed_at_us)
         VALUES (?1, ?2, ?3)",
        params![task_id.as_str(), tester.as_str(), now_us()],
    )?;
    if inserted == 0 {
        tx.commit()?;
        tracing::debug!(
            task_id = %task_id,
            tester_id = %tester,
            "task already completed, nothing to do"
        );
        return Ok(CompletionOutcome {
            already_completed: true,
            reward: None,
        });
    }

    tx.execute(
        "UPDATE enrollments
         SET tasks_completed = tasks_completed + 1
         WHERE tester_id = ?1 AND title_id = ?2",
        params![tester.as_str(), task.title_id],
    )?;
    tx.commit()?;

    let reward = RewardEvent {
        tester_id: tester.as_str().to_string(),
        title_id: task.title_id.clone(),
        task_id: task_id.as_str().to_string(),
        xp: task.xp_reward,
        points: task.points_reward,
    };
    tracing::info!(
        task_id = %task_id,
        tester_id = %tester,
        xp = reward.xp,
        points = reward.points,
        "task completed"
    );
    emit_reward(outbound, &reward);

    Ok(CompletionOutcome {
        already_completed: false,
        reward: Some(reward),
    })
}
