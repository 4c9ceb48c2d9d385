//! Feedback intake and publisher triage.
//!
//! Testers with an active enrollment submit items; every item starts in
//! `new`. Publishers move items between statuses in any order, including
//! reopening closed items. Kind and content are immutable after creation.

use std::collections::HashMap;

use rusqlite::{Connection, params, params_from_iter};
use serde::Serialize;

use crate::enrollment;
use crate::error::EngineError;
use crate::model::{Caller, FeedbackDraft, FeedbackId, FeedbackKind, FeedbackStatus, TitleId};
use crate::outbound::{Notification, Outbound, emit_notification};
use crate::store::{now_us, parse_enum_column, to_count};
use crate::titles;

/// A stored feedback item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackItem {
    pub feedback_id: String,
    pub title_id: String,
    pub tester_id: String,
    pub kind: FeedbackKind,
    pub summary: String,
    pub description: String,
    pub severity: Option<crate::model::Severity>,
    pub status: FeedbackStatus,
    pub attachment_ref: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Filter criteria for [`list_by_title`].
#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    /// Keep only this kind.
    pub kind: Option<FeedbackKind>,
    /// Keep only this status.
    pub status: Option<FeedbackStatus>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

/// Dashboard counts for one title's feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackSummary {
    pub total: usize,
    pub by_kind: HashMap<String, usize>,
    pub by_status: HashMap<String, usize>,
}

const FEEDBACK_COLUMNS: &str = "feedback_id, title_id, tester_id, kind, summary, description, \
                                severity, status, attachment_ref, created_at_us, updated_at_us";

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedbackItem> {
    let severity: Option<String> = row.get(6)?;
    let severity = match severity {
        Some(_) => Some(parse_enum_column(row, 6)?),
        None => None,
    };
    Ok(FeedbackItem {
        feedback_id: row.get(0)?,
        title_id: row.get(1)?,
        tester_id: row.get(2)?,
        kind: parse_enum_column(row, 3)?,
        summary: row.get(4)?,
        description: row.get(5)?,
        severity,
        status: parse_enum_column(row, 7)?,
        attachment_ref: row.get(8)?,
        created_at_us: row.get(9)?,
        updated_at_us: row.get(10)?,
    })
}

fn fetch(conn: &Connection, feedback_id: &str) -> Result<Option<FeedbackItem>, EngineError> {
    let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE feedback_id = ?1");
    match conn.query_row(&sql, params![feedback_id], row_to_item) {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Look up a feedback item by id.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub fn get(conn: &Connection, feedback_id: &FeedbackId) -> Result<Option<FeedbackItem>, EngineError> {
    fetch(conn, feedback_id.as_str())
}

/// Submit a feedback item for a title the caller actively tests.
///
/// Bugs bump the enrollment's `bugs_reported` counter in the same
/// transaction as the insert, so the counter and the rows can never drift
/// apart on this path.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] for a malformed draft and
/// [`EngineError::NotEnrolled`] without an active enrollment.
pub fn submit(
    conn: &mut Connection,
    caller: &Caller,
    title_id: &TitleId,
    draft: FeedbackDraft,
) -> Result<FeedbackItem, EngineError> {
    let tester = caller.as_tester()?;
    let draft = draft.validated()?;

    let tx = conn.transaction()?;
    enrollment::require_active(&tx, tester.as_str(), title_id.as_str())?;

    let feedback_id = FeedbackId::generate();
    let now = now_us();
    tx.execute(
        "INSERT INTO feedback (
            feedback_id, title_id, tester_id, kind, summary, description,
            severity, status, attachment_ref, created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'new', ?8, ?9, ?9)",
        params![
            feedback_id.as_str(),
            title_id.as_str(),
            tester.as_str(),
            draft.kind.as_str(),
            draft.summary,
            draft.description,
            draft.severity.map(crate::model::Severity::as_str),
            draft.attachment_ref,
            now,
        ],
    )?;

    if draft.kind == FeedbackKind::Bug {
        tx.execute(
            "UPDATE enrollments
             SET bugs_reported = bugs_reported + 1
             WHERE tester_id = ?1 AND title_id = ?2",
            params![tester.as_str(), title_id.as_str()],
        )?;
    }
    tx.commit()?;

    tracing::info!(
        feedback_id = %feedback_id,
        title_id = %title_id,
        tester_id = %tester,
        kind = %draft.kind,
        "feedback submitted"
    );

    Ok(FeedbackItem {
        feedback_id: feedback_id.as_str().to_string(),
        title_id: title_id.as_str().to_string(),
        tester_id: tester.as_str().to_string(),
        kind: draft.kind,
        summary: draft.summary,
        description: draft.description,
        severity: draft.severity,
        status: FeedbackStatus::New,
        attachment_ref: draft.attachment_ref,
        created_at_us: now,
        updated_at_us: now,
    })
}

/// Move a feedback item to a new triage status. Publisher-only.
///
/// Any status can reach any other, reopening included. Setting the status
/// an item already has is a no-op success and does not notify.
///
/// # Errors
///
/// Returns [`EngineError::FeedbackNotFound`] or ownership failures.
pub fn set_status(
    conn: &Connection,
    outbound: &mut dyn Outbound,
    caller: &Caller,
    feedback_id: &FeedbackId,
    new_status: FeedbackStatus,
) -> Result<FeedbackItem, EngineError> {
    let publisher = caller.as_publisher()?;
    let item = fetch(conn, feedback_id.as_str())?
        .ok_or_else(|| EngineError::FeedbackNotFound(feedback_id.as_str().to_string()))?;
    titles::require_owned(conn, &item.title_id, publisher)?;

    if item.status == new_status {
        return Ok(item);
    }

    let now = now_us();
    conn.execute(
        "UPDATE feedback SET status = ?2, updated_at_us = ?3 WHERE feedback_id = ?1",
        params![feedback_id.as_str(), new_status.as_str(), now],
    )?;

    tracing::info!(
        feedback_id = %feedback_id,
        from = %item.status,
        to = %new_status,
        "feedback status changed"
    );
    emit_notification(
        outbound,
        &Notification::FeedbackStatusChanged {
            feedback_id: feedback_id.as_str().to_string(),
            title_id: item.title_id.clone(),
            tester_id: item.tester_id.clone(),
            status: new_status,
        },
    );

    Ok(FeedbackItem {
        status: new_status,
        updated_at_us: now,
        ..item
    })
}

/// List a title's feedback for triage, newest first. Publisher-only.
///
/// # Errors
///
/// Returns ownership/lookup failures, or a storage error.
pub fn list_by_title(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
    filter: &FeedbackFilter,
) -> Result<Vec<FeedbackItem>, EngineError> {
    let publisher = caller.as_publisher()?;
    titles::require_owned(conn, title_id.as_str(), publisher)?;

    let mut conditions: Vec<String> = vec!["title_id = ?1".to_string()];
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(title_id.as_str().to_string())];

    if let Some(kind) = filter.kind {
        param_values.push(Box::new(kind.as_str()));
        conditions.push(format!("kind = ?{}", param_values.len()));
    }

    if let Some(status) = filter.status {
        param_values.push(Box::new(status.as_str()));
        conditions.push(format!("status = ?{}", param_values.len()));
    }

    let limit_clause = match (filter.limit, filter.offset) {
        (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
        (Some(limit), None) => format!(" LIMIT {limit}"),
        (None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
        (None, None) => String::new(),
    };

    let sql = format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE {} \
         ORDER BY created_at_us DESC, feedback_id{limit_clause}",
        conditions.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();
    let rows = stmt.query_map(params_from_iter(params_ref), row_to_item)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

/// Counts per kind and per status for the publisher dashboard.
///
/// # Errors
///
/// Returns ownership/lookup failures, or a storage error.
pub fn summary_by_title(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
) -> Result<FeedbackSummary, EngineError> {
    let publisher = caller.as_publisher()?;
    titles::require_owned(conn, title_id.as_str(), publisher)?;

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM feedback WHERE title_id = ?1",
        params![title_id.as_str()],
        |row| row.get(0),
    )?;

    Ok(FeedbackSummary {
        total: to_count(total),
        by_kind: count_grouped(conn, title_id.as_str(), "kind")?,
        by_status: count_grouped(conn, title_id.as_str(), "status")?,
    })
}

fn count_grouped(
    conn: &Connection,
    title_id: &str,
    column: &str,
) -> Result<HashMap<String, usize>, EngineError> {
    let sql =
        format!("SELECT {column}, COUNT(*) FROM feedback WHERE title_id = ?1 GROUP BY {column}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![title_id], |row| {
        let key: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        Ok((key, to_count(count)))
    })?;

    let mut counts = HashMap::new();
    for row in rows {
        let (key, count) = row?;
        counts.insert(key, count);
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreement::{self, AcceptanceEvidence};
    use crate::model::{PublisherId, Severity, TesterId};
    use crate::outbound::{NullOutbound, RecordingOutbound};
    use crate::store::migrations;

    fn test_db() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("enable foreign keys");
        migrations::migrate(&mut conn).expect("migrate");
        conn
    }

    fn acme() -> Caller {
        Caller::Publisher(PublisherId::new("acme").unwrap())
    }

    fn with_title(conn: &Connection) -> TitleId {
        let title_id = TitleId::new("vale").unwrap();
        titles::register(conn, &acme(), &title_id).unwrap();
        title_id
    }

    fn enroll(conn: &mut Connection, name: &str, title_id: &TitleId) -> Caller {
        let caller = Caller::Tester(TesterId::new(name).unwrap());
        agreement::record_acceptance(
            conn,
            &caller,
            title_id,
            &AcceptanceEvidence {
                recorded_at_us: 1,
                origin: "launcher".to_string(),
            },
        )
        .unwrap();
        enrollment::join(conn, &mut NullOutbound, &caller, title_id).unwrap();
        caller
    }

    fn bug_draft(summary: &str) -> FeedbackDraft {
        FeedbackDraft {
            kind: FeedbackKind::Bug,
            summary: summary.to_string(),
            description: "Steps to reproduce".to_string(),
            severity: Some(Severity::High),
            attachment_ref: None,
        }
    }

    fn general_draft(summary: &str) -> FeedbackDraft {
        FeedbackDraft {
            kind: FeedbackKind::General,
            summary: summary.to_string(),
            description: "Impressions".to_string(),
            severity: None,
            attachment_ref: None,
        }
    }

    #[test]
    fn submit_requires_an_active_enrollment() {
        let mut conn = test_db();
        let title_id = with_title(&conn);

        let mallory = Caller::Tester(TesterId::new("mallory").unwrap());
        let err = submit(&mut conn, &mallory, &title_id, bug_draft("Crash")).unwrap_err();
        assert!(matches!(err, EngineError::NotEnrolled { .. }));
    }

    #[test]
    fn bug_submissions_bump_the_counter_in_the_same_transaction() {
        let mut conn = test_db();
        let title_id = with_title(&conn);
        let alice = enroll(&mut conn, "alice", &title_id);

        let item = submit(&mut conn, &alice, &title_id, bug_draft("Crash on save")).unwrap();
        assert_eq!(item.status, FeedbackStatus::New);
        assert!(item.feedback_id.starts_with("fb-"));

        submit(&mut conn, &alice, &title_id, general_draft("Love the art")).unwrap();

        let enrollment = enrollment::get(
            &conn,
            &TesterId::new("alice").unwrap(),
            &title_id,
        )
        .unwrap()
        .unwrap();
        assert_eq!(enrollment.bugs_reported, 1);
    }

    #[test]
    fn drafts_are_validated_before_any_lookup() {
        let mut conn = test_db();
        let title_id = with_title(&conn);
        let alice = enroll(&mut conn, "alice", &title_id);

        let mut draft = bug_draft("Crash");
        draft.severity = None;
        let err = submit(&mut conn, &alice, &title_id, draft).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let mut draft = general_draft("Thoughts");
        draft.severity = Some(Severity::Low);
        let err = submit(&mut conn, &alice, &title_id, draft).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn set_status_reaches_any_status_and_notifies() {
        let mut conn = test_db();
        let title_id = with_title(&conn);
        let alice = enroll(&mut conn, "alice", &title_id);
        let mut sink = RecordingOutbound::new();

        let item = submit(&mut conn, &alice, &title_id, bug_draft("Crash")).unwrap();
        let feedback_id: FeedbackId = item.feedback_id.parse().unwrap();

        let closed =
            set_status(&conn, &mut sink, &acme(), &feedback_id, FeedbackStatus::Closed).unwrap();
        assert_eq!(closed.status, FeedbackStatus::Closed);

        // Reopening is intentional: triage is manual and unordered.
        let reopened =
            set_status(&conn, &mut sink, &acme(), &feedback_id, FeedbackStatus::New).unwrap();
        assert_eq!(reopened.status, FeedbackStatus::New);

        assert_eq!(sink.notifications().len(), 2);
        assert!(matches!(
            &sink.notifications()[1],
            Notification::FeedbackStatusChanged {
                status: FeedbackStatus::New,
                ..
            }
        ));
    }

    #[test]
    fn setting_the_current_status_is_a_silent_no_op() {
        let mut conn = test_db();
        let title_id = with_title(&conn);
        let alice = enroll(&mut conn, "alice", &title_id);
        let mut sink = RecordingOutbound::new();

        let item = submit(&mut conn, &alice, &title_id, bug_draft("Crash")).unwrap();
        let feedback_id: FeedbackId = item.feedback_id.parse().unwrap();

        let unchanged =
            set_status(&conn, &mut sink, &acme(), &feedback_id, FeedbackStatus::New).unwrap();
        assert_eq!(unchanged.updated_at_us, item.updated_at_us);
        assert!(sink.notifications().is_empty());
    }

    #[test]
    fn status_changes_are_publisher_only() {
        let mut conn = test_db();
        let title_id = with_title(&conn);
        let alice = enroll(&mut conn, "alice", &title_id);
        let mut sink = NullOutbound;

        let item = submit(&mut conn, &alice, &title_id, bug_draft("Crash")).unwrap();
        let feedback_id: FeedbackId = item.feedback_id.parse().unwrap();

        let err = set_status(&conn, &mut sink, &alice, &feedback_id, FeedbackStatus::Closed)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));

        let rival = Caller::Publisher(PublisherId::new("rival").unwrap());
        let err = set_status(&conn, &mut sink, &rival, &feedback_id, FeedbackStatus::Closed)
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));
    }

    #[test]
    fn listing_filters_by_kind_and_status() {
        let mut conn = test_db();
        let title_id = with_title(&conn);
        let alice = enroll(&mut conn, "alice", &title_id);
        let mut sink = NullOutbound;

        let bug = submit(&mut conn, &alice, &title_id, bug_draft("Crash")).unwrap();
        submit(&mut conn, &alice, &title_id, general_draft("Notes")).unwrap();
        set_status(
            &conn,
            &mut sink,
            &acme(),
            &bug.feedback_id.parse().unwrap(),
            FeedbackStatus::Resolved,
        )
        .unwrap();

        let bugs = list_by_title(
            &conn,
            &acme(),
            &title_id,
            &FeedbackFilter {
                kind: Some(FeedbackKind::Bug),
                ..FeedbackFilter::default()
            },
        )
        .unwrap();
        assert_eq!(bugs.len(), 1);
        assert_eq!(bugs[0].kind, FeedbackKind::Bug);

        let resolved = list_by_title(
            &conn,
            &acme(),
            &title_id,
            &FeedbackFilter {
                status: Some(FeedbackStatus::Resolved),
                ..FeedbackFilter::default()
            },
        )
        .unwrap();
        assert_eq!(resolved.len(), 1);

        let limited = list_by_title(
            &conn,
            &acme(),
            &title_id,
            &FeedbackFilter {
                limit: Some(1),
                ..FeedbackFilter::default()
            },
        )
        .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn summary_counts_by_kind_and_status() {
        let mut conn = test_db();
        let title_id = with_title(&conn);
        let alice = enroll(&mut conn, "alice", &title_id);
        let mut sink = NullOutbound;

        let bug = submit(&mut conn, &alice, &title_id, bug_draft("Crash")).unwrap();
        submit(&mut conn, &alice, &title_id, bug_draft("Another crash")).unwrap();
        submit(&mut conn, &alice, &title_id, general_draft("Notes")).unwrap();
        set_status(
            &conn,
            &mut sink,
            &acme(),
            &bug.feedback_id.parse().unwrap(),
            FeedbackStatus::InProgress,
        )
        .unwrap();

        let summary = summary_by_title(&conn, &acme(), &title_id).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_kind.get("bug"), Some(&2));
        assert_eq!(summary.by_kind.get("general"), Some(&1));
        assert_eq!(summary.by_status.get("new"), Some(&2));
        assert_eq!(summary.by_status.get("in_progress"), Some(&1));
    }

    #[test]
    fn unknown_feedback_is_not_found() {
        let conn = test_db();
        with_title(&conn);
        let mut sink = NullOutbound;

        let ghost = FeedbackId::generate();
        let err =
            set_status(&conn, &mut sink, &acme(), &ghost, FeedbackStatus::Closed).unwrap_err();
        assert!(matches!(err, EngineError::FeedbackNotFound(_)));
    }
}
