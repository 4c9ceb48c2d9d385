//! Append-only confidentiality agreement ledger.
//!
//! A record's existence is the sole proof of consent. Records are only ever
//! created: re-accepting is absorbed as a no-op success and deactivating an
//! enrollment leaves the agreement untouched, so a tester who rejoins later
//! does not sign again.

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{Caller, TesterId, TitleId};
use crate::store::now_us;
use crate::titles;

/// Caller-supplied audit trail for an acceptance. Stored verbatim and never
/// interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceEvidence {
    /// When the caller observed the acceptance, by the caller's clock.
    pub recorded_at_us: i64,
    /// Where the acceptance happened (launcher build, web form, import).
    pub origin: String,
}

/// One immutable row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgreementRecord {
    pub tester_id: String,
    pub title_id: String,
    pub accepted_at_us: i64,
    pub evidence: AcceptanceEvidence,
}

/// What [`record_acceptance`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptanceOutcome {
    pub record: AgreementRecord,
    /// `false` when the pair had already accepted and the call was absorbed.
    pub newly_accepted: bool,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgreementRecord> {
    Ok(AgreementRecord {
        tester_id: row.get(0)?,
        title_id: row.get(1)?,
        accepted_at_us: row.get(2)?,
        evidence: AcceptanceEvidence {
            recorded_at_us: row.get(3)?,
            origin: row.get(4)?,
        },
    })
}

pub(crate) fn is_accepted(
    conn: &Connection,
    tester_id: &str,
    title_id: &str,
) -> Result<bool, EngineError> {
    let accepted: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM agreements WHERE tester_id = ?1 AND title_id = ?2
        )",
        params![tester_id, title_id],
        |row| row.get(0),
    )?;
    Ok(accepted)
}

/// Whether the pair has an agreement on file. Pure lookup, no side effects.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub fn has_accepted(
    conn: &Connection,
    tester_id: &TesterId,
    title_id: &TitleId,
) -> Result<bool, EngineError> {
    is_accepted(conn, tester_id.as_str(), title_id.as_str())
}

/// Fetch the ledger row for a pair, if any.
///
/// # Errors
///
/// Returns an error if the lookup fails.
pub fn get_acceptance(
    conn: &Connection,
    tester_id: &TesterId,
    title_id: &TitleId,
) -> Result<Option<AgreementRecord>, EngineError> {
    let result = conn.query_row(
        "SELECT tester_id, title_id, accepted_at_us, evidence_recorded_at_us, evidence_origin
         FROM agreements
         WHERE tester_id = ?1 AND title_id = ?2",
        params![tester_id.as_str(), title_id.as_str()],
        row_to_record,
    );
    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Record that the calling tester accepted the confidentiality agreement
/// for a title.
///
/// Idempotent: a second acceptance for the same pair is a no-op success
/// that returns the original record, original evidence included.
///
/// # Errors
///
/// Returns [`EngineError::TitleNotFound`] for an unregistered title, or
/// [`EngineError::Forbidden`] when the caller is not a tester.
pub fn record_acceptance(
    conn: &Connection,
    caller: &Caller,
    title_id: &TitleId,
    evidence: &AcceptanceEvidence,
) -> Result<AcceptanceOutcome, EngineError> {
    let tester = caller.as_tester()?;
    titles::require(conn, title_id.as_str())?;

    let inserted = conn.execute(
        "INSERT OR IGNORE INTO agreements (
            tester_id, title_id, accepted_at_us, evidence_recorded_at_us, evidence_origin
         ) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            tester.as_str(),
            title_id.as_str(),
            now_us(),
            evidence.recorded_at_us,
            evidence.origin,
        ],
    )?;
    let newly_accepted = inserted == 1;

    if newly_accepted {
        tracing::info!(
            tester_id = %tester,
            title_id = %title_id,
            origin = %evidence.origin,
            "agreement accepted"
        );
    }

    let record = conn.query_row(
        "SELECT tester_id, title_id, accepted_at_us, evidence_recorded_at_us, evidence_origin
         FROM agreements
         WHERE tester_id = ?1 AND title_id = ?2",
        params![tester.as_str(), title_id.as_str()],
        row_to_record,
    )?;

    Ok(AcceptanceOutcome {
        record,
        newly_accepted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PublisherId;
    use crate::store::migrations;

    fn test_db() -> Connection {
        let mut conn = Connection::open_in_memory().expect("open in-memory db");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("enable foreign keys");
        migrations::migrate(&mut conn).expect("migrate");
        conn
    }

    fn with_title(conn: &Connection) -> TitleId {
        let publisher = Caller::Publisher(PublisherId::new("acme").unwrap());
        let title_id = TitleId::new("vale").unwrap();
        titles::register(conn, &publisher, &title_id).unwrap();
        title_id
    }

    fn alice() -> Caller {
        Caller::Tester(TesterId::new("alice").unwrap())
    }

    fn evidence(origin: &str) -> AcceptanceEvidence {
        AcceptanceEvidence {
            recorded_at_us: 1_700_000_000_000_000,
            origin: origin.to_string(),
        }
    }

    #[test]
    fn acceptance_flips_the_lookup() {
        let conn = test_db();
        let title_id = with_title(&conn);
        let tester_id = TesterId::new("alice").unwrap();

        assert!(!has_accepted(&conn, &tester_id, &title_id).unwrap());

        let outcome =
            record_acceptance(&conn, &alice(), &title_id, &evidence("launcher")).unwrap();
        assert!(outcome.newly_accepted);

        assert!(has_accepted(&conn, &tester_id, &title_id).unwrap());
    }

    #[test]
    fn re_acceptance_is_absorbed_and_keeps_the_original_evidence() {
        let conn = test_db();
        let title_id = with_title(&conn);

        let first = record_acceptance(&conn, &alice(), &title_id, &evidence("launcher")).unwrap();
        let second = record_acceptance(&conn, &alice(), &title_id, &evidence("web")).unwrap();

        assert!(first.newly_accepted);
        assert!(!second.newly_accepted);
        assert_eq!(second.record, first.record);
        assert_eq!(second.record.evidence.origin, "launcher");
    }

    #[test]
    fn acceptance_requires_a_registered_title() {
        let conn = test_db();
        let ghost = TitleId::new("ghost").unwrap();

        let err = record_acceptance(&conn, &alice(), &ghost, &evidence("launcher")).unwrap_err();
        assert!(matches!(err, EngineError::TitleNotFound(_)));
    }

    #[test]
    fn publishers_cannot_accept_on_behalf_of_testers() {
        let conn = test_db();
        let title_id = with_title(&conn);
        let publisher = Caller::Publisher(PublisherId::new("acme").unwrap());

        let err =
            record_acceptance(&conn, &publisher, &title_id, &evidence("launcher")).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));
    }

    #[test]
    fn get_acceptance_returns_the_stored_row() {
        let conn = test_db();
        let title_id = with_title(&conn);
        let tester_id = TesterId::new("alice").unwrap();

        assert!(get_acceptance(&conn, &tester_id, &title_id).unwrap().is_none());

        record_acceptance(&conn, &alice(), &title_id, &evidence("launcher")).unwrap();
        let record = get_acceptance(&conn, &tester_id, &title_id)
            .unwrap()
            .unwrap();
        assert_eq!(record.tester_id, "alice");
        assert_eq!(record.title_id, "vale");
        assert_eq!(record.evidence.recorded_at_us, 1_700_000_000_000_000);
    }
}
