//! Property tests for the denormalized enrollment counters.
//!
//! Replays arbitrary operation sequences (joins, leaves, completions,
//! submissions, session time, task deletions) against a fresh store and
//! checks that the counters always match the rows they summarize, that
//! rewards are emitted exactly once per (task, tester) pair, and that
//! every failure is one of the documented precondition errors.

use proptest::prelude::*;

use playtest_core::agreement::{self, AcceptanceEvidence};
use playtest_core::audit;
use playtest_core::enrollment;
use playtest_core::error::EngineError;
use playtest_core::feedback;
use playtest_core::model::{
    Caller, FeedbackDraft, FeedbackKind, PublisherId, Severity, TaskId, TaskKind, TaskSpec,
    TesterId, TitleId,
};
use playtest_core::outbound::{NullOutbound, RecordingOutbound};
use playtest_core::store::migrations;
use playtest_core::tasks;
use playtest_core::titles;
use rusqlite::Connection;

const TESTERS: [&str; 3] = ["alice", "bob", "carol"];
const TASK_COUNT: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Join(usize),
    Leave(usize),
    Complete(usize, usize),
    SubmitBug(usize),
    SubmitNote(usize),
    LogSession(usize, u32),
    DeleteTask(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0..TESTERS.len()).prop_map(Op::Join),
        1 => (0..TESTERS.len()).prop_map(Op::Leave),
        3 => ((0..TESTERS.len()), (0..TASK_COUNT)).prop_map(|(t, k)| Op::Complete(t, k)),
        1 => (0..TESTERS.len()).prop_map(Op::SubmitBug),
        1 => (0..TESTERS.len()).prop_map(Op::SubmitNote),
        1 => ((0..TESTERS.len()), (0..600u32)).prop_map(|(t, s)| Op::LogSession(t, s)),
        1 => (0..TASK_COUNT).prop_map(Op::DeleteTask),
    ]
}

fn acme() -> Caller {
    Caller::Publisher(PublisherId::new("acme").expect("publisher id"))
}

/// One title, three testers with accepted agreements, three tasks. Nobody
/// is enrolled yet; the op sequence drives everything from there.
fn seeded_program() -> (Connection, TitleId, Vec<TesterId>, Vec<TaskId>) {
    let mut conn = Connection::open_in_memory().expect("open in-memory db");
    conn.pragma_update(None, "foreign_keys", "ON")
        .expect("enable foreign keys");
    migrations::migrate(&mut conn).expect("migrate schema");

    let title_id = TitleId::new("vale").expect("title id");
    titles::register(&conn, &acme(), &title_id).expect("register title");

    let mut testers = Vec::new();
    for name in TESTERS {
        let tester_id = TesterId::new(name).expect("tester id");
        agreement::record_acceptance(
            &conn,
            &Caller::Tester(tester_id.clone()),
            &title_id,
            &AcceptanceEvidence {
                recorded_at_us: 1,
                origin: "launcher".to_string(),
            },
        )
        .expect("record acceptance");
        testers.push(tester_id);
    }

    let mut task_ids = Vec::new();
    for index in 0..TASK_COUNT {
        let task = tasks::create_task(
            &mut conn,
            &mut NullOutbound,
            &acme(),
            &title_id,
            TaskSpec {
                name: format!("Task {index}"),
                description: String::new(),
                kind: TaskKind::TestFeature,
                xp_reward: 25,
                points_reward: 5,
                is_optional: false,
                display_order: i64::try_from(index).expect("small index"),
            },
        )
        .expect("create task");
        task_ids.push(task.task_id.parse().expect("task id"));
    }

    (conn, title_id, testers, task_ids)
}

fn is_expected_failure(error: &EngineError) -> bool {
    matches!(
        error,
        EngineError::AlreadyEnrolled { .. }
            | EngineError::NotEnrolled { .. }
            | EngineError::TaskNotFound(_)
    )
}

fn bug_draft() -> FeedbackDraft {
    FeedbackDraft {
        kind: FeedbackKind::Bug,
        summary: "Crash".to_string(),
        description: "Repro attached".to_string(),
        severity: Some(Severity::Medium),
        attachment_ref: None,
    }
}

fn note_draft() -> FeedbackDraft {
    FeedbackDraft {
        kind: FeedbackKind::General,
        summary: "Notes".to_string(),
        description: "General impressions".to_string(),
        severity: None,
        attachment_ref: None,
    }
}

proptest! {
    // Every case replays a fresh in-memory store, so the case count stays
    // moderate compared to the pure in-memory suites.
    #![proptest_config(proptest::test_runner::Config::with_cases(128))]

    #[test]
    fn counters_survive_arbitrary_operation_sequences(
        ops in proptest::collection::vec(arb_op(), 0..48)
    ) {
        let (mut conn, title_id, testers, task_ids) = seeded_program();
        let mut sink = RecordingOutbound::new();
        let mut expected_rewards = 0usize;
        let mut expected_seconds = [0u64; TESTERS.len()];

        for op in ops {
            let result: Result<(), EngineError> = match op {
                Op::Join(t) => {
                    let caller = Caller::Tester(testers[t].clone());
                    enrollment::join(&mut conn, &mut sink, &caller, &title_id).map(|_| ())
                }
                Op::Leave(t) => {
                    let caller = Caller::Tester(testers[t].clone());
                    enrollment::deactivate(&conn, &caller, &testers[t], &title_id)
                }
                Op::Complete(t, k) => {
                    let caller = Caller::Tester(testers[t].clone());
                    match tasks::complete_task(&mut conn, &mut sink, &caller, &task_ids[k]) {
                        Ok(outcome) => {
                            prop_assert_eq!(
                                outcome.reward.is_some(),
                                !outcome.already_completed
                            );
                            if !outcome.already_completed {
                                expected_rewards += 1;
                            }
                            Ok(())
                        }
                        Err(error) => Err(error),
                    }
                }
                Op::SubmitBug(t) => {
                    let caller = Caller::Tester(testers[t].clone());
                    feedback::submit(&mut conn, &caller, &title_id, bug_draft()).map(|_| ())
                }
                Op::SubmitNote(t) => {
                    let caller = Caller::Tester(testers[t].clone());
                    feedback::submit(&mut conn, &caller, &title_id, note_draft()).map(|_| ())
                }
                Op::LogSession(t, seconds) => {
                    let caller = Caller::Tester(testers[t].clone());
                    match enrollment::record_session_time(&conn, &caller, &title_id, seconds) {
                        Ok(_) => {
                            expected_seconds[t] += u64::from(seconds);
                            Ok(())
                        }
                        Err(error) => Err(error),
                    }
                }
                Op::DeleteTask(k) => {
                    tasks::delete_task(&mut conn, &acme(), &task_ids[k]).map(|_| ())
                }
            };

            if let Err(error) = result {
                prop_assert!(
                    is_expected_failure(&error),
                    "unexpected failure: {error}"
                );
            }
        }

        let drifts = audit::verify_counters(&conn, &acme(), &title_id)
            .expect("verify counters");
        prop_assert!(drifts.is_empty(), "counter drift: {drifts:?}");

        prop_assert_eq!(sink.rewards().len(), expected_rewards);

        for (index, tester_id) in testers.iter().enumerate() {
            let stored = enrollment::get(&conn, tester_id, &title_id)
                .expect("lookup")
                .map_or(0, |enrollment| enrollment.time_spent_seconds);
            prop_assert_eq!(stored, expected_seconds[index]);
        }
    }
}
