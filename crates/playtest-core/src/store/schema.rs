//! Canonical SQLite schema for the beta program store.
//!
//! The schema is normalized around the (tester, title) pair:
//! - `titles` holds each title's release lifecycle and owning publisher
//! - `agreements` is the append-only confidentiality ledger
//! - `enrollments` carries membership plus denormalized activity counters
//! - `tasks` and `task_completions` form the catalog and its idempotency
//!   boundary (one completion row per task/tester pair)
//! - `feedback` stores triageable submissions
//! - `store_meta` tracks the applied schema version
//!
//! `task_completions` deliberately has no `ON DELETE CASCADE`: removing a
//! task must delete its completions in the same explicit transaction, so a
//! missed cleanup surfaces as a foreign-key error instead of silent loss.

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS titles (
    title_id TEXT PRIMARY KEY CHECK (length(trim(title_id)) > 0),
    publisher_id TEXT NOT NULL CHECK (length(trim(publisher_id)) > 0),
    release_state TEXT NOT NULL DEFAULT 'testing'
        CHECK (release_state IN ('draft', 'testing', 'released')),
    registered_at_us INTEGER NOT NULL,
    released_at_us INTEGER
);

CREATE TABLE IF NOT EXISTS agreements (
    tester_id TEXT NOT NULL CHECK (length(trim(tester_id)) > 0),
    title_id TEXT NOT NULL REFERENCES titles(title_id),
    accepted_at_us INTEGER NOT NULL,
    evidence_recorded_at_us INTEGER NOT NULL,
    evidence_origin TEXT NOT NULL,
    PRIMARY KEY (tester_id, title_id)
);

CREATE TABLE IF NOT EXISTS enrollments (
    tester_id TEXT NOT NULL CHECK (length(trim(tester_id)) > 0),
    title_id TEXT NOT NULL REFERENCES titles(title_id),
    joined_at_us INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    bugs_reported INTEGER NOT NULL DEFAULT 0 CHECK (bugs_reported >= 0),
    tasks_completed INTEGER NOT NULL DEFAULT 0 CHECK (tasks_completed >= 0),
    time_spent_seconds INTEGER NOT NULL DEFAULT 0 CHECK (time_spent_seconds >= 0),
    PRIMARY KEY (tester_id, title_id)
);

CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY CHECK (task_id LIKE 'task-%'),
    title_id TEXT NOT NULL REFERENCES titles(title_id),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    description TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL
        CHECK (kind IN ('bug_report', 'suggestion', 'play_level', 'test_feature')),
    xp_reward INTEGER NOT NULL DEFAULT 0 CHECK (xp_reward BETWEEN 0 AND 1000),
    points_reward INTEGER NOT NULL DEFAULT 0 CHECK (points_reward BETWEEN 0 AND 100),
    is_optional INTEGER NOT NULL DEFAULT 0 CHECK (is_optional IN (0, 1)),
    display_order INTEGER NOT NULL DEFAULT 0,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS task_completions (
    task_id TEXT NOT NULL REFERENCES tasks(task_id),
    tester_id TEXT NOT NULL CHECK (length(trim(tester_id)) > 0),
    completed_at_us INTEGER NOT NULL,
    PRIMARY KEY (task_id, tester_id)
);

CREATE TABLE IF NOT EXISTS feedback (
    feedback_id TEXT PRIMARY KEY CHECK (feedback_id LIKE 'fb-%'),
    title_id TEXT NOT NULL REFERENCES titles(title_id),
    tester_id TEXT NOT NULL CHECK (length(trim(tester_id)) > 0),
    kind TEXT NOT NULL CHECK (kind IN ('bug', 'suggestion', 'general')),
    summary TEXT NOT NULL CHECK (length(trim(summary)) > 0),
    description TEXT NOT NULL CHECK (length(trim(description)) > 0),
    severity TEXT CHECK (severity IS NULL OR severity IN ('critical', 'high', 'medium', 'low')),
    status TEXT NOT NULL DEFAULT 'new'
        CHECK (status IN ('new', 'in_progress', 'resolved', 'closed')),
    attachment_ref TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK ((kind = 'bug') = (severity IS NOT NULL))
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
"#;

/// Migration v2: read-path indexes for roster, catalog, and triage views.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_enrollments_title_active
    ON enrollments(title_id, is_active);

CREATE INDEX IF NOT EXISTS idx_tasks_title_order
    ON tasks(title_id, display_order, created_at_us);

CREATE INDEX IF NOT EXISTS idx_task_completions_tester
    ON task_completions(tester_id, task_id);

CREATE INDEX IF NOT EXISTS idx_feedback_title_status
    ON feedback(title_id, status, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_feedback_title_kind
    ON feedback(title_id, kind);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
"#;

/// Indexes expected by roster/catalog/triage query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_enrollments_title_active",
    "idx_tasks_title_order",
    "idx_task_completions_tester",
    "idx_feedback_title_status",
    "idx_feedback_title_kind",
];
