/// Inline SQL migrations for the hirelane database schema.
///
/// We use simple inline migrations rather than sqlx migration files
/// because the schema is small and self-contained. All timestamps are
/// unix milliseconds.
pub const MIGRATIONS: &[&str] = &[
    // Migration 1: sessions table
    r#"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_uid TEXT NOT NULL UNIQUE,
    candidate_id INTEGER NOT NULL,
    template_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    language TEXT,
    scheduled_at INTEGER,
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    ai_summary TEXT,
    strengths TEXT,
    weaknesses TEXT,
    recommendation TEXT,
    total_turns INTEGER NOT NULL DEFAULT 0,
    reminded_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);
"#,
    // Migration 2: sessions indexes
    r#"
CREATE INDEX IF NOT EXISTS idx_sessions_status_started ON sessions(status, started_at);
"#,
    // Migration 3: turns table. turn_number is assigned inside the inserting
    // transaction; the UNIQUE constraint backstops the gap-free invariant.
    r#"
CREATE TABLE IF NOT EXISTS turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    turn_number INTEGER NOT NULL,
    question TEXT NOT NULL,
    answer TEXT,
    question_at INTEGER NOT NULL,
    answer_at INTEGER,
    answer_duration_ms INTEGER,
    audio_url TEXT,
    ai_comment TEXT,
    communication_score REAL,
    technical_score REAL,
    clarity_score REAL,
    anticheat_flagged INTEGER NOT NULL DEFAULT 0,
    anticheat_details TEXT,
    created_at INTEGER NOT NULL,
    UNIQUE(session_id, turn_number)
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, turn_number);
"#,
    // Migration 4: candidate/template directory (read-only lookups used to
    // decorate session snapshots; owned by the surrounding application).
    r#"
CREATE TABLE IF NOT EXISTS candidates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    job_title TEXT
);
"#,
    // Migration 5: standalone suspicious-activity reports (kept when no turn
    // is in flight to absorb them).
    r#"
CREATE TABLE IF NOT EXISTS suspicious_activity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_uid TEXT NOT NULL,
    activity_type TEXT NOT NULL,
    metadata TEXT,
    reported_at INTEGER NOT NULL
);
"#,
];
