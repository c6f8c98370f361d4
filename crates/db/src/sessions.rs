// crates/db/src/sessions.rs
//! Session records and the status transition entry point.
//!
//! `transition_session` is the single place that enforces transition
//! legality: interactive status updates and the maintenance sweeper both go
//! through it. Each mutating method runs in one transaction so status and
//! timestamp writes cannot interleave with a concurrent mutation.

use crate::{Database, DbError, DbResult};
use hirelane_core::{Recommendation, SessionStatus, Transition};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A session row as stored. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub id: i64,
    pub session_uid: String,
    pub candidate_id: i64,
    pub template_id: i64,
    pub status: SessionStatus,
    pub language: Option<String>,
    pub scheduled_at: Option<i64>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub ai_summary: Option<String>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub total_turns: i64,
    pub reminded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for SessionRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status_raw: String = row.try_get("status")?;
        let status = SessionStatus::parse(&status_raw)
            .ok_or_else(|| sqlx::Error::Decode(format!("bad status: {status_raw}").into()))?;
        let recommendation = match row.try_get::<Option<String>, _>("recommendation")? {
            Some(raw) => Some(
                Recommendation::parse(&raw).ok_or_else(|| {
                    sqlx::Error::Decode(format!("bad recommendation: {raw}").into())
                })?,
            ),
            None => None,
        };
        Ok(Self {
            id: row.try_get("id")?,
            session_uid: row.try_get("session_uid")?,
            candidate_id: row.try_get("candidate_id")?,
            template_id: row.try_get("template_id")?,
            status,
            language: row.try_get("language")?,
            scheduled_at: row.try_get("scheduled_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            ai_summary: row.try_get("ai_summary")?,
            strengths: row.try_get("strengths")?,
            weaknesses: row.try_get("weaknesses")?,
            recommendation,
            total_turns: row.try_get("total_turns")?,
            reminded_at: row.try_get("reminded_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fields for a new session. The caller owns uid generation and the
/// scheduled-vs-immediate `started_at` decision.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_uid: String,
    pub candidate_id: i64,
    pub template_id: i64,
    pub language: Option<String>,
    pub scheduled_at: Option<i64>,
    pub started_at: i64,
}

/// Evaluation summary attached after (or during) an interview.
#[derive(Debug, Clone)]
pub struct EvaluationUpdate {
    pub ai_summary: Option<String>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub recommendation: Option<Recommendation>,
}

/// Outcome of a successful transition request.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub session: SessionRow,
    /// False when the request was a same-state no-op.
    pub changed: bool,
}

/// Candidate directory entry (read-only lookup collaborator).
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for CandidateRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
        })
    }
}

impl CandidateRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Template directory entry (read-only lookup collaborator).
#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub id: i64,
    pub name: String,
    pub job_title: Option<String>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for TemplateRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            job_title: row.try_get("job_title")?,
        })
    }
}

impl Database {
    /// Insert a new PENDING session and return its row.
    pub async fn create_session(&self, new: &NewSession, now_ms: i64) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (
                session_uid, candidate_id, template_id, status, language,
                scheduled_at, started_at, total_turns, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
            RETURNING *
            "#,
        )
        .bind(&new.session_uid)
        .bind(new.candidate_id)
        .bind(new.template_id)
        .bind(SessionStatus::Pending.as_str())
        .bind(&new.language)
        .bind(new.scheduled_at)
        .bind(new.started_at)
        .bind(now_ms)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    /// Look up a session by its external identifier.
    pub async fn find_session(&self, session_uid: &str) -> DbResult<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE session_uid = ?1")
            .bind(session_uid)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    /// Like [`Database::find_session`], but absence is an error.
    pub async fn get_session(&self, session_uid: &str) -> DbResult<SessionRow> {
        self.find_session(session_uid)
            .await?
            .ok_or(DbError::SessionNotFound)
    }

    /// Apply a status change after validating it against the state machine.
    ///
    /// Same-state requests succeed without a write (`changed == false`).
    /// Completion stamps `completed_at`; no other transition touches it, so
    /// the column is non-null exactly when the status is COMPLETED.
    pub async fn transition_session(
        &self,
        session_uid: &str,
        target: SessionStatus,
        now_ms: i64,
    ) -> DbResult<TransitionResult> {
        let mut tx = self.pool().begin().await?;

        let session =
            sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE session_uid = ?1")
                .bind(session_uid)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(DbError::SessionNotFound)?;

        match session.status.validate_transition(target)? {
            Transition::Noop => {
                tx.rollback().await?;
                Ok(TransitionResult {
                    session,
                    changed: false,
                })
            }
            Transition::Apply { sets_completed_at } => {
                let completed_at = if sets_completed_at {
                    Some(now_ms)
                } else {
                    session.completed_at
                };
                let updated = sqlx::query_as::<_, SessionRow>(
                    r#"
                    UPDATE sessions
                    SET status = ?1, completed_at = ?2, updated_at = ?3
                    WHERE id = ?4
                    RETURNING *
                    "#,
                )
                .bind(target.as_str())
                .bind(completed_at)
                .bind(now_ms)
                .bind(session.id)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;
                Ok(TransitionResult {
                    session: updated,
                    changed: true,
                })
            }
        }
    }

    /// Attach an evaluation summary. Allowed in any status; never changes
    /// the status itself.
    pub async fn update_evaluation(
        &self,
        session_uid: &str,
        eval: &EvaluationUpdate,
        now_ms: i64,
    ) -> DbResult<SessionRow> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE sessions
            SET ai_summary = ?1, strengths = ?2, weaknesses = ?3,
                recommendation = ?4, updated_at = ?5
            WHERE session_uid = ?6
            RETURNING *
            "#,
        )
        .bind(&eval.ai_summary)
        .bind(&eval.strengths)
        .bind(&eval.weaknesses)
        .bind(eval.recommendation.map(Recommendation::as_str))
        .bind(now_ms)
        .bind(session_uid)
        .fetch_optional(self.pool())
        .await?
        .ok_or(DbError::SessionNotFound)?;
        Ok(row)
    }

    /// Delete a session and everything it owns (turns, standalone activity
    /// reports) in one transaction.
    pub async fn delete_session(&self, session_uid: &str) -> DbResult<()> {
        let mut tx = self.pool().begin().await?;

        let id: Option<(i64,)> = sqlx::query_as("SELECT id FROM sessions WHERE session_uid = ?1")
            .bind(session_uid)
            .fetch_optional(&mut *tx)
            .await?;
        let (id,) = id.ok_or(DbError::SessionNotFound)?;

        sqlx::query("DELETE FROM turns WHERE session_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM suspicious_activity WHERE session_uid = ?1")
            .bind(session_uid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sweep queries
    // ------------------------------------------------------------------

    /// PENDING sessions whose start time falls within the next
    /// `window_ms` and that have not been reminded yet.
    pub async fn pending_reminders(&self, now_ms: i64, window_ms: i64) -> DbResult<Vec<SessionRow>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT * FROM sessions
            WHERE status = 'PENDING'
              AND reminded_at IS NULL
              AND started_at > ?1
              AND started_at <= ?2
            ORDER BY started_at ASC
            "#,
        )
        .bind(now_ms)
        .bind(now_ms + window_ms)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Record that a reminder fired, so the next sweep skips the session.
    pub async fn mark_reminded(&self, session_uid: &str, now_ms: i64) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET reminded_at = ?1 WHERE session_uid = ?2")
            .bind(now_ms)
            .bind(session_uid)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// IN_PROGRESS sessions that started before `cutoff_ms`.
    pub async fn stale_in_progress(&self, cutoff_ms: i64) -> DbResult<Vec<SessionRow>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE status = 'IN_PROGRESS' AND started_at < ?1",
        )
        .bind(cutoff_ms)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// ABANDONED sessions that started before `cutoff_ms` (retention
    /// candidates).
    pub async fn abandoned_before(&self, cutoff_ms: i64) -> DbResult<Vec<SessionRow>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE status = 'ABANDONED' AND started_at < ?1",
        )
        .bind(cutoff_ms)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Directory lookups (read-only collaborator data)
    // ------------------------------------------------------------------

    pub async fn find_candidate(&self, id: i64) -> DbResult<Option<CandidateRow>> {
        let row = sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn find_template(&self, id: i64) -> DbResult<Option<TemplateRow>> {
        let row = sqlx::query_as::<_, TemplateRow>("SELECT * FROM templates WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn insert_candidate(
        &self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO candidates (first_name, last_name, email) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_one(self.pool())
        .await?;
        Ok(row.0)
    }

    pub async fn insert_template(&self, name: &str, job_title: Option<&str>) -> DbResult<i64> {
        let row: (i64,) =
            sqlx::query_as("INSERT INTO templates (name, job_title) VALUES (?1, ?2) RETURNING id")
                .bind(name)
                .bind(job_title)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0)
    }

    /// Persist a standalone suspicious-activity report (no turn in flight to
    /// absorb it).
    pub async fn record_suspicious_activity(
        &self,
        session_uid: &str,
        activity_type: &str,
        metadata: Option<&serde_json::Value>,
        now_ms: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO suspicious_activity (session_uid, activity_type, metadata, reported_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(session_uid)
        .bind(activity_type)
        .bind(metadata.map(|m| m.to_string()))
        .bind(now_ms)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
