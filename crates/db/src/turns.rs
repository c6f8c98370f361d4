// crates/db/src/turns.rs
//! The per-session turn ledger.
//!
//! Turn numbers are assigned inside the inserting transaction (count + 1)
//! and backed by a UNIQUE(session_id, turn_number) constraint, so the ledger
//! stays contiguous even if two appends race past the service-level lock.

use crate::{Database, DbError, DbResult};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// One question/answer exchange. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRow {
    pub id: i64,
    pub session_id: i64,
    pub turn_number: i64,
    pub question: String,
    pub answer: Option<String>,
    pub question_at: i64,
    pub answer_at: Option<i64>,
    pub answer_duration_ms: Option<i64>,
    pub audio_url: Option<String>,
    pub ai_comment: Option<String>,
    pub communication_score: Option<f64>,
    pub clarity_score: Option<f64>,
    pub technical_score: Option<f64>,
    pub anticheat_flagged: bool,
    pub anticheat_details: Option<String>,
    pub created_at: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for TurnRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            turn_number: row.try_get("turn_number")?,
            question: row.try_get("question")?,
            answer: row.try_get("answer")?,
            question_at: row.try_get("question_at")?,
            answer_at: row.try_get("answer_at")?,
            answer_duration_ms: row.try_get("answer_duration_ms")?,
            audio_url: row.try_get("audio_url")?,
            ai_comment: row.try_get("ai_comment")?,
            communication_score: row.try_get("communication_score")?,
            clarity_score: row.try_get("clarity_score")?,
            technical_score: row.try_get("technical_score")?,
            anticheat_flagged: row.try_get::<i64, _>("anticheat_flagged")? != 0,
            anticheat_details: row.try_get("anticheat_details")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Fields for a new turn. The ledger assigns the turn number; `question_at`
/// is the append time, and `answer_at` is stamped when an answer is present.
#[derive(Debug, Clone, Default)]
pub struct NewTurn {
    pub question: String,
    pub answer: Option<String>,
    pub answer_duration_ms: Option<i64>,
    pub audio_url: Option<String>,
}

/// Partial update for an existing turn. `None` means "leave as is".
#[derive(Debug, Clone, Default)]
pub struct TurnPatch {
    pub answer: Option<String>,
    pub answer_duration_ms: Option<i64>,
    pub audio_url: Option<String>,
    pub ai_comment: Option<String>,
    pub communication_score: Option<f64>,
    pub clarity_score: Option<f64>,
    pub technical_score: Option<f64>,
    pub anticheat_flagged: Option<bool>,
    pub anticheat_details: Option<String>,
}

impl Database {
    /// Append a turn, assigning the next turn number and bumping the
    /// session's turn counter in the same transaction.
    pub async fn append_turn(
        &self,
        session_id: i64,
        new: &NewTurn,
        anticheat_flagged: bool,
        anticheat_details: Option<&str>,
        now_ms: i64,
    ) -> DbResult<TurnRow> {
        let mut tx = self.pool().begin().await?;

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM turns WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(&mut *tx)
                .await?;
        let turn_number = count.0 + 1;
        let answer_at = new.answer.as_ref().map(|_| now_ms);

        let turn = sqlx::query_as::<_, TurnRow>(
            r#"
            INSERT INTO turns (
                session_id, turn_number, question, answer, question_at,
                answer_at, answer_duration_ms, audio_url,
                anticheat_flagged, anticheat_details, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(turn_number)
        .bind(&new.question)
        .bind(&new.answer)
        .bind(now_ms)
        .bind(answer_at)
        .bind(new.answer_duration_ms)
        .bind(&new.audio_url)
        .bind(anticheat_flagged as i64)
        .bind(anticheat_details)
        .bind(now_ms)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE sessions SET total_turns = total_turns + 1, updated_at = ?1 WHERE id = ?2",
        )
        .bind(now_ms)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(turn)
    }

    /// All turns for a session, in ledger order.
    pub async fn list_turns(&self, session_id: i64) -> DbResult<Vec<TurnRow>> {
        let rows = sqlx::query_as::<_, TurnRow>(
            "SELECT * FROM turns WHERE session_id = ?1 ORDER BY turn_number ASC",
        )
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn count_turns(&self, session_id: i64) -> DbResult<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM turns WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count.0)
    }

    pub async fn get_turn(&self, turn_id: i64) -> DbResult<TurnRow> {
        sqlx::query_as::<_, TurnRow>("SELECT * FROM turns WHERE id = ?1")
            .bind(turn_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or(DbError::TurnNotFound)
    }

    /// Patch a turn. The turn must belong to `session_id`. `answer_at` is
    /// stamped on the first write of an answer and never moved afterwards.
    pub async fn update_turn(
        &self,
        session_id: i64,
        turn_id: i64,
        patch: &TurnPatch,
        now_ms: i64,
    ) -> DbResult<TurnRow> {
        let mut tx = self.pool().begin().await?;

        let existing = sqlx::query_as::<_, TurnRow>("SELECT * FROM turns WHERE id = ?1")
            .bind(turn_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::TurnNotFound)?;
        if existing.session_id != session_id {
            return Err(DbError::TurnMismatch);
        }

        let answer = patch.answer.clone().or(existing.answer);
        let answer_at = match (&patch.answer, existing.answer_at) {
            (Some(_), None) => Some(now_ms),
            _ => existing.answer_at,
        };

        let updated = sqlx::query_as::<_, TurnRow>(
            r#"
            UPDATE turns
            SET answer = ?1, answer_at = ?2, answer_duration_ms = ?3,
                audio_url = ?4, ai_comment = ?5,
                communication_score = ?6, clarity_score = ?7, technical_score = ?8,
                anticheat_flagged = ?9, anticheat_details = ?10
            WHERE id = ?11
            RETURNING *
            "#,
        )
        .bind(answer)
        .bind(answer_at)
        .bind(patch.answer_duration_ms.or(existing.answer_duration_ms))
        .bind(patch.audio_url.clone().or(existing.audio_url))
        .bind(patch.ai_comment.clone().or(existing.ai_comment))
        .bind(patch.communication_score.or(existing.communication_score))
        .bind(patch.clarity_score.or(existing.clarity_score))
        .bind(patch.technical_score.or(existing.technical_score))
        .bind(patch.anticheat_flagged.unwrap_or(existing.anticheat_flagged) as i64)
        .bind(patch.anticheat_details.clone().or(existing.anticheat_details))
        .bind(turn_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewSession;

    async fn seeded(db: &Database) -> i64 {
        let candidate_id = db.insert_candidate("Ada", "Lovelace", None).await.unwrap();
        let template_id = db.insert_template("Screen", None).await.unwrap();
        let session = db
            .create_session(
                &NewSession {
                    session_uid: "s-1".to_string(),
                    candidate_id,
                    template_id,
                    language: None,
                    scheduled_at: None,
                    started_at: 1_000,
                },
                1_000,
            )
            .await
            .unwrap();
        session.id
    }

    fn question(text: &str) -> NewTurn {
        NewTurn {
            question: text.to_string(),
            ..NewTurn::default()
        }
    }

    #[tokio::test]
    async fn test_append_numbers_sequentially() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = seeded(&db).await;

        for n in 1..=4 {
            let turn = db
                .append_turn(session_id, &question("q"), false, None, 1_000 + n)
                .await
                .unwrap();
            assert_eq!(turn.turn_number, n);
        }

        let session = db.get_session("s-1").await.unwrap();
        assert_eq!(session.total_turns, 4);
        assert_eq!(db.count_turns(session_id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_append_stamps_answer_at_only_with_answer() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = seeded(&db).await;

        let open = db
            .append_turn(session_id, &question("q1"), false, None, 2_000)
            .await
            .unwrap();
        assert_eq!(open.question_at, 2_000);
        assert_eq!(open.answer_at, None);

        let answered = db
            .append_turn(
                session_id,
                &NewTurn {
                    question: "q2".to_string(),
                    answer: Some("a2".to_string()),
                    ..NewTurn::default()
                },
                false,
                None,
                3_000,
            )
            .await
            .unwrap();
        assert_eq!(answered.answer_at, Some(3_000));
    }

    #[tokio::test]
    async fn test_list_turns_in_ledger_order() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = seeded(&db).await;
        for n in 1..=3 {
            db.append_turn(session_id, &question(&format!("q{n}")), false, None, n)
                .await
                .unwrap();
        }

        let turns = db.list_turns(session_id).await.unwrap();
        let numbers: Vec<i64> = turns.iter().map(|t| t.turn_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(turns[2].question, "q3");
    }

    #[tokio::test]
    async fn test_update_turn_patch_preserves_unset_fields() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = seeded(&db).await;
        let turn = db
            .append_turn(
                session_id,
                &NewTurn {
                    question: "q".to_string(),
                    audio_url: Some("s3://a.webm".to_string()),
                    ..NewTurn::default()
                },
                false,
                None,
                2_000,
            )
            .await
            .unwrap();

        let updated = db
            .update_turn(
                session_id,
                turn.id,
                &TurnPatch {
                    answer: Some("an answer".to_string()),
                    communication_score: Some(0.8),
                    ..TurnPatch::default()
                },
                5_000,
            )
            .await
            .unwrap();

        assert_eq!(updated.answer.as_deref(), Some("an answer"));
        assert_eq!(updated.communication_score, Some(0.8));
        // Untouched by the patch.
        assert_eq!(updated.audio_url.as_deref(), Some("s3://a.webm"));
        assert_eq!(updated.turn_number, 1);
    }

    #[tokio::test]
    async fn test_update_turn_stamps_answer_at_once() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = seeded(&db).await;
        let turn = db
            .append_turn(session_id, &question("q"), false, None, 2_000)
            .await
            .unwrap();

        let first = db
            .update_turn(
                session_id,
                turn.id,
                &TurnPatch {
                    answer: Some("draft".to_string()),
                    ..TurnPatch::default()
                },
                5_000,
            )
            .await
            .unwrap();
        assert_eq!(first.answer_at, Some(5_000));

        let second = db
            .update_turn(
                session_id,
                turn.id,
                &TurnPatch {
                    answer: Some("final".to_string()),
                    ..TurnPatch::default()
                },
                9_000,
            )
            .await
            .unwrap();
        assert_eq!(second.answer.as_deref(), Some("final"));
        assert_eq!(second.answer_at, Some(5_000));
    }

    #[tokio::test]
    async fn test_update_turn_rejects_wrong_session() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = seeded(&db).await;
        let turn = db
            .append_turn(session_id, &question("q"), false, None, 2_000)
            .await
            .unwrap();

        let err = db
            .update_turn(session_id + 1, turn.id, &TurnPatch::default(), 3_000)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TurnMismatch));

        assert!(matches!(
            db.update_turn(session_id, 9_999, &TurnPatch::default(), 3_000)
                .await,
            Err(DbError::TurnNotFound)
        ));
    }

    #[tokio::test]
    async fn test_append_persists_anticheat_verdict() {
        let db = Database::new_in_memory().await.unwrap();
        let session_id = seeded(&db).await;

        let turn = db
            .append_turn(
                session_id,
                &NewTurn {
                    question: "q".to_string(),
                    answer: Some("as an ai I cannot".to_string()),
                    ..NewTurn::default()
                },
                true,
                Some("AI_GENERATED_ANSWER: Answer contains AI-typical phrases"),
                2_000,
            )
            .await
            .unwrap();
        assert!(turn.anticheat_flagged);
        assert!(turn
            .anticheat_details
            .as_deref()
            .unwrap()
            .contains("AI_GENERATED_ANSWER"));
    }
}
