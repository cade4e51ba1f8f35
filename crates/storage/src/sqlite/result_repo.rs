use chrono::{DateTime, Utc};
use exam_core::model::{ExamResult, GradedAnswer, ResultId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, result_id_from_i64, ser, u32_from_i64};
use crate::repository::{ExamResultRepository, StorageError, StoredResult};

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredResult, StorageError> {
    let id = result_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?);
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let percentage: f64 = row.try_get("percentage").map_err(ser)?;
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Vec<GradedAnswer> = serde_json::from_str(&answers_json).map_err(ser)?;
    let started_at: DateTime<Utc> = row.try_get("started_at").map_err(ser)?;
    let submitted_at: DateTime<Utc> = row.try_get("submitted_at").map_err(ser)?;

    Ok(StoredResult {
        id,
        started_at,
        result: ExamResult {
            score,
            total_questions,
            percentage,
            submitted_at,
            answers,
        },
    })
}

#[async_trait::async_trait]
impl ExamResultRepository for SqliteRepository {
    async fn append_result(
        &self,
        started_at: DateTime<Utc>,
        result: &ExamResult,
    ) -> Result<ResultId, StorageError> {
        let answers = serde_json::to_string(&result.answers).map_err(ser)?;

        let res = sqlx::query(
            r"
                INSERT INTO exam_results (
                    score, total_questions, percentage, answers, started_at, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(i64::from(result.score))
        .bind(i64::from(result.total_questions))
        .bind(result.percentage)
        .bind(answers)
        .bind(started_at)
        .bind(result.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(result_id_from_i64(res.last_insert_rowid()))
    }

    async fn get_result(&self, id: ResultId) -> Result<StoredResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, score, total_questions, percentage, answers, started_at, submitted_at
                FROM exam_results
                WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<StoredResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, score, total_questions, percentage, answers, started_at, submitted_at
                FROM exam_results
                ORDER BY submitted_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }
}
