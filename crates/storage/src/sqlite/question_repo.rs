use std::collections::HashMap;

use exam_core::grading::AnswerKey;
use exam_core::model::{Question, QuestionId, QuestionWithAnswer};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, map_question_row, option_to_str, parse_option, question_id_from_i64,
    question_id_to_i64, ser,
};
use crate::repository::{QuestionRepository, StorageError};

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, record: &QuestionWithAnswer) -> Result<(), StorageError> {
        let question = &record.question;
        sqlx::query(
            r"
                INSERT INTO questions (
                    id, question_text, option_a, option_b, option_c, option_d, correct_answer
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    question_text = excluded.question_text,
                    option_a = excluded.option_a,
                    option_b = excluded.option_b,
                    option_c = excluded.option_c,
                    option_d = excluded.option_d,
                    correct_answer = excluded.correct_answer
            ",
        )
        .bind(question_id_to_i64(question.id())?)
        .bind(question.text())
        .bind(question.option(exam_core::model::AnswerOption::A))
        .bind(question.option(exam_core::model::AnswerOption::B))
        .bind(question.option(exam_core::model::AnswerOption::C))
        .bind(question.option(exam_core::model::AnswerOption::D))
        .bind(option_to_str(record.correct))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn question_ids(&self) -> Result<Vec<QuestionId>, StorageError> {
        let rows = sqlx::query("SELECT id FROM questions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?))
            .collect()
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r"
                SELECT id, question_text, option_a, option_b, option_c, option_d
                FROM questions
                WHERE id IN ({})
            ",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(question_id_to_i64(*id)?);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let question = map_question_row(row)?;
            by_id.insert(question.id(), question);
        }

        ids.iter()
            .map(|id| by_id.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn answer_key(&self, ids: &[QuestionId]) -> Result<AnswerKey, StorageError> {
        if ids.is_empty() {
            return Ok(AnswerKey::new());
        }

        let sql = format!(
            "SELECT id, correct_answer FROM questions WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(question_id_to_i64(*id)?);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut key = AnswerKey::with_capacity(rows.len());
        for row in &rows {
            let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
            let correct: String = row.try_get("correct_answer").map_err(ser)?;
            key.insert(id, parse_option(&correct)?);
        }
        Ok(key)
    }
}
