use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::grading::AnswerKey;
use exam_core::model::{ExamResult, Question, QuestionId, QuestionWithAnswer, ResultId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A graded exam as kept in the history.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub id: ResultId,
    pub started_at: DateTime<Utc>,
    pub result: ExamResult,
}

/// Question bank contract.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question together with its correct option.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, record: &QuestionWithAnswer) -> Result<(), StorageError>;

    /// All question ids in the bank, ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn question_ids(&self) -> Result<Vec<QuestionId>, StorageError>;

    /// Fetch questions in the order of `ids`, without their answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// Correct options for the given ids. Unknown ids are left out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn answer_key(&self, ids: &[QuestionId]) -> Result<AnswerKey, StorageError>;
}

/// Exam history contract.
#[async_trait]
pub trait ExamResultRepository: Send + Sync {
    /// Append a graded result and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(
        &self,
        started_at: DateTime<Utc>,
        result: &ExamResult,
    ) -> Result<ResultId, StorageError>;

    /// Fetch a single result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_result(&self, id: ResultId) -> Result<StoredResult, StorageError>;

    /// Most recent results first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(&self, limit: u32) -> Result<Vec<StoredResult>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, QuestionWithAnswer>>>,
    results: Arc<Mutex<Vec<StoredResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, record: &QuestionWithAnswer) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(record.id(), record.clone());
        Ok(())
    }

    async fn question_ids(&self) -> Result<Vec<QuestionId>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut ids: Vec<_> = guard.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        ids.iter()
            .map(|id| {
                guard
                    .get(id)
                    .map(|record| record.question.clone())
                    .ok_or(StorageError::NotFound)
            })
            .collect()
    }

    async fn answer_key(&self, ids: &[QuestionId]) -> Result<AnswerKey, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.get(id).map(|record| (*id, record.correct)))
            .collect())
    }
}

#[async_trait]
impl ExamResultRepository for InMemoryRepository {
    async fn append_result(
        &self,
        started_at: DateTime<Utc>,
        result: &ExamResult,
    ) -> Result<ResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let next = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        let id = ResultId::new(next);
        guard.push(StoredResult {
            id,
            started_at,
            result: result.clone(),
        });
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<StoredResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|stored| stored.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(&self, limit: u32) -> Result<Vec<StoredResult>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut out: Vec<_> = guard.clone();
        out.sort_by(|a, b| {
            b.result
                .submitted_at
                .cmp(&a.result.submitted_at)
                .then(b.id.cmp(&a.id))
        });
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn ExamResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo);
        Self { questions, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::AnswerOption;
    use exam_core::time::fixed_now;

    fn build_question(id: u64, correct: AnswerOption) -> QuestionWithAnswer {
        let question = Question::new(
            QuestionId::new(id),
            format!("Question {id}?"),
            ["a".into(), "b".into(), "c".into(), "d".into()],
        )
        .unwrap();
        QuestionWithAnswer::new(question, correct)
    }

    fn build_result(score: u32, submitted_at: DateTime<Utc>) -> ExamResult {
        ExamResult {
            score,
            total_questions: 4,
            percentage: exam_core::grading::percentage(score, 4),
            submitted_at,
            answers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn questions_are_returned_in_requested_order() {
        let repo = InMemoryRepository::new();
        for id in 1..=3 {
            repo.upsert_question(&build_question(id, AnswerOption::A))
                .await
                .unwrap();
        }

        let ids = [QuestionId::new(3), QuestionId::new(1)];
        let fetched = repo.get_questions(&ids).await.unwrap();
        let fetched_ids: Vec<_> = fetched.iter().map(Question::id).collect();
        assert_eq!(fetched_ids, ids);

        assert_eq!(
            repo.question_ids().await.unwrap(),
            vec![QuestionId::new(1), QuestionId::new(2), QuestionId::new(3)]
        );
    }

    #[tokio::test]
    async fn missing_question_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_questions(&[QuestionId::new(7)]).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn answer_key_skips_unknown_ids() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&build_question(1, AnswerOption::C))
            .await
            .unwrap();

        let key = repo
            .answer_key(&[QuestionId::new(1), QuestionId::new(2)])
            .await
            .unwrap();
        assert_eq!(key.len(), 1);
        assert_eq!(key.get(&QuestionId::new(1)), Some(&AnswerOption::C));
    }

    #[tokio::test]
    async fn results_list_newest_first() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let first = repo
            .append_result(now, &build_result(1, now + Duration::minutes(5)))
            .await
            .unwrap();
        let second = repo
            .append_result(now, &build_result(3, now + Duration::minutes(9)))
            .await
            .unwrap();

        let listed = repo.list_results(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);

        let limited = repo.list_results(1).await.unwrap();
        assert_eq!(limited.len(), 1);

        let fetched = repo.get_result(first).await.unwrap();
        assert_eq!(fetched.result.score, 1);
    }
}
