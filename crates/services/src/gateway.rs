use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use exam_core::grading;
use exam_core::model::{ExamResult, ExamSubmission, Question, QuestionId, ResultId};
use storage::repository::{ExamResultRepository, QuestionRepository, StoredResult};

use crate::error::GatewayError;
use crate::Clock;

/// One row of the exam history, without per-answer detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub id: ResultId,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    #[serde(with = "exam_core::time::utc_timestamp")]
    pub submitted_at: DateTime<Utc>,
}

impl From<&StoredResult> for ResultSummary {
    fn from(stored: &StoredResult) -> Self {
        Self {
            id: stored.id,
            score: stored.result.score,
            total_questions: stored.result.total_questions,
            percentage: stored.result.percentage,
            submitted_at: stored.result.submitted_at,
        }
    }
}

/// Boundary between the exam runner and whatever serves questions and grades
/// submissions.
#[async_trait]
pub trait ExamGateway: Send + Sync {
    /// Draw a question set of at most `limit` questions.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NoQuestions` when nothing is available, or a
    /// transport error.
    async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, GatewayError>;

    /// Grade and record a submission.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the submission was not acknowledged.
    async fn submit(&self, submission: &ExamSubmission) -> Result<ExamResult, GatewayError>;

    /// Past results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` on transport or storage failures.
    async fn history(&self, limit: u32) -> Result<Vec<ResultSummary>, GatewayError>;
}

/// Gateway backed by the local question bank and result history.
#[derive(Clone)]
pub struct LocalExamGateway {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    results: Arc<dyn ExamResultRepository>,
    shuffle: bool,
}

impl LocalExamGateway {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        results: Arc<dyn ExamResultRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            results,
            shuffle: true,
        }
    }

    /// Disable random selection; the lowest ids are drawn instead.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    fn select_ids(&self, mut ids: Vec<QuestionId>, limit: usize) -> Vec<QuestionId> {
        if self.shuffle {
            let mut rng = rng();
            ids.as_mut_slice().shuffle(&mut rng);
        }
        ids.truncate(limit);
        ids
    }
}

#[async_trait]
impl ExamGateway for LocalExamGateway {
    async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, GatewayError> {
        let ids = self.questions.question_ids().await?;
        let ids = self.select_ids(ids, limit as usize);
        if ids.is_empty() {
            return Err(GatewayError::NoQuestions);
        }
        debug!(count = ids.len(), "drew exam questions");
        Ok(self.questions.get_questions(&ids).await?)
    }

    async fn submit(&self, submission: &ExamSubmission) -> Result<ExamResult, GatewayError> {
        let ids: Vec<QuestionId> = submission
            .answers
            .iter()
            .map(|answer| answer.question_id)
            .collect();
        let key = self.questions.answer_key(&ids).await?;
        let result = grading::grade(submission, &key, self.clock.now())?;
        let id = self
            .results
            .append_result(submission.started_at, &result)
            .await?;
        info!(
            result_id = %id,
            score = result.score,
            total = result.total_questions,
            "exam result recorded"
        );
        Ok(result)
    }

    async fn history(&self, limit: u32) -> Result<Vec<ResultSummary>, GatewayError> {
        let stored = self.results.list_results(limit).await?;
        Ok(stored.iter().map(ResultSummary::from).collect())
    }
}
