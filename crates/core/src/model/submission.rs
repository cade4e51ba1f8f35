use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::question::AnswerOption;

/// One selected answer as sent to the grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_answer: AnswerOption,
}

/// Payload handed to the submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSubmission {
    pub answers: Vec<SubmittedAnswer>,
    pub started_at: DateTime<Utc>,
}

/// Per-question outcome in a graded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_id: QuestionId,
    pub selected_answer: AnswerOption,
    pub correct_answer: AnswerOption,
    pub is_correct: bool,
}

/// Scored result returned by the grader. Display-only for the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    #[serde(with = "crate::time::utc_timestamp")]
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<GradedAnswer>,
}

impl ExamResult {
    /// Number of graded answers that were wrong.
    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.total_questions.saturating_sub(self.score)
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.score == self.total_questions
    }
}
