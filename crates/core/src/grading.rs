use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AnswerOption, ExamResult, ExamSubmission, GradedAnswer, QuestionId};

/// Correct option per question.
pub type AnswerKey = HashMap<QuestionId, AnswerOption>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradingError {
    #[error("question {0} is not in the answer key")]
    UnknownQuestion(QuestionId),

    #[error("too many answers in a single submission: {len}")]
    TooManyAnswers { len: usize },
}

/// Scores a submission against `key`.
///
/// Only submitted answers count towards the total; unanswered questions are
/// not part of the result. The percentage is rounded to two decimals.
///
/// # Errors
///
/// Returns `GradingError::UnknownQuestion` if an answer refers to a question
/// missing from the key.
pub fn grade(
    submission: &ExamSubmission,
    key: &AnswerKey,
    submitted_at: DateTime<Utc>,
) -> Result<ExamResult, GradingError> {
    let total_questions = u32::try_from(submission.answers.len()).map_err(|_| {
        GradingError::TooManyAnswers {
            len: submission.answers.len(),
        }
    })?;

    let mut score = 0_u32;
    let mut answers = Vec::with_capacity(submission.answers.len());
    for answer in &submission.answers {
        let correct_answer = key
            .get(&answer.question_id)
            .copied()
            .ok_or(GradingError::UnknownQuestion(answer.question_id))?;
        let is_correct = correct_answer == answer.selected_answer;
        if is_correct {
            score += 1;
        }
        answers.push(GradedAnswer {
            question_id: answer.question_id,
            selected_answer: answer.selected_answer,
            correct_answer,
            is_correct,
        });
    }

    Ok(ExamResult {
        score,
        total_questions,
        percentage: percentage(score, total_questions),
        submitted_at,
        answers,
    })
}

/// `score / total` as a percentage rounded to two decimals; 0 for an empty total.
#[must_use]
pub fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = f64::from(score) / f64::from(total) * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Letter grade shown next to a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterGrade {
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    #[must_use]
    pub fn for_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 90.0 => Self::APlus,
            p if p >= 80.0 => Self::A,
            p if p >= 70.0 => Self::B,
            p if p >= 60.0 => Self::C,
            p if p >= 50.0 => Self::D,
            _ => Self::F,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }

    /// Short message shown next to the score.
    #[must_use]
    pub fn praise(self) -> &'static str {
        match self {
            Self::APlus => "Outstanding!",
            Self::A => "Excellent work!",
            Self::B => "Good job!",
            Self::C => "Well done!",
            Self::D | Self::F => "Keep practicing!",
        }
    }
}
