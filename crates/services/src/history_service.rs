use std::sync::Arc;

use exam_core::grading::LetterGrade;

use crate::error::HistoryError;
use crate::gateway::{ExamGateway, ResultSummary};

/// Badge shown next to a past result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performance {
    Excellent,
    Good,
    KeepLearning,
}

impl Performance {
    #[must_use]
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Self::Excellent
        } else if percentage >= 60.0 {
            Self::Good
        } else {
            Self::KeepLearning
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::KeepLearning => "Keep learning",
        }
    }
}

/// A past result with its display classification.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub summary: ResultSummary,
    pub grade: LetterGrade,
    pub performance: Performance,
}

impl From<ResultSummary> for HistoryEntry {
    fn from(summary: ResultSummary) -> Self {
        Self {
            grade: LetterGrade::for_percentage(summary.percentage),
            performance: Performance::for_percentage(summary.percentage),
            summary,
        }
    }
}

/// Aggregates over the listed history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    pub attempts: usize,
    /// Mean percentage rounded to a whole number.
    pub average_percentage: f64,
    pub best_percentage: f64,
}

impl HistoryStats {
    /// `None` for an empty history.
    #[must_use]
    pub fn from_entries(entries: &[HistoryEntry]) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        let sum: f64 = entries.iter().map(|e| e.summary.percentage).sum();
        let best = entries
            .iter()
            .map(|e| e.summary.percentage)
            .fold(f64::MIN, f64::max);
        #[allow(clippy::cast_precision_loss)]
        let average = (sum / entries.len() as f64).round();
        Some(Self {
            attempts: entries.len(),
            average_percentage: average,
            best_percentage: best,
        })
    }
}

/// Reads past exam results through the gateway.
#[derive(Clone)]
pub struct ExamHistoryService {
    gateway: Arc<dyn ExamGateway>,
}

impl ExamHistoryService {
    #[must_use]
    pub fn new(gateway: Arc<dyn ExamGateway>) -> Self {
        Self { gateway }
    }

    /// Most recent results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the gateway fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<HistoryEntry>, HistoryError> {
        let summaries = self.gateway.history(limit).await?;
        Ok(summaries.into_iter().map(HistoryEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LocalExamGateway;
    use chrono::Duration;
    use exam_core::model::{
        AnswerOption, ExamSubmission, Question, QuestionId, QuestionWithAnswer, ResultId,
        SubmittedAnswer,
    };
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::repository::Storage;

    fn summary(id: i64, percentage: f64) -> ResultSummary {
        ResultSummary {
            id: ResultId::new(id),
            score: 0,
            total_questions: 10,
            percentage,
            submitted_at: fixed_now() + Duration::minutes(id),
        }
    }

    #[test]
    fn performance_bands() {
        assert_eq!(Performance::for_percentage(80.0), Performance::Excellent);
        assert_eq!(Performance::for_percentage(79.99), Performance::Good);
        assert_eq!(Performance::for_percentage(60.0), Performance::Good);
        assert_eq!(Performance::for_percentage(10.0).label(), "Keep learning");
    }

    #[test]
    fn stats_average_and_best() {
        let entries: Vec<HistoryEntry> = [70.0, 85.5, 40.0]
            .into_iter()
            .zip(1..)
            .map(|(p, id)| summary(id, p).into())
            .collect();
        let stats = HistoryStats::from_entries(&entries).unwrap();
        assert_eq!(stats.attempts, 3);
        assert!((stats.average_percentage - 65.0).abs() < f64::EPSILON);
        assert!((stats.best_percentage - 85.5).abs() < f64::EPSILON);
        assert_eq!(entries[1].grade, LetterGrade::A);

        assert!(HistoryStats::from_entries(&[]).is_none());
    }

    #[tokio::test]
    async fn recent_lists_recorded_results() {
        let storage = Storage::in_memory();
        let question = Question::new(
            QuestionId::new(1),
            "Q1",
            ["a".into(), "b".into(), "c".into(), "d".into()],
        )
        .unwrap();
        storage
            .questions
            .upsert_question(&QuestionWithAnswer::new(question, AnswerOption::C))
            .await
            .unwrap();
        let gateway = Arc::new(LocalExamGateway::new(
            fixed_clock(),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.results),
        ));
        gateway
            .submit(&ExamSubmission {
                answers: vec![SubmittedAnswer {
                    question_id: QuestionId::new(1),
                    selected_answer: AnswerOption::C,
                }],
                started_at: fixed_now(),
            })
            .await
            .unwrap();

        let history = ExamHistoryService::new(gateway);
        let entries = history.recent(5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].grade, LetterGrade::APlus);
        assert_eq!(entries[0].performance, Performance::Excellent);
    }
}
