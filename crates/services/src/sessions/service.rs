use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

use exam_core::model::{
    AnswerMap, AnswerOption, ExamSubmission, Question, QuestionId, SubmittedAnswer,
};
use exam_core::time::TimeBand;
use exam_core::{Clock, ExamConfig};

use super::progress::ExamProgress;
use crate::error::ExamError;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one timed exam attempt.
///
/// Single source of truth for questions, answers, position, remaining time
/// and the submitted flag. Once submitted, answers, position and time are
/// frozen: mutators return `false` and leave the state untouched.
///
/// The session never drives time itself; the owner feeds it with
/// [`update_time_remaining`](Self::update_time_remaining) from the timer.
pub struct ExamSession {
    clock: Clock,
    total_duration: u32,
    questions: Vec<Question>,
    answers: AnswerMap,
    current: usize,
    time_remaining: u32,
    started_at: Option<DateTime<Utc>>,
    submitted: bool,
}

impl ExamSession {
    /// Create an empty, uninitialized session.
    #[must_use]
    pub fn new(config: &ExamConfig) -> Self {
        Self {
            clock: Clock::default(),
            total_duration: config.total_duration_secs(),
            questions: Vec::new(),
            answers: AnswerMap::new(),
            current: 0,
            time_remaining: config.total_duration_secs(),
            started_at: None,
            submitted: false,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Load a question set and start a fresh attempt.
    ///
    /// Clears answers, moves to the first question, restores the full time
    /// budget and captures `started_at` from the session clock.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NoQuestions` if `questions` is empty; the session
    /// is left as it was.
    pub fn initialize(&mut self, questions: Vec<Question>) -> Result<(), ExamError> {
        if questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }

        self.questions = questions;
        self.answers.clear();
        self.current = 0;
        self.time_remaining = self.total_duration;
        self.started_at = Some(self.clock.now());
        self.submitted = false;
        Ok(())
    }

    /// Return to the empty pre-initialization state.
    ///
    /// Does not stop any timer; the owner is responsible for that.
    pub fn reset(&mut self) {
        self.questions.clear();
        self.answers.clear();
        self.current = 0;
        self.time_remaining = self.total_duration;
        self.started_at = None;
        self.submitted = false;
    }

    //
    // ─── QUERIES ──────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn total_duration(&self) -> u32 {
        self.total_duration
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.started_at.is_some()
    }

    #[must_use]
    pub fn is_time_expired(&self) -> bool {
        self.is_initialized() && self.time_remaining == 0
    }

    /// Number of distinct questions with a selected option.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.questions.len().saturating_sub(self.answered_count())
    }

    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.answers.contains(question_id)
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<AnswerOption> {
        self.answers.get(question_id)
    }

    /// Answered share in whole percent, rounded down; 0 without questions.
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        let total = self.questions.len();
        if total == 0 {
            return 0;
        }
        let percent = (100 * self.answered_count() / total).min(100);
        u32::try_from(percent).unwrap_or(100)
    }

    /// Unrounded answered share in percent, for progress bars.
    #[must_use]
    pub fn progress_ratio(&self) -> f64 {
        let total = self.questions.len();
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.answered_count() as f64 / total as f64 * 100.0;
        ratio.min(100.0)
    }

    /// Snapshot of everything the presentation layer reads per render.
    #[must_use]
    pub fn progress(&self) -> ExamProgress {
        ExamProgress {
            current_index: self.current,
            total: self.total_questions(),
            answered: self.answered_count(),
            percent: self.progress_percent(),
            time_remaining: self.time_remaining,
            time_band: TimeBand::for_remaining(self.time_remaining, self.total_duration),
            is_submitted: self.submitted,
        }
    }

    /// Flatten the answers into the payload expected by the grader.
    ///
    /// Answers are ordered by question id. Returns `None` before
    /// `initialize`.
    #[must_use]
    pub fn to_submission(&self) -> Option<ExamSubmission> {
        let started_at = self.started_at?;
        let mut answers: Vec<SubmittedAnswer> = self
            .answers
            .iter()
            .map(|(question_id, selected_answer)| SubmittedAnswer {
                question_id,
                selected_answer,
            })
            .collect();
        answers.sort_by_key(|answer| answer.question_id);
        Some(ExamSubmission {
            answers,
            started_at,
        })
    }

    //
    // ─── MUTATIONS ────────────────────────────────────────────────────────────
    //

    /// Select `option` for `question_id`; the last selection wins.
    ///
    /// Returns `false` if the session is frozen.
    pub fn set_answer(&mut self, question_id: QuestionId, option: AnswerOption) -> bool {
        if self.rejects_mutation("set_answer") {
            return false;
        }
        self.answers.set(question_id, option);
        true
    }

    /// Jump to `index` if it is a valid position; anything else is ignored.
    pub fn go_to_question(&mut self, index: usize) -> bool {
        if self.rejects_mutation("go_to_question") {
            return false;
        }
        if index >= self.questions.len() {
            debug!(index, total = self.questions.len(), "ignoring out-of-range navigation");
            return false;
        }
        self.current = index;
        true
    }

    /// Move forward one question; no-op on the last one.
    pub fn next_question(&mut self) -> bool {
        if self.current + 1 >= self.questions.len() {
            return false;
        }
        self.go_to_question(self.current + 1)
    }

    /// Move back one question; no-op on the first one.
    pub fn previous_question(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.go_to_question(self.current - 1)
    }

    /// Apply a remaining-time value coming from the timer.
    ///
    /// Values above the total duration are clamped. Remaining time never
    /// grows within an attempt, so larger values than the current one are
    /// rejected, as is any update after submission.
    pub fn update_time_remaining(&mut self, seconds: u32) -> bool {
        if self.rejects_mutation("update_time_remaining") {
            return false;
        }
        let seconds = seconds.min(self.total_duration);
        if seconds > self.time_remaining {
            debug!(
                seconds,
                current = self.time_remaining,
                "ignoring time update that would increase remaining time"
            );
            return false;
        }
        self.time_remaining = seconds;
        true
    }

    /// Freeze the session. Returns `true` only on the first call.
    pub fn submit(&mut self) -> bool {
        if self.submitted {
            return false;
        }
        self.submitted = true;
        true
    }

    fn rejects_mutation(&self, operation: &'static str) -> bool {
        if self.submitted {
            debug!(operation, "ignoring mutation of a submitted exam");
        }
        self.submitted
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("questions_len", &self.questions.len())
            .field("answered", &self.answers.len())
            .field("current", &self.current)
            .field("time_remaining", &self.time_remaining)
            .field("started_at", &self.started_at)
            .field("submitted", &self.submitted)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
