use thiserror::Error;

/// Total exam time used when nothing else is configured (30 minutes).
pub const DEFAULT_TOTAL_DURATION_SECS: u32 = 1800;

/// Questions drawn per exam when nothing else is configured.
pub const DEFAULT_QUESTION_LIMIT: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamConfigError {
    #[error("total duration must be > 0 seconds")]
    InvalidTotalDuration,

    #[error("question limit must be > 0")]
    InvalidQuestionLimit,
}

/// Validated exam configuration.
///
/// `total_duration_secs` drives both the countdown duration and the initial
/// time remaining of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamConfig {
    total_duration_secs: u32,
    question_limit: u32,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            total_duration_secs: DEFAULT_TOTAL_DURATION_SECS,
            question_limit: DEFAULT_QUESTION_LIMIT,
        }
    }
}

impl ExamConfig {
    /// # Errors
    ///
    /// Returns `ExamConfigError` if either value is zero.
    pub fn new(total_duration_secs: u32, question_limit: u32) -> Result<Self, ExamConfigError> {
        ExamConfigDraft {
            total_duration_secs: Some(total_duration_secs),
            question_limit: Some(question_limit),
        }
        .validate()
    }

    #[must_use]
    pub fn total_duration_secs(&self) -> u32 {
        self.total_duration_secs
    }

    #[must_use]
    pub fn question_limit(&self) -> u32 {
        self.question_limit
    }
}

/// Unvalidated overrides; `None` keeps the default.
#[derive(Debug, Clone, Default)]
pub struct ExamConfigDraft {
    pub total_duration_secs: Option<u32>,
    pub question_limit: Option<u32>,
}

impl ExamConfigDraft {
    /// # Errors
    ///
    /// Returns `ExamConfigError` when an override is zero.
    pub fn validate(self) -> Result<ExamConfig, ExamConfigError> {
        let defaults = ExamConfig::default();
        let total_duration_secs = self
            .total_duration_secs
            .unwrap_or(defaults.total_duration_secs);
        let question_limit = self.question_limit.unwrap_or(defaults.question_limit);

        if total_duration_secs == 0 {
            return Err(ExamConfigError::InvalidTotalDuration);
        }
        if question_limit == 0 {
            return Err(ExamConfigError::InvalidQuestionLimit);
        }

        Ok(ExamConfig {
            total_duration_secs,
            question_limit,
        })
    }
}
