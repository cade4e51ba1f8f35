//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::ExamConfigError;
use exam_core::grading::GradingError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by exam gateways (question retrieval and submission).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("no questions available")]
    NoQuestions,
    #[error("exam server responded with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the exam session and its runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    /// `initialize` was called with an empty question set.
    #[error("no questions available")]
    NoQuestions,
    #[error("exam has not been started")]
    NotStarted,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Errors emitted by `ExamHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ExamConfigError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
