use thiserror::Error;

use crate::config::ExamConfigError;
use crate::grading::GradingError;
use crate::model::QuestionError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Config(#[from] ExamConfigError),
    #[error(transparent)]
    Grading(#[from] GradingError),
}
