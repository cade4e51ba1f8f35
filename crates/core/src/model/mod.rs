mod answers;
mod ids;
mod question;
mod submission;

pub use answers::AnswerMap;
pub use ids::{ParseIdError, QuestionId, ResultId};
pub use question::{AnswerOption, Question, QuestionError, QuestionWithAnswer};
pub use submission::{ExamResult, ExamSubmission, GradedAnswer, SubmittedAnswer};
