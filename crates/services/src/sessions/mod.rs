mod progress;
mod service;
mod timer;
mod workflow;

// Public API of the exam session subsystem.
pub use crate::error::ExamError;
pub use progress::ExamProgress;
pub use service::ExamSession;
pub use timer::{ExamTimer, TimerEvent};
pub use workflow::{ExamIntent, ExamOutcome, ExamReport, ExamRunner, SubmitState};
