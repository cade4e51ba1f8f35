#![forbid(unsafe_code)]

pub mod config;
pub mod countdown;
pub mod error;
pub mod grading;
pub mod model;
pub mod time;

pub use config::{ExamConfig, ExamConfigDraft, ExamConfigError};
pub use countdown::{Countdown, CountdownState, Tick};
pub use error::Error;
pub use time::Clock;
