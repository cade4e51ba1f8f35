#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod gateway;
pub mod history_service;
pub mod http_gateway;
pub mod sessions;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ExamError, GatewayError, HistoryError};
pub use gateway::{ExamGateway, LocalExamGateway, ResultSummary};
pub use history_service::{ExamHistoryService, HistoryEntry, HistoryStats, Performance};
pub use http_gateway::{HttpExamGateway, HttpGatewayConfig};
pub use sessions::{
    ExamIntent, ExamOutcome, ExamProgress, ExamReport, ExamRunner, ExamSession, ExamTimer,
    SubmitState, TimerEvent,
};
