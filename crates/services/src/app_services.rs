use std::sync::Arc;

use exam_core::{ExamConfig, ExamConfigDraft};
use storage::repository::Storage;

use crate::error::AppServicesError;
use crate::gateway::{ExamGateway, LocalExamGateway};
use crate::history_service::ExamHistoryService;
use crate::http_gateway::{HttpExamGateway, HttpGatewayConfig};
use crate::sessions::ExamRunner;
use crate::Clock;

/// Assembles app-facing services around one exam gateway.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    config: ExamConfig,
    gateway: Arc<dyn ExamGateway>,
    history: Arc<ExamHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the draft is invalid or storage
    /// initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        draft: ExamConfigDraft,
    ) -> Result<Self, AppServicesError> {
        let config = draft.validate()?;
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Build services backed by a remote exam server.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the draft is invalid or the HTTP client
    /// cannot be built.
    pub fn new_http(
        http: HttpGatewayConfig,
        clock: Clock,
        draft: ExamConfigDraft,
    ) -> Result<Self, AppServicesError> {
        let config = draft.validate()?;
        let gateway = HttpExamGateway::new(http)?;
        Ok(Self::from_gateway(Arc::new(gateway), clock, config))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: ExamConfig) -> Self {
        let gateway = LocalExamGateway::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.results),
        );
        Self::from_gateway(Arc::new(gateway), clock, config)
    }

    #[must_use]
    pub fn from_gateway(gateway: Arc<dyn ExamGateway>, clock: Clock, config: ExamConfig) -> Self {
        let history = Arc::new(ExamHistoryService::new(Arc::clone(&gateway)));
        Self {
            clock,
            config,
            gateway,
            history,
        }
    }

    #[must_use]
    pub fn config(&self) -> ExamConfig {
        self.config
    }

    /// A fresh runner for one exam attempt.
    #[must_use]
    pub fn exam_runner(&self) -> ExamRunner {
        ExamRunner::new(self.config, Arc::clone(&self.gateway)).with_clock(self.clock)
    }

    #[must_use]
    pub fn history(&self) -> Arc<ExamHistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn gateway(&self) -> Arc<dyn ExamGateway> {
        Arc::clone(&self.gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::ExamConfigError;
    use exam_core::time::fixed_clock;

    fn http_config() -> HttpGatewayConfig {
        HttpGatewayConfig::from_values(Some("http://127.0.0.1:9".into()), None).unwrap()
    }

    #[test]
    fn zero_duration_draft_is_rejected() {
        let draft = ExamConfigDraft {
            total_duration_secs: Some(0),
            question_limit: None,
        };
        let err = AppServices::new_http(http_config(), fixed_clock(), draft)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AppServicesError::Config(ExamConfigError::InvalidTotalDuration)
        ));
    }

    #[tokio::test]
    async fn zero_question_limit_is_rejected_before_opening_storage() {
        let draft = ExamConfigDraft {
            total_duration_secs: None,
            question_limit: Some(0),
        };
        let err = AppServices::new_sqlite("sqlite::memory:", fixed_clock(), draft)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AppServicesError::Config(ExamConfigError::InvalidQuestionLimit)
        ));
    }

    #[test]
    fn empty_draft_uses_defaults() {
        let services =
            AppServices::new_http(http_config(), fixed_clock(), ExamConfigDraft::default())
                .unwrap();
        assert_eq!(services.config(), ExamConfig::default());
    }
}
