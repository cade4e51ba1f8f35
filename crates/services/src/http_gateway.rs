use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use exam_core::model::{ExamResult, ExamSubmission, Question};

use crate::error::GatewayError;
use crate::gateway::{ExamGateway, ResultSummary};

/// Upper bound on one request, connect through body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl HttpGatewayConfig {
    /// Reads `EXAM_SERVER_URL` and the optional `EXAM_TOKEN`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_values(env::var("EXAM_SERVER_URL").ok(), env::var("EXAM_TOKEN").ok())
    }

    #[must_use]
    pub fn from_values(base_url: Option<String>, token: Option<String>) -> Option<Self> {
        let base_url = base_url?;
        if base_url.trim().is_empty() {
            return None;
        }
        let token = token.filter(|token| !token.trim().is_empty());
        Some(Self {
            base_url,
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/exam/{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Gateway talking to a remote exam server.
///
/// `GET /exam/start` returns the question set, `POST /exam/submit` grades a
/// submission and `GET /exam/results` lists past results.
#[derive(Clone)]
pub struct HttpExamGateway {
    client: Client,
    config: HttpGatewayConfig,
}

impl HttpExamGateway {
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &HttpGatewayConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(GatewayError::HttpStatus(status))
    }
}

#[async_trait]
impl ExamGateway for HttpExamGateway {
    async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, GatewayError> {
        let url = self.config.endpoint("start");
        debug!(%url, "fetching exam questions");
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NoQuestions);
        }
        let mut questions: Vec<Question> = check_status(response)?.json().await?;
        questions.truncate(limit as usize);
        if questions.is_empty() {
            return Err(GatewayError::NoQuestions);
        }
        Ok(questions)
    }

    async fn submit(&self, submission: &ExamSubmission) -> Result<ExamResult, GatewayError> {
        let url = self.config.endpoint("submit");
        debug!(%url, answers = submission.answers.len(), "submitting exam");
        let response = self
            .authorize(self.client.post(url))
            .json(submission)
            .send()
            .await?;
        Ok(check_status(response)?.json().await?)
    }

    async fn history(&self, limit: u32) -> Result<Vec<ResultSummary>, GatewayError> {
        let url = self.config.endpoint("results");
        let response = self.authorize(self.client.get(url)).send().await?;
        let mut results: Vec<ResultSummary> = check_status(response)?.json().await?;
        results.truncate(limit as usize);
        Ok(results)
    }
}
