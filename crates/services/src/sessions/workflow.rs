use std::sync::Arc;

use tracing::{debug, info, warn};

use exam_core::model::{AnswerOption, ExamResult};
use exam_core::{Clock, ExamConfig};

use super::service::ExamSession;
use super::timer::{ExamTimer, TimerEvent};
use crate::error::ExamError;
use crate::gateway::ExamGateway;

/// User action forwarded by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamIntent {
    /// Answer the current question.
    Select(AnswerOption),
    Next,
    Previous,
    GoTo(usize),
    /// Manual submit request; may require confirmation.
    Submit,
    ConfirmSubmit,
    CancelSubmit,
}

/// Where the runner stands in the submission protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    /// A manual submit with unanswered questions is waiting for the user.
    AwaitingConfirmation,
    /// The last submission was not acknowledged; `auto` records who started it.
    Failed { auto: bool },
    Done,
}

/// Graded result plus how the exam ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamReport {
    pub result: ExamResult,
    /// `true` when time ran out and the exam was submitted without the user.
    pub auto_submitted: bool,
}

/// What the presentation layer should do after an intent or timer event.
#[derive(Debug, Clone, PartialEq)]
pub enum ExamOutcome {
    Continue,
    /// The intent had no effect.
    Ignored,
    ConfirmationRequired { answered: usize, total: usize },
    Submitted(ExamReport),
}

/// Coordinates one exam attempt: session state, countdown and submission.
///
/// All session mutations run on the caller's task through `&mut self`, so a
/// submission can never overlap with a tick or another submission.
pub struct ExamRunner {
    config: ExamConfig,
    gateway: Arc<dyn ExamGateway>,
    session: ExamSession,
    timer: ExamTimer,
    submit_state: SubmitState,
}

impl ExamRunner {
    #[must_use]
    pub fn new(config: ExamConfig, gateway: Arc<dyn ExamGateway>) -> Self {
        Self {
            config,
            gateway,
            session: ExamSession::new(&config),
            timer: ExamTimer::new(config.total_duration_secs()),
            submit_state: SubmitState::Idle,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.session = self.session.with_clock(clock);
        self
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    #[must_use]
    pub fn timer(&self) -> &ExamTimer {
        &self.timer
    }

    #[must_use]
    pub fn submit_state(&self) -> SubmitState {
        self.submit_state
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    /// Fetch a question set, initialize the session and start the countdown.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Gateway` if questions cannot be fetched and
    /// `ExamError::NoQuestions` if the gateway returned none.
    pub async fn start(&mut self) -> Result<(), ExamError> {
        let questions = self
            .gateway
            .fetch_questions(self.config.question_limit())
            .await?;
        self.session.initialize(questions)?;
        self.timer.reset();
        self.timer.start();
        self.submit_state = SubmitState::Idle;
        info!(
            questions = self.session.total_questions(),
            duration_secs = self.config.total_duration_secs(),
            "exam started"
        );
        Ok(())
    }

    /// Wait for the next countdown event. Pending while the timer is stopped.
    pub async fn next_event(&mut self) -> TimerEvent {
        self.timer.next_event().await
    }

    /// Apply a countdown event; completion auto-submits without confirmation.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Gateway` if the auto-submission was not
    /// acknowledged. The session stays unsubmitted and
    /// [`retry_submit`](Self::retry_submit) re-sends it.
    pub async fn on_timer_event(&mut self, event: TimerEvent) -> Result<ExamOutcome, ExamError> {
        match event {
            TimerEvent::Tick { remaining } => {
                if self.session.update_time_remaining(remaining) {
                    Ok(ExamOutcome::Continue)
                } else {
                    Ok(ExamOutcome::Ignored)
                }
            }
            TimerEvent::Completed => {
                info!("time expired, submitting exam");
                self.submit(true).await
            }
        }
    }

    /// Apply a user intent.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::NotStarted` for a submission before `start`, and
    /// `ExamError::Gateway` if a submission was not acknowledged.
    pub async fn handle(&mut self, intent: ExamIntent) -> Result<ExamOutcome, ExamError> {
        if self.submit_state == SubmitState::Done {
            debug!(?intent, "exam already submitted");
            return Ok(ExamOutcome::Ignored);
        }

        match intent {
            ExamIntent::Submit => self.request_submit().await,
            ExamIntent::ConfirmSubmit => {
                if self.submit_state != SubmitState::AwaitingConfirmation {
                    return Ok(ExamOutcome::Ignored);
                }
                self.submit(false).await
            }
            ExamIntent::CancelSubmit => {
                if self.submit_state != SubmitState::AwaitingConfirmation {
                    return Ok(ExamOutcome::Ignored);
                }
                self.submit_state = SubmitState::Idle;
                Ok(ExamOutcome::Continue)
            }
            ExamIntent::Select(_)
            | ExamIntent::Next
            | ExamIntent::Previous
            | ExamIntent::GoTo(_) => Ok(self.edit(intent)),
        }
    }

    /// Re-send a submission that was not acknowledged.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Gateway` if the transport fails again.
    pub async fn retry_submit(&mut self) -> Result<ExamOutcome, ExamError> {
        match self.submit_state {
            SubmitState::Failed { auto } => self.submit(auto).await,
            _ => Ok(ExamOutcome::Ignored),
        }
    }

    /// Stop the countdown and drop the attempt.
    pub fn abandon(&mut self) {
        self.timer.reset();
        self.session.reset();
        self.submit_state = SubmitState::Idle;
    }

    fn edit(&mut self, intent: ExamIntent) -> ExamOutcome {
        if self.session.is_time_expired() {
            debug!(?intent, "time expired, waiting for submission");
            return ExamOutcome::Ignored;
        }
        if self.submit_state == SubmitState::AwaitingConfirmation {
            self.submit_state = SubmitState::Idle;
        }

        let applied = match intent {
            ExamIntent::Select(option) => match self.session.current_question() {
                Some(question) => {
                    let id = question.id();
                    self.session.set_answer(id, option)
                }
                None => false,
            },
            ExamIntent::Next => self.session.next_question(),
            ExamIntent::Previous => self.session.previous_question(),
            ExamIntent::GoTo(index) => self.session.go_to_question(index),
            _ => false,
        };

        if applied {
            ExamOutcome::Continue
        } else {
            ExamOutcome::Ignored
        }
    }

    async fn request_submit(&mut self) -> Result<ExamOutcome, ExamError> {
        if let SubmitState::Failed { auto: true } = self.submit_state {
            return self.submit(true).await;
        }
        if !self.session.is_initialized() {
            return Err(ExamError::NotStarted);
        }

        let answered = self.session.answered_count();
        let total = self.session.total_questions();
        if answered < total {
            self.submit_state = SubmitState::AwaitingConfirmation;
            return Ok(ExamOutcome::ConfirmationRequired { answered, total });
        }
        self.submit(false).await
    }

    async fn submit(&mut self, auto: bool) -> Result<ExamOutcome, ExamError> {
        if self.session.is_submitted() {
            return Ok(ExamOutcome::Ignored);
        }
        let submission = self.session.to_submission().ok_or(ExamError::NotStarted)?;

        // The countdown keeps running while the request is in flight; pulses
        // queued meanwhile are applied on the next `next_event`.
        match self.gateway.submit(&submission).await {
            Ok(result) => {
                self.timer.stop();
                self.session.submit();
                self.submit_state = SubmitState::Done;
                info!(
                    auto_submitted = auto,
                    score = result.score,
                    total = result.total_questions,
                    "exam submitted"
                );
                Ok(ExamOutcome::Submitted(ExamReport {
                    result,
                    auto_submitted: auto,
                }))
            }
            Err(err) => {
                warn!(error = %err, auto_submitted = auto, "exam submission failed");
                self.submit_state = SubmitState::Failed { auto };
                Err(err.into())
            }
        }
    }
}

impl std::fmt::Debug for ExamRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamRunner")
            .field("session", &self.session)
            .field("timer", &self.timer)
            .field("submit_state", &self.submit_state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use exam_core::grading::{self, AnswerKey};
    use exam_core::model::{ExamSubmission, Question, QuestionId};
    use exam_core::time::{fixed_clock, fixed_now};

    use crate::error::GatewayError;
    use crate::gateway::ResultSummary;

    /// Grades against a fixed key; can be told to fail the next submissions.
    struct ScriptedGateway {
        questions: Vec<Question>,
        key: AnswerKey,
        failures_left: Mutex<u32>,
        submissions: Mutex<Vec<ExamSubmission>>,
        latency: Duration,
    }

    impl ScriptedGateway {
        fn new(count: u64) -> Self {
            let questions = (1..=count)
                .map(|id| {
                    Question::new(
                        QuestionId::new(id),
                        format!("Q{id}"),
                        ["a".into(), "b".into(), "c".into(), "d".into()],
                    )
                    .unwrap()
                })
                .collect();
            let key = (1..=count)
                .map(|id| (QuestionId::new(id), AnswerOption::A))
                .collect();
            Self {
                questions,
                key,
                failures_left: Mutex::new(0),
                submissions: Mutex::new(Vec::new()),
                latency: Duration::ZERO,
            }
        }

        fn slow(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn failing(self, times: u32) -> Self {
            *self.failures_left.lock().unwrap() = times;
            self
        }

        fn submission_count(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExamGateway for ScriptedGateway {
        async fn fetch_questions(&self, limit: u32) -> Result<Vec<Question>, GatewayError> {
            if self.questions.is_empty() {
                return Err(GatewayError::NoQuestions);
            }
            Ok(self.questions.iter().take(limit as usize).cloned().collect())
        }

        async fn submit(&self, submission: &ExamSubmission) -> Result<ExamResult, GatewayError> {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.submissions.lock().unwrap().push(submission.clone());
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(GatewayError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY));
            }
            Ok(grading::grade(submission, &self.key, fixed_now())?)
        }

        async fn history(&self, _limit: u32) -> Result<Vec<ResultSummary>, GatewayError> {
            Ok(Vec::new())
        }
    }

    async fn started_runner(gateway: Arc<ScriptedGateway>, duration: u32) -> ExamRunner {
        let config = ExamConfig::new(duration, 10).unwrap();
        let mut runner = ExamRunner::new(config, gateway).with_clock(fixed_clock());
        runner.start().await.unwrap();
        runner
    }

    #[tokio::test(start_paused = true)]
    async fn start_loads_questions_and_runs_timer() {
        let gateway = Arc::new(ScriptedGateway::new(3));
        let runner = started_runner(gateway, 60).await;

        assert_eq!(runner.session().total_questions(), 3);
        assert_eq!(runner.session().started_at(), Some(fixed_now()));
        assert!(runner.timer().is_running());
        assert_eq!(runner.submit_state(), SubmitState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_questions_fails() {
        let gateway = Arc::new(ScriptedGateway::new(0));
        let mut runner = ExamRunner::new(ExamConfig::default(), gateway);
        let err = runner.start().await.unwrap_err();
        assert!(matches!(err, ExamError::Gateway(GatewayError::NoQuestions)));
        assert!(!runner.timer().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_before_start_is_rejected() {
        let gateway = Arc::new(ScriptedGateway::new(2));
        let mut runner = ExamRunner::new(ExamConfig::default(), gateway);
        let err = runner.handle(ExamIntent::Submit).await.unwrap_err();
        assert!(matches!(err, ExamError::NotStarted));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_with_gaps_requires_confirmation() {
        let gateway = Arc::new(ScriptedGateway::new(3));
        let mut runner = started_runner(Arc::clone(&gateway), 60).await;

        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();
        let outcome = runner.handle(ExamIntent::Submit).await.unwrap();
        assert_eq!(
            outcome,
            ExamOutcome::ConfirmationRequired {
                answered: 1,
                total: 3
            }
        );
        assert_eq!(gateway.submission_count(), 0);

        let outcome = runner.handle(ExamIntent::CancelSubmit).await.unwrap();
        assert_eq!(outcome, ExamOutcome::Continue);
        assert_eq!(
            runner.handle(ExamIntent::ConfirmSubmit).await.unwrap(),
            ExamOutcome::Ignored
        );

        runner.handle(ExamIntent::Submit).await.unwrap();
        let ExamOutcome::Submitted(report) = runner.handle(ExamIntent::ConfirmSubmit).await.unwrap()
        else {
            panic!("expected submission");
        };
        assert!(!report.auto_submitted);
        assert_eq!(report.result.score, 1);
        assert!(runner.session().is_submitted());
        assert!(!runner.timer().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn complete_manual_submit_skips_confirmation() {
        let gateway = Arc::new(ScriptedGateway::new(2));
        let mut runner = started_runner(Arc::clone(&gateway), 60).await;

        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();
        runner.handle(ExamIntent::Next).await.unwrap();
        runner.handle(ExamIntent::Select(AnswerOption::B)).await.unwrap();

        let outcome = runner.handle(ExamIntent::Submit).await.unwrap();
        assert!(matches!(outcome, ExamOutcome::Submitted(ref r) if !r.auto_submitted));
        assert_eq!(gateway.submission_count(), 1);

        // Further intents and submissions are no-ops.
        assert_eq!(
            runner.handle(ExamIntent::Submit).await.unwrap(),
            ExamOutcome::Ignored
        );
        assert_eq!(
            runner.handle(ExamIntent::Previous).await.unwrap(),
            ExamOutcome::Ignored
        );
        assert_eq!(gateway.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_auto_submits_without_confirmation() {
        let gateway = Arc::new(ScriptedGateway::new(3));
        let mut runner = started_runner(Arc::clone(&gateway), 3).await;

        let mut seen = Vec::new();
        let report = loop {
            let event = runner.next_event().await;
            match runner.on_timer_event(event).await.unwrap() {
                ExamOutcome::Continue => seen.push(runner.session().time_remaining()),
                ExamOutcome::Submitted(report) => break report,
                other => panic!("unexpected outcome: {other:?}"),
            }
        };

        assert_eq!(seen, vec![2, 1, 0]);
        assert!(report.auto_submitted);
        assert_eq!(report.result.total_questions, 0);
        assert!(runner.session().is_submitted());
        assert_eq!(gateway.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_during_confirmation_still_auto_submits() {
        let gateway = Arc::new(ScriptedGateway::new(2));
        let mut runner = started_runner(Arc::clone(&gateway), 1).await;

        let outcome = runner.handle(ExamIntent::Submit).await.unwrap();
        assert!(matches!(outcome, ExamOutcome::ConfirmationRequired { .. }));

        let tick = runner.next_event().await;
        runner.on_timer_event(tick).await.unwrap();
        let done = runner.next_event().await;
        let outcome = runner.on_timer_event(done).await.unwrap();
        assert!(matches!(outcome, ExamOutcome::Submitted(ref r) if r.auto_submitted));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_silences_the_timer() {
        let gateway = Arc::new(ScriptedGateway::new(1));
        let mut runner = started_runner(Arc::clone(&gateway), 5).await;
        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();
        runner.handle(ExamIntent::Submit).await.unwrap();

        let waited = tokio::time::timeout(Duration::from_secs(10), runner.next_event()).await;
        assert!(waited.is_err());
        assert_eq!(gateway.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_manual_submit_keeps_exam_open() {
        let gateway = Arc::new(ScriptedGateway::new(1).failing(1));
        let mut runner = started_runner(Arc::clone(&gateway), 30).await;
        runner.handle(ExamIntent::Select(AnswerOption::C)).await.unwrap();

        let err = runner.handle(ExamIntent::Submit).await.unwrap_err();
        assert!(matches!(err, ExamError::Gateway(GatewayError::HttpStatus(_))));
        assert!(!runner.session().is_submitted());
        assert_eq!(runner.submit_state(), SubmitState::Failed { auto: false });
        assert!(runner.timer().is_running());
        assert_eq!(runner.timer().remaining(), 30);

        // Still editable; a new submit goes through.
        assert_eq!(
            runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap(),
            ExamOutcome::Continue
        );
        let outcome = runner.handle(ExamIntent::Submit).await.unwrap();
        assert!(matches!(outcome, ExamOutcome::Submitted(ref r) if r.result.score == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_auto_submit_can_be_retried() {
        let gateway = Arc::new(ScriptedGateway::new(2).failing(1));
        let mut runner = started_runner(Arc::clone(&gateway), 1).await;
        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();

        let tick = runner.next_event().await;
        runner.on_timer_event(tick).await.unwrap();
        let done = runner.next_event().await;
        assert!(runner.on_timer_event(done).await.is_err());
        assert_eq!(runner.submit_state(), SubmitState::Failed { auto: true });
        assert!(!runner.session().is_submitted());

        // Expired: edits are refused while the retry is pending.
        assert_eq!(
            runner.handle(ExamIntent::Select(AnswerOption::B)).await.unwrap(),
            ExamOutcome::Ignored
        );
        assert_eq!(
            runner.handle(ExamIntent::Next).await.unwrap(),
            ExamOutcome::Ignored
        );

        let ExamOutcome::Submitted(report) = runner.retry_submit().await.unwrap() else {
            panic!("expected submission");
        };
        assert!(report.auto_submitted);
        assert_eq!(report.result.score, 1);
        assert_eq!(gateway.submission_count(), 2);
        assert_eq!(
            runner.retry_submit().await.unwrap(),
            ExamOutcome::Ignored
        );
    }

    /// Applies every event already due, leaving the runner waiting on the next second.
    async fn drain_due_events(runner: &mut ExamRunner) -> Vec<ExamOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) =
            tokio::time::timeout(Duration::from_millis(10), runner.next_event()).await
        {
            match runner.on_timer_event(event).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
        outcomes
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_keeps_running_while_a_failing_submit_is_in_flight() {
        let gateway = Arc::new(
            ScriptedGateway::new(1)
                .failing(1)
                .slow(Duration::from_secs(20)),
        );
        let mut runner = started_runner(Arc::clone(&gateway), 30).await;
        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();

        assert!(runner.handle(ExamIntent::Submit).await.is_err());
        assert_eq!(runner.submit_state(), SubmitState::Failed { auto: false });
        assert!(runner.timer().is_running());

        let outcomes = drain_due_events(&mut runner).await;
        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(|o| *o == ExamOutcome::Continue));
        assert_eq!(runner.session().time_remaining(), 10);
        assert_eq!(runner.timer().remaining(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_during_a_stalled_submit_auto_submits_afterwards() {
        let gateway = Arc::new(
            ScriptedGateway::new(1)
                .failing(1)
                .slow(Duration::from_secs(8)),
        );
        let mut runner = started_runner(Arc::clone(&gateway), 5).await;
        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();
        assert!(runner.handle(ExamIntent::Submit).await.is_err());

        let outcomes = drain_due_events(&mut runner).await;
        let Some(ExamOutcome::Submitted(report)) = outcomes.last() else {
            panic!("expected an auto-submission, got {outcomes:?}");
        };
        assert!(report.auto_submitted);
        assert_eq!(report.result.score, 1);
        assert_eq!(outcomes.len(), 6);
        assert_eq!(runner.session().time_remaining(), 0);
        assert_eq!(gateway.submission_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_queued_during_a_successful_submit_are_dropped() {
        let gateway = Arc::new(ScriptedGateway::new(1).slow(Duration::from_secs(5)));
        let mut runner = started_runner(Arc::clone(&gateway), 30).await;
        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();

        let outcome = runner.handle(ExamIntent::Submit).await.unwrap();
        assert!(matches!(outcome, ExamOutcome::Submitted(ref r) if !r.auto_submitted));
        assert!(!runner.timer().is_running());

        let waited = tokio::time::timeout(Duration::from_secs(60), runner.next_event()).await;
        assert!(waited.is_err());

        // Late events from a caller that raced the submit change nothing.
        assert_eq!(
            runner
                .on_timer_event(TimerEvent::Tick { remaining: 24 })
                .await
                .unwrap(),
            ExamOutcome::Ignored
        );
        assert_eq!(
            runner.on_timer_event(TimerEvent::Completed).await.unwrap(),
            ExamOutcome::Ignored
        );
        assert_eq!(runner.session().time_remaining(), 30);
        assert_eq!(gateway.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_after_failed_manual_submit_is_automatic() {
        let gateway = Arc::new(ScriptedGateway::new(2).failing(1));
        let mut runner = started_runner(Arc::clone(&gateway), 3).await;
        runner.handle(ExamIntent::Select(AnswerOption::A)).await.unwrap();

        let outcome = runner.handle(ExamIntent::Submit).await.unwrap();
        assert!(matches!(outcome, ExamOutcome::ConfirmationRequired { .. }));
        assert!(runner.handle(ExamIntent::ConfirmSubmit).await.is_err());
        assert_eq!(runner.submit_state(), SubmitState::Failed { auto: false });

        let report = loop {
            let event = runner.next_event().await;
            match runner.on_timer_event(event).await.unwrap() {
                ExamOutcome::Continue => {}
                ExamOutcome::Submitted(report) => break report,
                other => panic!("unexpected outcome: {other:?}"),
            }
        };
        assert!(report.auto_submitted);
        assert_eq!(report.result.score, 1);
        assert_eq!(runner.submit_state(), SubmitState::Done);
        assert_eq!(gateway.submission_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_stops_timer_and_clears_session() {
        let gateway = Arc::new(ScriptedGateway::new(2));
        let mut runner = started_runner(gateway, 30).await;
        runner.abandon();

        assert!(!runner.timer().is_running());
        assert!(!runner.session().is_initialized());
        assert_eq!(runner.timer().remaining(), 30);
    }
}
