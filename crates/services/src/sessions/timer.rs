use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use exam_core::{Countdown, CountdownState};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const PULSE_BUFFER: usize = 16;

/// Event emitted by a running [`ExamTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed; carries the remaining seconds after the decrement.
    Tick { remaining: u32 },
    /// Remaining time reached zero. Delivered once per run, after `Tick { remaining: 0 }`.
    Completed,
}

#[derive(Debug, Clone, Copy)]
struct TimerPulse {
    run: u64,
}

/// Tokio-driven wrapper around [`Countdown`].
///
/// A background task sends one pulse per elapsed second; the owner turns
/// pulses into [`TimerEvent`]s with [`next_event`](Self::next_event). Every
/// start or resume begins a new run, and pulses tagged with an older run are
/// discarded, so nothing is delivered after `stop` returns even if a pulse
/// was already queued.
///
/// Dropping the timer aborts the background task.
pub struct ExamTimer {
    countdown: Countdown,
    period: Duration,
    run: u64,
    pulses_tx: mpsc::Sender<TimerPulse>,
    pulses_rx: mpsc::Receiver<TimerPulse>,
    task: Option<JoinHandle<()>>,
    completion_pending: bool,
}

impl ExamTimer {
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        let (pulses_tx, pulses_rx) = mpsc::channel(PULSE_BUFFER);
        Self {
            countdown: Countdown::new(duration_secs),
            period: TICK_PERIOD,
            run: 0,
            pulses_tx,
            pulses_rx,
            task: None,
            completion_pending: false,
        }
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.countdown.duration()
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    #[must_use]
    pub fn state(&self) -> CountdownState {
        self.countdown.state()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    #[must_use]
    pub fn percentage_left(&self) -> f64 {
        self.countdown.percentage_left()
    }

    /// Start counting down. No-op while running or when nothing is left.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&mut self) -> bool {
        if !self.countdown.start() {
            return false;
        }
        self.spawn_run();
        info!(remaining = self.remaining(), "exam timer started");
        true
    }

    /// Stop counting. No tick is delivered after this returns.
    pub fn stop(&mut self) -> bool {
        if !self.countdown.stop() {
            return false;
        }
        self.cancel_run();
        debug!(remaining = self.remaining(), "exam timer stopped");
        true
    }

    pub fn pause(&mut self) -> bool {
        self.stop()
    }

    /// Continue a stopped timer. The next tick fires one full period later.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn resume(&mut self) -> bool {
        if !self.countdown.resume() {
            return false;
        }
        self.spawn_run();
        debug!(remaining = self.remaining(), "exam timer resumed");
        true
    }

    /// Stop if running and restore the full duration. Valid from any state.
    pub fn reset(&mut self) {
        self.cancel_run();
        self.countdown.reset();
        self.completion_pending = false;
    }

    /// Wait for the next event of the current run.
    ///
    /// Pending forever while the timer is not running, so it can sit in a
    /// `tokio::select!` next to other sources. Cancel-safe: dropping the
    /// future before it resolves loses no event.
    pub async fn next_event(&mut self) -> TimerEvent {
        loop {
            if let Some(event) = self.take_completion() {
                return event;
            }
            if self.task.is_none() {
                std::future::pending::<()>().await;
            }
            // The timer keeps a sender alive, so the channel never closes.
            let Some(pulse) = self.pulses_rx.recv().await else {
                std::future::pending::<()>().await;
                continue;
            };
            if let Some(event) = self.apply(pulse) {
                return event;
            }
        }
    }

    /// Non-blocking variant of [`next_event`](Self::next_event).
    pub fn try_next_event(&mut self) -> Option<TimerEvent> {
        if let Some(event) = self.take_completion() {
            return Some(event);
        }
        while let Ok(pulse) = self.pulses_rx.try_recv() {
            if let Some(event) = self.apply(pulse) {
                return Some(event);
            }
        }
        None
    }

    fn take_completion(&mut self) -> Option<TimerEvent> {
        if !self.completion_pending {
            return None;
        }
        self.completion_pending = false;
        info!("exam timer expired");
        Some(TimerEvent::Completed)
    }

    fn apply(&mut self, pulse: TimerPulse) -> Option<TimerEvent> {
        if pulse.run != self.run {
            return None;
        }
        let tick = self.countdown.tick()?;
        if tick.completed {
            self.cancel_run();
            self.completion_pending = true;
        }
        Some(TimerEvent::Tick {
            remaining: tick.remaining,
        })
    }

    fn spawn_run(&mut self) {
        self.cancel_run();
        let run = self.run;
        let period = self.period;
        let pulses = self.pulses_tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if pulses.send(TimerPulse { run }).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn cancel_run(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.run = self.run.wrapping_add(1);
    }
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ExamTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamTimer")
            .field("countdown", &self.countdown)
            .field("run", &self.run)
            .field("active", &self.task.is_some())
            .finish_non_exhaustive()
    }
}
