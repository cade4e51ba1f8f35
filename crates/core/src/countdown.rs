//! Whole-second countdown state machine.
//!
//! `Countdown` does no scheduling of its own: a driver calls [`Countdown::tick`]
//! once per elapsed second while the countdown is running. Keeping the clock
//! out of this type makes every transition deterministic.

/// Lifecycle of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// Never started, or reset.
    Idle,
    Running,
    /// Paused, stopped, or expired.
    Stopped,
}

/// Result of one elapsed second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Remaining seconds after the decrement.
    pub remaining: u32,
    /// Set on the tick that reached zero; the completion follows this tick.
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    duration: u32,
    remaining: u32,
    state: CountdownState,
}

impl Countdown {
    #[must_use]
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration: duration_secs,
            remaining: duration_secs,
            state: CountdownState::Idle,
        }
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn state(&self) -> CountdownState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Share of the configured duration still left, in percent.
    #[must_use]
    pub fn percentage_left(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        f64::from(self.remaining) / f64::from(self.duration) * 100.0
    }

    /// Starts counting. Returns `false` when already running or nothing is left.
    pub fn start(&mut self) -> bool {
        if self.is_running() || self.remaining == 0 {
            return false;
        }
        self.state = CountdownState::Running;
        true
    }

    /// Stops counting. Returns `false` if the countdown was not running.
    pub fn stop(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = CountdownState::Stopped;
        true
    }

    pub fn pause(&mut self) -> bool {
        self.stop()
    }

    /// Continues a stopped countdown if time is left.
    pub fn resume(&mut self) -> bool {
        if self.state != CountdownState::Stopped {
            return false;
        }
        self.start()
    }

    /// Stops and restores the full duration. Valid from any state.
    pub fn reset(&mut self) {
        self.state = CountdownState::Idle;
        self.remaining = self.duration;
    }

    /// Applies one elapsed second. Returns `None` unless running.
    pub fn tick(&mut self) -> Option<Tick> {
        if !self.is_running() {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        let completed = self.remaining == 0;
        if completed {
            self.state = CountdownState::Stopped;
        }
        Some(Tick {
            remaining: self.remaining,
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(countdown: &mut Countdown) -> Vec<Tick> {
        let mut ticks = Vec::new();
        while let Some(tick) = countdown.tick() {
            ticks.push(tick);
        }
        ticks
    }

    #[test]
    fn idle_countdown_does_not_tick() {
        let mut countdown = Countdown::new(3);
        assert_eq!(countdown.state(), CountdownState::Idle);
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.remaining(), 3);
    }

    #[test]
    fn full_run_ticks_down_to_zero_and_completes_once() {
        let mut countdown = Countdown::new(3);
        assert!(countdown.start());

        let ticks = run_to_end(&mut countdown);
        let remaining: Vec<_> = ticks.iter().map(|t| t.remaining).collect();
        assert_eq!(remaining, vec![2, 1, 0]);
        let completions = ticks.iter().filter(|t| t.completed).count();
        assert_eq!(completions, 1);
        assert!(ticks.last().unwrap().completed);

        assert_eq!(countdown.state(), CountdownState::Stopped);
        assert!(countdown.is_expired());
        assert_eq!(countdown.tick(), None);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let mut countdown = Countdown::new(5);
        assert!(countdown.start());
        assert!(!countdown.start());
        countdown.tick();
        assert_eq!(countdown.remaining(), 4);
    }

    #[test]
    fn stop_prevents_further_ticks() {
        let mut countdown = Countdown::new(5);
        countdown.start();
        countdown.tick();
        assert!(countdown.stop());
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.remaining(), 4);
        assert!(!countdown.stop());
    }

    #[test]
    fn resume_continues_from_paused_value() {
        let mut countdown = Countdown::new(5);
        countdown.start();
        countdown.tick();
        countdown.pause();
        assert!(countdown.resume());
        assert_eq!(countdown.tick().unwrap().remaining, 3);
    }

    #[test]
    fn resume_after_expiry_is_noop() {
        let mut countdown = Countdown::new(1);
        countdown.start();
        assert!(countdown.tick().unwrap().completed);
        assert!(!countdown.resume());
        assert!(!countdown.start());
        assert_eq!(countdown.tick(), None);
    }

    #[test]
    fn resume_from_idle_is_noop() {
        let mut countdown = Countdown::new(2);
        assert!(!countdown.resume());
        assert_eq!(countdown.state(), CountdownState::Idle);
    }

    #[test]
    fn reset_restores_duration_from_any_state() {
        let mut countdown = Countdown::new(2);
        countdown.start();
        run_to_end(&mut countdown);
        countdown.reset();
        assert_eq!(countdown.state(), CountdownState::Idle);
        assert_eq!(countdown.remaining(), 2);

        countdown.start();
        countdown.tick();
        countdown.reset();
        assert_eq!(countdown.remaining(), 2);
        assert!(!countdown.is_running());
    }

    #[test]
    fn percentage_left_tracks_remaining() {
        let mut countdown = Countdown::new(4);
        assert!((countdown.percentage_left() - 100.0).abs() < f64::EPSILON);
        countdown.start();
        countdown.tick();
        assert!((countdown.percentage_left() - 75.0).abs() < f64::EPSILON);
        assert!(Countdown::new(0).percentage_left().abs() < f64::EPSILON);
    }
}
