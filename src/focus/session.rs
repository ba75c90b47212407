use std::time::Instant;

use crate::backend::{Backend, BackendResult};
use crate::config::FocusConfig;
use crate::store::Task;

use super::{Notifier, Phase, Ticker, Timer, TimerEvent, TimerMode};

/// A focus screen's worth of state: one task, one timer, one ticker.
///
/// The ticker only runs while the timer does. Closing or dropping the session
/// cancels it.
pub struct FocusSession {
    task: Task,
    timer: Timer,
    ticker: Ticker,
    notifier: Box<dyn Notifier>,
}

impl FocusSession {
    pub fn new(task: Task, timer: Timer, notifier: Box<dyn Notifier>) -> Self {
        FocusSession {
            task,
            timer,
            ticker: Ticker::every_second(),
            notifier,
        }
    }

    /// Fetch the task and build a session for it. `None` when the task does
    /// not exist.
    pub fn open(
        backend: &dyn Backend,
        task_id: &str,
        presets: FocusConfig,
        mode: TimerMode,
        notifier: Box<dyn Notifier>,
    ) -> BackendResult<Option<Self>> {
        let Some(task) = backend.get_task(task_id)? else {
            tracing::warn!(task = %task_id, "focus requested for missing task");
            return Ok(None);
        };
        tracing::info!(task = %task.id, mode = mode.label(), "focus session opened");
        Ok(Some(Self::new(task, Timer::new(presets, mode), notifier)))
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn ticker_active(&self) -> bool {
        self.ticker.is_active()
    }

    /// Time left before the next tick is due, if the ticker runs.
    pub fn until_next_tick(&self, now: Instant) -> Option<std::time::Duration> {
        self.ticker.until_next(now)
    }

    pub fn start(&mut self, now: Instant) -> Option<TimerEvent> {
        match self.timer.start() {
            Some(event) => Some(self.finish(event)),
            None => {
                if !self.ticker.is_active() {
                    self.ticker.start(now);
                }
                None
            }
        }
    }

    pub fn pause(&mut self) {
        self.timer.pause();
        self.ticker.cancel();
    }

    /// Space bar: pause when running, otherwise start.
    pub fn toggle(&mut self, now: Instant) -> Option<TimerEvent> {
        if self.timer.is_running() {
            self.pause();
            None
        } else {
            self.start(now)
        }
    }

    pub fn reset(&mut self) {
        self.ticker.cancel();
        self.timer.reset();
    }

    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.ticker.cancel();
        self.timer.switch_mode(mode);
    }

    /// Apply every tick due by `now`.
    pub fn poll(&mut self, now: Instant) -> Option<TimerEvent> {
        for _ in 0..self.ticker.due(now) {
            if let Some(event) = self.timer.tick() {
                return Some(self.finish(event));
            }
        }
        None
    }

    fn finish(&mut self, event: TimerEvent) -> TimerEvent {
        self.ticker.cancel();
        debug_assert_eq!(self.timer.phase(), Phase::Expired);
        let TimerEvent::Completed(mode) = event;
        tracing::info!(task = %self.task.id, mode = mode.label(), "timer finished");
        self.notifier.timer_finished(&self.task.title, mode);
        event
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for FocusSession {
    fn drop(&mut self) {
        self.ticker.cancel();
        tracing::debug!(task = %self.task.id, "focus session closed");
    }
}
