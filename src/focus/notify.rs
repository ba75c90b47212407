use crate::config::NotificationConfig;

use super::TimerMode;

/// Where timer-expiry alerts go. Failures are the implementor's to log.
pub trait Notifier {
    fn timer_finished(&self, task_title: &str, mode: TimerMode);
}

impl Notifier for NotificationConfig {
    fn timer_finished(&self, task_title: &str, mode: TimerMode) {
        self.notify(task_title, mode.label());
    }
}

/// Discards every alert (headless runs, tests).
pub struct Silent;

impl Notifier for Silent {
    fn timer_finished(&self, _task_title: &str, _mode: TimerMode) {}
}
