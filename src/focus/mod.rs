//! Countdown timer for focus sessions and breaks.

pub mod notify;
pub mod session;
pub mod ticker;

pub use notify::Notifier;
pub use session::FocusSession;
pub use ticker::Ticker;

use crate::config::FocusConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerMode {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [TimerMode::Focus, TimerMode::ShortBreak, TimerMode::LongBreak];

    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak => "Short break",
            TimerMode::LongBreak => "Long break",
        }
    }

    /// Preset length in seconds.
    pub fn duration_secs(self, presets: &FocusConfig) -> u64 {
        let minutes = match self {
            TimerMode::Focus => presets.focus_minutes,
            TimerMode::ShortBreak => presets.short_break_minutes,
            TimerMode::LongBreak => presets.long_break_minutes,
        };
        u64::from(minutes) * 60
    }
}

impl std::str::FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "focus" | "pomodoro" => Ok(TimerMode::Focus),
            "short" | "shortbreak" => Ok(TimerMode::ShortBreak),
            "long" | "longbreak" => Ok(TimerMode::LongBreak),
            other => Err(format!(
                "invalid mode '{other}' (expected focus, short-break or long-break)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ready,
    Running,
    Paused,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Completed(TimerMode),
}

#[derive(Debug, Clone)]
pub struct Timer {
    presets: FocusConfig,
    mode: TimerMode,
    phase: Phase,
    remaining: u64,
    completed: bool,
}

impl Timer {
    pub fn new(presets: FocusConfig, mode: TimerMode) -> Self {
        Timer {
            presets,
            mode,
            phase: Phase::Ready,
            remaining: mode.duration_secs(&presets),
            completed: false,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Set once the countdown reaches zero; cleared by reset or mode switch.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Begin or resume. A zero-length countdown expires right away.
    pub fn start(&mut self) -> Option<TimerEvent> {
        match self.phase {
            Phase::Running => return None,
            Phase::Ready | Phase::Expired => {
                self.remaining = self.mode.duration_secs(&self.presets);
                self.completed = false;
            }
            Phase::Paused => {}
        }
        if self.remaining == 0 {
            return Some(self.expire());
        }
        self.phase = Phase::Running;
        None
    }

    pub fn pause(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Paused;
        }
    }

    pub fn toggle(&mut self) -> Option<TimerEvent> {
        if self.is_running() {
            self.pause();
            None
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Ready;
        self.remaining = self.mode.duration_secs(&self.presets);
        self.completed = false;
    }

    pub fn switch_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.reset();
    }

    /// Advance one second.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.phase != Phase::Running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return Some(self.expire());
        }
        None
    }

    fn expire(&mut self) -> TimerEvent {
        self.phase = Phase::Expired;
        self.remaining = 0;
        self.completed = true;
        TimerEvent::Completed(self.mode)
    }

    pub fn display(&self) -> String {
        format_clock(self.remaining)
    }

    /// Fraction of the preset already elapsed, for the gauge.
    pub fn progress(&self) -> f64 {
        let total = self.mode.duration_secs(&self.presets);
        if total == 0 {
            return 1.0;
        }
        1.0 - (self.remaining as f64 / total as f64)
    }
}

/// `H:MM:SS` when there are hours, otherwise `M:SS`.
pub fn format_clock(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
