use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

use crate::focus::Phase;
use crate::store::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastStyle {
    Info,
    Success,
    Error,
}

/// Colours used by the renderer. Any of them can be overridden from the
/// `[theme]` section of `config.toml`.
#[derive(Debug, Clone)]
pub struct Theme {
    pub border_focused: Color,
    pub border_unfocused: Color,

    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,

    pub priority_high: Color,
    pub priority_medium: Color,
    pub priority_low: Color,
    pub done: Color,
    pub overdue: Color,

    pub timer_ready: Color,
    pub timer_running: Color,
    pub timer_paused: Color,
    pub timer_expired: Color,

    pub toast_info: Color,
    pub toast_success: Color,
    pub toast_error: Color,

    pub form_highlight: Color,
    pub form_error: Color,

    pub tab_active: Color,
    pub tab_inactive: Color,
    pub drag: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_focused: Color::Cyan,
            border_unfocused: Color::DarkGray,

            text_primary: Color::White,
            text_secondary: Color::DarkGray,
            accent: Color::Cyan,

            priority_high: Color::Red,
            priority_medium: Color::Yellow,
            priority_low: Color::Green,
            done: Color::Blue,
            overdue: Color::LightRed,

            timer_ready: Color::White,
            timer_running: Color::Green,
            timer_paused: Color::Yellow,
            timer_expired: Color::Magenta,

            toast_info: Color::Cyan,
            toast_success: Color::Green,
            toast_error: Color::Red,

            form_highlight: Color::Yellow,
            form_error: Color::Red,

            tab_active: Color::Cyan,
            tab_inactive: Color::DarkGray,
            drag: Color::Magenta,
        }
    }
}

impl Theme {
    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    pub fn unfocused_border(&self) -> Style {
        Style::default().fg(self.border_unfocused)
    }

    pub fn priority_style(&self, priority: Priority) -> Style {
        let color = match priority {
            Priority::High => self.priority_high,
            Priority::Medium => self.priority_medium,
            Priority::Low => self.priority_low,
        };
        Style::default().fg(color)
    }

    pub fn timer_style(&self, phase: Phase) -> Style {
        let color = match phase {
            Phase::Ready => self.timer_ready,
            Phase::Running => self.timer_running,
            Phase::Paused => self.timer_paused,
            Phase::Expired => self.timer_expired,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn tab_active_style(&self) -> Style {
        Style::default()
            .fg(self.tab_active)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    pub fn tab_inactive_style(&self) -> Style {
        Style::default().fg(self.tab_inactive)
    }

    pub fn toast_style(&self, style: ToastStyle) -> Style {
        let color = match style {
            ToastStyle::Info => self.toast_info,
            ToastStyle::Success => self.toast_success,
            ToastStyle::Error => self.toast_error,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}

// ── Config deserialization ────────────────────────────────────────────

/// All-optional mirror of [`Theme`]; only `Some` fields override.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct ThemeConfig {
    pub border_focused: Option<String>,
    pub border_unfocused: Option<String>,
    pub text_primary: Option<String>,
    pub text_secondary: Option<String>,
    pub accent: Option<String>,
    pub priority_high: Option<String>,
    pub priority_medium: Option<String>,
    pub priority_low: Option<String>,
    pub done: Option<String>,
    pub overdue: Option<String>,
    pub timer_running: Option<String>,
    pub timer_paused: Option<String>,
    pub timer_expired: Option<String>,
    pub drag: Option<String>,
}

/// Named colours (`"cyan"`, `"dark_gray"`, ...) or `rgb(R,G,B)`.
fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        let channels: Vec<u8> = inner
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .ok()?;
        return match channels.as_slice() {
            [r, g, b] => Some(Color::Rgb(*r, *g, *b)),
            _ => None,
        };
    }

    match s.to_lowercase().replace(['-', '_'], "").as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "lightred" => Some(Color::LightRed),
        "lightgreen" => Some(Color::LightGreen),
        "lightyellow" => Some(Color::LightYellow),
        "lightblue" => Some(Color::LightBlue),
        "lightmagenta" => Some(Color::LightMagenta),
        "lightcyan" => Some(Color::LightCyan),
        "white" => Some(Color::White),
        _ => None,
    }
}

fn apply(target: &mut Color, source: Option<&String>) {
    if let Some(s) = source {
        match parse_color(s) {
            Some(color) => *target = color,
            None => tracing::warn!(value = %s, "ignoring unknown theme colour"),
        }
    }
}

impl ThemeConfig {
    pub fn build(&self) -> Theme {
        let mut t = Theme::default();
        apply(&mut t.border_focused, self.border_focused.as_ref());
        apply(&mut t.border_unfocused, self.border_unfocused.as_ref());
        apply(&mut t.text_primary, self.text_primary.as_ref());
        apply(&mut t.text_secondary, self.text_secondary.as_ref());
        apply(&mut t.accent, self.accent.as_ref());
        apply(&mut t.priority_high, self.priority_high.as_ref());
        apply(&mut t.priority_medium, self.priority_medium.as_ref());
        apply(&mut t.priority_low, self.priority_low.as_ref());
        apply(&mut t.done, self.done.as_ref());
        apply(&mut t.overdue, self.overdue.as_ref());
        apply(&mut t.timer_running, self.timer_running.as_ref());
        apply(&mut t.timer_paused, self.timer_paused.as_ref());
        apply(&mut t.timer_expired, self.timer_expired.as_ref());
        apply(&mut t.drag, self.drag.as_ref());
        t
    }
}
