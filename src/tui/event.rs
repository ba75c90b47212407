use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};

pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Wait up to `timeout` for terminal input. Key releases and repeats are
/// folded into `Tick` so each press is handled once.
pub fn poll(timeout: Duration) -> Result<AppEvent> {
    if !event::poll(timeout)? {
        return Ok(AppEvent::Tick);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(AppEvent::Key(key)),
        Event::Resize(..) => Ok(AppEvent::Resize),
        _ => Ok(AppEvent::Tick),
    }
}
