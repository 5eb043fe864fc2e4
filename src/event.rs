//! Keyboard input while the dashboard owns the terminal
//!
//! Raw mode turns Ctrl-C into a key press rather than SIGINT, so the quit
//! keys are read here and fire the same cancel token as the signal handler.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use dmon_app::CancelToken;
use dmon_core::prelude::*;
use tokio::task::JoinHandle;

/// How long one poll blocks before re-checking the cancel token.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Keys that stop monitoring: `q`, `Esc` or Ctrl-C.
pub fn is_quit_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Esc => true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => true,
        _ => false,
    }
}

/// Read terminal keys on a blocking thread until a quit key or `cancel`.
pub fn spawn_quit_listener(cancel: CancelToken) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match poll_quit() {
                Ok(true) => {
                    info!("Quit key pressed");
                    cancel.cancel();
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Terminal input unavailable: {}", e);
                    break;
                }
            }
        }
    })
}

/// Poll for one key press with timeout.
fn poll_quit() -> Result<bool> {
    if !event::poll(POLL_TIMEOUT)? {
        return Ok(false);
    }

    Ok(match event::read()? {
        Event::Key(key) => key.kind == KeyEventKind::Press && is_quit_key(key.code, key.modifiers),
        _ => false,
    })
}
