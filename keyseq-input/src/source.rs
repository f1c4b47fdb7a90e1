//! Terminal key-down source backed by crossterm

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event};

use crate::dispatch::KeyDispatcher;
use crate::key::KeyPress;

/// Reads key-downs from the terminal.
///
/// The terminal should already be in raw mode; crossterm does not report
/// individual keys otherwise.
#[derive(Debug, Default)]
pub struct CrosstermSource;

impl CrosstermSource {
    pub fn new() -> Self {
        Self
    }

    /// Wait up to `timeout` for the next terminal event.
    ///
    /// Returns `Ok(None)` on timeout.
    pub fn poll(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        if event::poll(timeout)? {
            return event::read().map(Some);
        }
        Ok(None)
    }

    /// Forward at most one key-down to `dispatcher`.
    ///
    /// The raw event is returned so callers can act on keys the matchers
    /// ignore (quit shortcuts, resize).
    pub fn pump(
        &mut self,
        dispatcher: &mut KeyDispatcher,
        timeout: Duration,
    ) -> io::Result<Option<Event>> {
        let event = self.poll(timeout)?;
        if let Some(Event::Key(key)) = &event {
            if let Some(press) = KeyPress::from_crossterm(key) {
                dispatcher.dispatch(&press);
            }
        }
        Ok(event)
    }
}
