//! Ordered key-sequence state machine
//!
//! A [`SequenceMatcher`] watches key-downs one at a time and fires callbacks
//! when they follow its sequence. Timing is judged purely from event
//! timestamps; the matcher never schedules anything.

use std::fmt;
use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::ConfigError;
use crate::key::{KeyCode, KeyPress};

/// Callback invoked with the event that triggered it
pub type Callback<E> = Box<dyn FnMut(&E)>;

/// What a single event did to the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Wrong key with nothing in progress
    Ignored,
    /// Progress was discarded (wrong key or timeout)
    Reset,
    /// Matched the key at `position`
    Advanced { position: usize },
    /// Broke the current attempt but matched the first key, starting over
    Restarted,
    /// Matched the final key
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct MatchState {
    /// Index of the last matched key
    progress: Option<usize>,
    /// Time of the last advancing event
    last_event_time: Option<u64>,
}

/// Builder for [`SequenceMatcher`]
pub struct SequenceMatcherBuilder<E> {
    sequence: Vec<KeyCode>,
    timeout_ms: u64,
    on_complete: Option<Callback<E>>,
    on_step: Option<Callback<E>>,
}

impl<E> SequenceMatcherBuilder<E> {
    pub fn new(sequence: impl Into<Vec<KeyCode>>) -> Self {
        Self {
            sequence: sequence.into(),
            timeout_ms: 0,
            on_complete: None,
            on_step: None,
        }
    }

    /// Maximum gap between two matched keys (0 disables)
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Called once per full match
    pub fn on_complete(mut self, f: impl FnMut(&E) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called on every matched key, including the final one
    pub fn on_step(mut self, f: impl FnMut(&E) + 'static) -> Self {
        self.on_step = Some(Box::new(f));
        self
    }

    /// Validate and build the matcher.
    ///
    /// An empty sequence is reported through `tracing` and returned as
    /// [`ConfigError::EmptySequence`]; no matcher exists afterwards.
    pub fn build(self) -> Result<SequenceMatcher<E>, ConfigError> {
        if self.sequence.is_empty() {
            let err = ConfigError::EmptySequence;
            error!("cannot build sequence matcher: {}", err);
            return Err(err);
        }

        Ok(SequenceMatcher {
            sequence: self.sequence,
            timeout_ms: self.timeout_ms,
            state: MatchState::default(),
            origin: Instant::now(),
            on_complete: self.on_complete,
            on_step: self.on_step,
        })
    }
}

/// Detects one ordered key sequence in a stream of key-downs
pub struct SequenceMatcher<E = KeyPress> {
    sequence: Vec<KeyCode>,
    timeout_ms: u64,
    state: MatchState,
    /// Clock origin for events that carry no timestamp
    origin: Instant,
    on_complete: Option<Callback<E>>,
    on_step: Option<Callback<E>>,
}

impl SequenceMatcher<KeyPress> {
    /// Start building a matcher whose callbacks receive [`KeyPress`] events.
    ///
    /// Use [`SequenceMatcherBuilder::new`] for other event types.
    pub fn builder(sequence: impl Into<Vec<KeyCode>>) -> SequenceMatcherBuilder<KeyPress> {
        SequenceMatcherBuilder::new(sequence)
    }

    /// Feed a key press, using its own timestamp when present
    pub fn handle_key(&mut self, press: &KeyPress) -> MatchOutcome {
        self.handle_event(press.code, press.time_ms, press)
    }
}

impl<E> SequenceMatcher<E> {
    /// Process one key-down.
    ///
    /// `event_time_ms` of `None` means "now" on the matcher's own clock.
    /// A key that breaks the current attempt but equals the first key of the
    /// sequence is re-evaluated once against the reset state.
    pub fn handle_event(
        &mut self,
        key: KeyCode,
        event_time_ms: Option<u64>,
        event: &E,
    ) -> MatchOutcome {
        let now = event_time_ms.unwrap_or_else(|| self.elapsed_ms());
        let mut retried = false;

        loop {
            let next = self.state.progress.map_or(0, |p| p + 1);

            if self.within_timeout(now) && key == self.sequence[next] {
                self.state.progress = Some(next);
                self.state.last_event_time = Some(now);

                if next == self.sequence.len() - 1 {
                    self.state = MatchState::default();
                    self.fire_step(event);
                    info!(len = self.sequence.len(), "key sequence completed");
                    if let Some(on_complete) = self.on_complete.as_mut() {
                        on_complete(event);
                    }
                    return MatchOutcome::Completed;
                }

                debug!(position = next, key, "key sequence advanced");
                self.fire_step(event);
                return if retried {
                    MatchOutcome::Restarted
                } else {
                    MatchOutcome::Advanced { position: next }
                };
            }

            let had_progress = self.state.progress.is_some();
            self.reset();

            // After a reset the first key always advances, so this runs at most once
            if !retried && key == self.sequence[0] {
                debug!(key, "key sequence restarted on first key");
                retried = true;
                continue;
            }

            if had_progress {
                debug!(key, "key sequence reset");
                return MatchOutcome::Reset;
            }
            return MatchOutcome::Ignored;
        }
    }

    fn fire_step(&mut self, event: &E) {
        if let Some(on_step) = self.on_step.as_mut() {
            on_step(event);
        }
    }

    fn within_timeout(&self, now: u64) -> bool {
        if self.timeout_ms == 0 {
            return true;
        }
        match (self.state.progress, self.state.last_event_time) {
            (Some(_), Some(last)) => now.saturating_sub(last) < self.timeout_ms,
            _ => true,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Discard any progress. Never invokes callbacks.
    pub fn reset(&mut self) {
        self.state = MatchState::default();
    }

    /// The target sequence
    pub fn sequence(&self) -> &[KeyCode] {
        &self.sequence
    }

    /// Index of the last matched key, `None` when idle
    pub fn progress(&self) -> Option<usize> {
        self.state.progress
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn is_idle(&self) -> bool {
        self.state.progress.is_none()
    }
}

impl<E> fmt::Debug for SequenceMatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceMatcher")
            .field("sequence", &self.sequence)
            .field("timeout_ms", &self.timeout_ms)
            .field("progress", &self.state.progress)
            .field("last_event_time", &self.state.last_event_time)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Callback hits recorded as ("step"|"complete", key code)
    type Log = Rc<RefCell<Vec<(&'static str, KeyCode)>>>;

    fn recording(sequence: &[KeyCode], timeout_ms: u64) -> (SequenceMatcher, Log) {
        let log: Log = Rc::default();
        let step_log = log.clone();
        let complete_log = log.clone();
        let matcher = SequenceMatcher::builder(sequence)
            .timeout_ms(timeout_ms)
            .on_step(move |e: &KeyPress| step_log.borrow_mut().push(("step", e.code)))
            .on_complete(move |e: &KeyPress| complete_log.borrow_mut().push(("complete", e.code)))
            .build()
            .unwrap();
        (matcher, log)
    }

    fn count(log: &Log, kind: &str) -> usize {
        log.borrow().iter().filter(|(k, _)| *k == kind).count()
    }

    fn feed(matcher: &mut SequenceMatcher, keys: &[KeyCode]) -> Vec<MatchOutcome> {
        keys.iter()
            .enumerate()
            .map(|(i, &k)| matcher.handle_key(&KeyPress::at(k, i as u64)))
            .collect()
    }

    #[test]
    fn test_basic_completion() {
        let (mut m, log) = recording(&[65, 66, 67], 0);
        let outcomes = feed(&mut m, &[65, 66, 67]);

        assert_eq!(
            outcomes,
            vec![
                MatchOutcome::Advanced { position: 0 },
                MatchOutcome::Advanced { position: 1 },
                MatchOutcome::Completed,
            ]
        );
        assert_eq!(count(&log, "step"), 3);
        assert_eq!(count(&log, "complete"), 1);
        assert_eq!(m.progress(), None);
    }

    #[test]
    fn test_complete_fires_after_final_step() {
        let (mut m, log) = recording(&[65, 66], 0);
        feed(&mut m, &[65, 66]);
        assert_eq!(
            *log.borrow(),
            vec![("step", 65), ("step", 66), ("complete", 66)]
        );
    }

    #[test]
    fn test_wrong_key_resets() {
        let (mut m, log) = recording(&[65, 66, 67], 0);
        let outcomes = feed(&mut m, &[65, 68]);
        assert_eq!(outcomes[1], MatchOutcome::Reset);
        assert_eq!(m.progress(), None);

        feed(&mut m, &[65, 68, 65, 66, 67]);
        assert_eq!(count(&log, "complete"), 1);
    }

    #[test]
    fn test_wrong_key_when_idle_is_ignored() {
        let (mut m, log) = recording(&[65, 66], 0);
        assert_eq!(m.handle_key(&KeyPress::at(90, 0)), MatchOutcome::Ignored);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_first_key_restarts_sequence() {
        let (mut m, log) = recording(&[65, 66], 0);
        let outcomes = feed(&mut m, &[65, 65, 66]);

        assert_eq!(outcomes[1], MatchOutcome::Restarted);
        assert_eq!(outcomes[2], MatchOutcome::Completed);
        assert_eq!(count(&log, "complete"), 1);
        // The restarting key counts as a step
        assert_eq!(count(&log, "step"), 3);
    }

    #[test]
    fn test_repeated_prefix_key() {
        // up up down: a third "up" restarts from position 0
        let (mut m, log) = recording(&[38, 38, 40], 0);
        feed(&mut m, &[38, 38, 38, 40]);
        assert_eq!(count(&log, "complete"), 0);
        assert_eq!(m.progress(), None);

        feed(&mut m, &[38, 38, 40]);
        assert_eq!(count(&log, "complete"), 1);
    }

    #[test]
    fn test_timeout_expiry() {
        let (mut m, log) = recording(&[65, 66], 100);
        m.handle_key(&KeyPress::at(65, 0));
        assert_eq!(m.handle_key(&KeyPress::at(66, 150)), MatchOutcome::Reset);
        assert_eq!(count(&log, "complete"), 0);
        assert_eq!(m.progress(), None);
    }

    #[test]
    fn test_within_timeout_completes() {
        let (mut m, log) = recording(&[65, 66], 100);
        m.handle_key(&KeyPress::at(65, 0));
        assert_eq!(m.handle_key(&KeyPress::at(66, 50)), MatchOutcome::Completed);
        assert_eq!(count(&log, "complete"), 1);
    }

    #[test]
    fn test_timeout_boundary_is_exclusive() {
        let (mut m, _log) = recording(&[65, 66], 100);
        m.handle_key(&KeyPress::at(65, 0));
        assert_eq!(m.handle_key(&KeyPress::at(66, 100)), MatchOutcome::Reset);
    }

    #[test]
    fn test_timeout_is_between_advancing_keys() {
        let (mut m, log) = recording(&[65, 66, 67], 100);
        // A slow first key never times out
        m.handle_key(&KeyPress::at(65, 10_000));
        m.handle_key(&KeyPress::at(66, 10_090));
        m.handle_key(&KeyPress::at(67, 10_180));
        assert_eq!(count(&log, "complete"), 1);
    }

    #[test]
    fn test_timed_out_first_key_restarts() {
        let (mut m, log) = recording(&[65, 66], 100);
        m.handle_key(&KeyPress::at(65, 0));
        assert_eq!(m.handle_key(&KeyPress::at(65, 500)), MatchOutcome::Restarted);
        assert_eq!(m.handle_key(&KeyPress::at(66, 550)), MatchOutcome::Completed);
        assert_eq!(count(&log, "complete"), 1);
    }

    #[test]
    fn test_clock_going_backwards_counts_as_zero_gap() {
        let (mut m, log) = recording(&[65, 66], 100);
        m.handle_key(&KeyPress::at(65, 1_000));
        m.handle_key(&KeyPress::at(66, 400));
        assert_eq!(count(&log, "complete"), 1);
    }

    #[test]
    fn test_single_key_sequence() {
        let (mut m, log) = recording(&[65], 0);
        assert_eq!(m.handle_key(&KeyPress::at(65, 0)), MatchOutcome::Completed);
        assert_eq!(*log.borrow(), vec![("step", 65), ("complete", 65)]);
        assert_eq!(m.progress(), None);
    }

    #[test]
    fn test_redetects_immediately_after_completion() {
        let (mut m, log) = recording(&[65, 66], 0);
        feed(&mut m, &[65, 66, 65, 66]);
        assert_eq!(count(&log, "complete"), 2);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (mut m, log) = recording(&[65, 66, 67], 0);
        m.reset();
        m.reset();
        assert_eq!(m.progress(), None);

        feed(&mut m, &[65, 66]);
        assert_eq!(m.progress(), Some(1));
        m.reset();
        m.reset();
        assert!(m.is_idle());
        // Only the two steps fed above
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_reset_discards_partial_match() {
        let (mut m, log) = recording(&[65, 66], 0);
        m.handle_key(&KeyPress::at(65, 0));
        m.reset();
        assert_eq!(m.handle_key(&KeyPress::at(66, 1)), MatchOutcome::Ignored);
        assert_eq!(count(&log, "complete"), 0);
    }

    #[test]
    fn test_empty_sequence_is_config_error() {
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        let result = SequenceMatcher::builder(Vec::new())
            .on_complete(move |_| *c.borrow_mut() += 1)
            .build();

        assert!(matches!(result, Err(ConfigError::EmptySequence)));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_defaults_are_noops() {
        let mut m = SequenceMatcher::builder(vec![65]).build().unwrap();
        assert_eq!(m.timeout_ms(), 0);
        assert_eq!(m.handle_key(&KeyPress::new(65)), MatchOutcome::Completed);
    }

    #[test]
    fn test_untimestamped_events_use_matcher_clock() {
        let (mut m, log) = recording(&[65, 66], 60_000);
        m.handle_key(&KeyPress::new(65));
        m.handle_key(&KeyPress::new(66));
        assert_eq!(count(&log, "complete"), 1);
    }

    #[test]
    fn test_custom_event_type() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let mut m = SequenceMatcherBuilder::<&str>::new(vec![1, 2])
            .on_complete(move |e: &&str| s.borrow_mut().push(e.to_string()))
            .build()
            .unwrap();

        m.handle_event(1, Some(0), &"first");
        m.handle_event(2, Some(1), &"second");
        assert_eq!(*seen.borrow(), vec!["second".to_string()]);
    }

    #[test]
    fn test_exact_code_equality() {
        // 97 is not folded to 65
        let (mut m, log) = recording(&[65], 0);
        assert_eq!(m.handle_key(&KeyPress::at(97, 0)), MatchOutcome::Ignored);
        assert!(log.borrow().is_empty());
    }
}
