//! Key-down listener registration and fan-out

use tracing::debug;

use crate::key::KeyPress;
use crate::matcher::SequenceMatcher;

/// Receives every key-down delivered by a [`KeyDispatcher`]
pub trait KeyListener {
    fn on_key_down(&mut self, press: &KeyPress);

    /// Drop any in-progress state
    fn reset(&mut self);
}

impl KeyListener for SequenceMatcher<KeyPress> {
    fn on_key_down(&mut self, press: &KeyPress) {
        self.handle_key(press);
    }

    fn reset(&mut self) {
        SequenceMatcher::reset(self);
    }
}

/// Handle returned by [`KeyDispatcher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fans key-downs out to registered listeners in registration order.
///
/// Each listener is owned by the dispatcher, so a handler always runs
/// against its own instance no matter who drives delivery.
#[derive(Default)]
pub struct KeyDispatcher {
    listeners: Vec<(ListenerId, Box<dyn KeyListener>)>,
    next_id: u64,
}

impl KeyDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn KeyListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        debug!(id = id.0, "key listener subscribed");
        id
    }

    /// Remove a listener. Returns false if `id` was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        let removed = self.listeners.len() != before;
        if removed {
            debug!(id = id.0, "key listener unsubscribed");
        }
        removed
    }

    /// Stop delivering events to a started matcher
    pub fn stop(&mut self, id: ListenerId) -> bool {
        self.unsubscribe(id)
    }

    /// Deliver one key-down to every listener
    pub fn dispatch(&mut self, press: &KeyPress) {
        for (_, listener) in &mut self.listeners {
            listener.on_key_down(press);
        }
    }

    /// Reset a single listener. Returns false if `id` was not registered.
    pub fn reset(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter_mut().find(|(lid, _)| *lid == id) {
            Some((_, listener)) => {
                listener.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl SequenceMatcher<KeyPress> {
    /// Register this matcher for key-downs from `dispatcher`
    pub fn start(self, dispatcher: &mut KeyDispatcher) -> ListenerId {
        dispatcher.subscribe(Box::new(self))
    }
}
