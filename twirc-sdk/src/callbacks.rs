//! Callback table: at most one handler per event kind.

use std::collections::HashMap;
use std::fmt;

use crate::client::Client;
use crate::event::{Event, EventKind};

/// A handler invoked on the caller's thread from inside [`Client::tick`].
///
/// It gets the client mutably so it can send commands, read the login and
/// touch the context slot.
pub type Callback<C> = Box<dyn FnMut(&mut Client<C>, &Event)>;

/// Handlers keyed by event kind. Unset kinds are classified and dropped.
pub struct Callbacks<C> {
    slots: HashMap<EventKind, Callback<C>>,
    /// Handlers currently taken out for dispatch, innermost last, with a flag
    /// recording whether their slot was set or cleared while they ran.
    running: Vec<(EventKind, bool)>,
}

impl<C> Callbacks<C> {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            running: Vec::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn set<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&mut Client<C>, &Event) + 'static,
    {
        self.mark_replaced(kind);
        self.slots.insert(kind, Box::new(handler));
    }

    /// Remove the handler for `kind`. Returns whether one was registered.
    pub fn clear(&mut self, kind: EventKind) -> bool {
        let was_running = self.is_running(kind);
        self.mark_replaced(kind);
        self.slots.remove(&kind).is_some() || was_running
    }

    pub fn is_set(&self, kind: EventKind) -> bool {
        self.slots.contains_key(&kind) || self.is_running(kind)
    }

    /// Whether a handler is executing right now.
    pub fn is_dispatching(&self) -> bool {
        !self.running.is_empty()
    }

    fn is_running(&self, kind: EventKind) -> bool {
        self.running
            .iter()
            .any(|&(running, replaced)| running == kind && !replaced)
    }

    fn mark_replaced(&mut self, kind: EventKind) {
        for (running, replaced) in &mut self.running {
            if *running == kind {
                *replaced = true;
            }
        }
    }

    /// Take the handler for `kind` out of the table for the duration of one
    /// dispatch.
    pub(crate) fn take(&mut self, kind: EventKind) -> Option<Callback<C>> {
        let handler = self.slots.remove(&kind)?;
        self.running.push((kind, false));
        Some(handler)
    }

    /// Put a handler back after dispatch unless it was replaced or cleared
    /// while it ran.
    pub(crate) fn restore(&mut self, kind: EventKind, handler: Callback<C>) {
        let replaced = match self.running.pop() {
            Some((running, replaced)) => {
                debug_assert_eq!(running, kind);
                replaced
            }
            None => false,
        };
        if !replaced {
            self.slots.insert(kind, handler);
        }
    }
}

impl<C> Default for Callbacks<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Callbacks<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.slots.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("Callbacks")
            .field("kinds", &kinds)
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}
