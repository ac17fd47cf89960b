//! Named-event fan-out.
//!
//! An [`EventDispatcher`] routes payloads dispatched under an event name to
//! every listener subscribed to that name. Listeners are *buffers owned by
//! the dispatcher*, addressed by [`ListenerId`]: dispatch appends a clone of
//! the payload to each subscribed buffer, and the subscriber drains or
//! clears its buffer when its turn comes. Because delivery is a data
//! append, a subscriber can never mutate the listener registry (or anything
//! else) mid-dispatch, and iteration over listeners cannot be invalidated.
//!
//! The dispatcher keeps `fired` / `handled` counters for diagnostics:
//! `fired` counts dispatch calls, `handled` counts per-listener deliveries.

use serde::Serialize;

/// Identifies one listener buffer within a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Diagnostic counters for one dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherCounters {
    /// Number of dispatch calls.
    pub fired: u64,
    /// Number of per-listener deliveries.
    pub handled: u64,
}

struct ListenerSlot<E> {
    id: ListenerId,
    event: String,
    buffer: Vec<E>,
}

/// Fan-out of named events into per-listener buffers.
pub struct EventDispatcher<E> {
    listeners: Vec<ListenerSlot<E>>,
    next_listener: u64,
    counters: DispatcherCounters,
}

impl<E: Clone> EventDispatcher<E> {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_listener: 0,
            counters: DispatcherCounters::default(),
        }
    }

    /// Subscribes a new buffer to `event` and returns its id.
    pub fn add_listener(&mut self, event: &str) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(ListenerSlot {
            id,
            event: event.to_string(),
            buffer: Vec::new(),
        });
        id
    }

    /// Unsubscribes a listener, dropping its buffer.
    ///
    /// Returns `true` if the listener existed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        if let Some(pos) = self.listeners.iter().position(|slot| slot.id == id) {
            self.listeners.remove(pos);
            true
        } else {
            false
        }
    }

    /// Returns `true` if any listener is subscribed to `event`.
    #[must_use]
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners.iter().any(|slot| slot.event == event)
    }

    /// Appends `payload` to every buffer subscribed to `event`.
    pub fn dispatch(&mut self, event: &str, payload: E) {
        self.counters.fired += 1;
        for slot in &mut self.listeners {
            if slot.event == event {
                slot.buffer.push(payload.clone());
                self.counters.handled += 1;
            }
        }
    }

    /// Takes everything accumulated in `id`'s buffer since the last drain.
    pub fn drain(&mut self, id: ListenerId) -> Vec<E> {
        self.listeners
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| std::mem::take(&mut slot.buffer))
            .unwrap_or_default()
    }

    /// Truncates `id`'s buffer without reallocating.
    pub fn clear(&mut self, id: ListenerId) {
        if let Some(slot) = self.listeners.iter_mut().find(|slot| slot.id == id) {
            slot.buffer.clear();
        }
    }

    /// Number of events buffered for `id`.
    #[must_use]
    pub fn buffered(&self, id: ListenerId) -> usize {
        self.listeners
            .iter()
            .find(|slot| slot.id == id)
            .map_or(0, |slot| slot.buffer.len())
    }

    /// Diagnostic counters snapshot.
    #[must_use]
    pub fn counters(&self) -> DispatcherCounters {
        self.counters
    }

    /// Resets the `fired` / `handled` counters to zero.
    pub fn reset_counters(&mut self) {
        self.counters = DispatcherCounters::default();
    }
}

impl<E: Clone> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}
