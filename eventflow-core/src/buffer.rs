//! Bounded ordered buffer of individual, non-summarized events.

use std::collections::VecDeque;

use eventflow_model::Event;

/// Ordered buffer of events awaiting delivery, bounded to a fixed
/// capacity. On overflow, the newest event is dropped — the buffer never
/// evicts an already-buffered event to make room.
pub struct EventBuffer {
    capacity: usize,
    events: VecDeque<Event>,
}

impl EventBuffer {
    /// Construct a buffer with the given capacity, clamped to >= 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::new(),
        }
    }

    /// Append an event. Returns `true` if stored, `false` if the buffer
    /// was already at capacity (the caller should count this as a
    /// dropped event).
    pub fn append(&mut self, event: Event) -> bool {
        if self.events.len() >= self.capacity {
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Remove and return every buffered event, preserving order. The
    /// buffer is empty afterward.
    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Number of events currently buffered.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer currently holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
