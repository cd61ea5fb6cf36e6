//! Context deduplication.
//!
//! Decides whether a context needs a fresh `index` event. The server-side
//! flavor ([`LruContextDeduplicator`]) remembers a bounded number of
//! recently-seen context keys and forgets them all on a periodic rotation;
//! the client-side flavor ([`NullContextDeduplicator`]) never emits index
//! events at all, since a client-side collector already knows every
//! context it evaluates locally.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use eventflow_model::Context;

/// Strategy the dispatcher consults once per event to decide whether a
/// context is "new" and needs an `index` event synthesized for it.
pub trait ContextDeduplicator: Send {
    /// How often the dispatcher must call [`ContextDeduplicator::flush`],
    /// if this strategy wants periodic rotation. `None` means never.
    fn flush_interval(&self) -> Option<Duration> {
        None
    }

    /// Returns `true` the first time this context's dedup key is seen
    /// since the last [`ContextDeduplicator::flush`]; `false` otherwise.
    fn process_context(&mut self, context: &Context) -> bool;

    /// Forget every previously seen context key.
    fn flush(&mut self);
}

/// The client-side flavor: always reports contexts as already seen, so
/// the dispatcher never synthesizes index events. Appropriate when the
/// collector already has full context attributes from another channel.
#[derive(Debug, Default)]
pub struct NullContextDeduplicator;

impl ContextDeduplicator for NullContextDeduplicator {
    fn process_context(&mut self, _context: &Context) -> bool {
        false
    }

    fn flush(&mut self) {}
}

/// The server-side flavor: an LRU of fixed capacity, plus a periodic full
/// rotation driven by the dispatcher's flush timer.
pub struct LruContextDeduplicator {
    capacity: usize,
    rotation_interval: Duration,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl LruContextDeduplicator {
    /// Construct a deduplicator with the given LRU capacity and rotation
    /// window. Capacity is clamped to >= 1.
    pub fn new(capacity: usize, rotation_interval: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            rotation_interval,
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    fn touch(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string());
        self.order.push_back(key.to_string());
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }
}

impl ContextDeduplicator for LruContextDeduplicator {
    fn flush_interval(&self) -> Option<Duration> {
        Some(self.rotation_interval)
    }

    fn process_context(&mut self, context: &Context) -> bool {
        self.touch(&context.dedup_key())
    }

    fn flush(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventflow_model::SingleContext;

    fn ctx(key: &str) -> Context {
        Context::single(SingleContext::new("user", key))
    }

    #[test]
    fn null_deduplicator_never_reports_new() {
        let mut d = NullContextDeduplicator;
        assert!(!d.process_context(&ctx("u1")));
        assert!(!d.process_context(&ctx("u1")));
        assert!(!d.process_context(&ctx("u2")));
    }

    #[test]
    fn lru_reports_new_once_then_false() {
        let mut d = LruContextDeduplicator::new(10, Duration::from_secs(60));
        assert!(d.process_context(&ctx("u1")));
        assert!(!d.process_context(&ctx("u1")));
        assert!(d.process_context(&ctx("u2")));
    }

    #[test]
    fn lru_forgets_everything_on_flush() {
        let mut d = LruContextDeduplicator::new(10, Duration::from_secs(60));
        assert!(d.process_context(&ctx("u1")));
        d.flush();
        assert!(d.process_context(&ctx("u1")));
    }

    #[test]
    fn lru_evicts_oldest_beyond_capacity() {
        let mut d = LruContextDeduplicator::new(2, Duration::from_secs(60));
        assert!(d.process_context(&ctx("u1")));
        assert!(d.process_context(&ctx("u2")));
        assert!(d.process_context(&ctx("u3"))); // evicts u1
        assert!(d.process_context(&ctx("u1"))); // forgotten, reports new again
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let d = LruContextDeduplicator::new(0, Duration::from_secs(60));
        assert_eq!(d.capacity, 1);
    }
}
