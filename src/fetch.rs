// Only the most recent request of a view may update it. Older responses that arrive late are
// dropped instead of overwriting newer state.

use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
    name: &'static str,
}

impl RequestTracker {
    pub fn named(name: &'static str) -> Self {
        Self { latest: 0, name }
    }

    /// Issues the ticket for a new request, superseding every earlier one.
    pub fn begin(&mut self) -> Generation {
        self.latest += 1;
        Generation(self.latest)
    }

    /// Supersedes outstanding requests without starting a new one.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.latest
    }

    pub fn accept<T>(&self, generation: Generation, value: T) -> Option<T> {
        if self.is_current(generation) {
            Some(value)
        } else {
            debug!(
                "Discarding stale {} response (generation {}, latest {})",
                self.name, generation.0, self.latest
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superseded_response_is_discarded() {
        let mut tracker = RequestTracker::named("sensor data");
        let first = tracker.begin();
        let second = tracker.begin();
        assert_eq!(tracker.accept(first, "old"), None);
        assert_eq!(tracker.accept(second, "new"), Some("new"));
    }

    #[test]
    fn test_invalidate_drops_outstanding_request() {
        let mut tracker = RequestTracker::default();
        let pending = tracker.begin();
        tracker.invalidate();
        assert!(!tracker.is_current(pending));
        let next = tracker.begin();
        assert!(next > pending);
        assert!(tracker.is_current(next));
    }
}
