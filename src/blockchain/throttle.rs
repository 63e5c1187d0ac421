// src/blockchain/throttle.rs

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// Best-effort minimum-interval gate between repeated identical operations.
///
/// Keeps the last-invocation instant per operation key in process memory.
/// Not a mutex: two concurrent callers racing on the same key may both pass,
/// which is acceptable because throttling is a cost-reduction heuristic, not
/// a correctness mechanism.
#[derive(Debug)]
pub struct ThrottleGuard {
    last_call: DashMap<String, Instant>,
    min_interval: Duration,
}

impl ThrottleGuard {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: DashMap::new(),
            min_interval,
        }
    }

    /// True (recording now as the last call) when enough time has elapsed
    /// since the previous recorded call for `key`. False otherwise, without
    /// touching the record.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_within(key, self.min_interval)
    }

    pub fn allow_within(&self, key: &str, min_interval: Duration) -> bool {
        let now = Instant::now();

        if let Some(last) = self.last_call.get(key) {
            let elapsed = now.duration_since(*last);
            if elapsed < min_interval {
                debug!(
                    "throttled '{}', last call was {}ms ago",
                    key,
                    elapsed.as_millis()
                );
                return false;
            }
        }

        self.last_call.insert(key.to_string(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_passes_second_is_blocked() {
        let guard = ThrottleGuard::new(Duration::from_secs(2));
        assert!(guard.allow("getPolls"));
        assert!(!guard.allow("getPolls"));
    }

    #[test]
    fn keys_are_independent() {
        let guard = ThrottleGuard::new(Duration::from_secs(2));
        assert!(guard.allow("getPoll_1"));
        assert!(guard.allow("getPoll_2"));
        assert!(!guard.allow("getPoll_1"));
    }

    #[test]
    fn passes_again_after_the_interval() {
        let guard = ThrottleGuard::new(Duration::from_millis(10));
        assert!(guard.allow("getPolls"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(guard.allow("getPolls"));
    }

    #[test]
    fn blocked_calls_do_not_reset_the_window() {
        let guard = ThrottleGuard::new(Duration::from_millis(40));
        assert!(guard.allow("getPolls"));

        std::thread::sleep(Duration::from_millis(25));
        // Still inside the window; must not push the window forward.
        assert!(!guard.allow("getPolls"));

        std::thread::sleep(Duration::from_millis(25));
        // 50ms since the recorded call, so the gate opens.
        assert!(guard.allow("getPolls"));
    }
}
