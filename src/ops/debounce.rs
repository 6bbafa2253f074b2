use std::time::{Duration, Instant};

/// Default quiet period before a typed query is applied
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds the latest typed search query until input has been quiet for the
/// window. A newer `push` supersedes any pending one.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    window: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        SearchDebouncer {
            window,
            pending: None,
        }
    }

    /// Record a keystroke's full query text at time `at`.
    pub fn push(&mut self, query: impl Into<String>, at: Instant) {
        self.pending = Some((query.into(), at));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending query, once `window` has elapsed since the latest push.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= self.window);
        if ready {
            self.pending.take().map(|(q, _)| q)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_quiet_window() {
        let t0 = Instant::now();
        let mut d = SearchDebouncer::new(Duration::from_millis(300));
        d.push("mi", t0);
        assert_eq!(d.poll(t0 + Duration::from_millis(299)), None);
        assert_eq!(
            d.poll(t0 + Duration::from_millis(300)).as_deref(),
            Some("mi")
        );
        // Fires once
        assert_eq!(d.poll(t0 + Duration::from_millis(900)), None);
        assert!(!d.is_pending());
    }

    #[test]
    fn later_keystroke_supersedes_earlier() {
        let t0 = Instant::now();
        let mut d = SearchDebouncer::default();
        d.push("m", t0);
        d.push("mil", t0 + Duration::from_millis(200));
        // 300ms after the first push, but only 100ms after the latest
        assert_eq!(d.poll(t0 + Duration::from_millis(300)), None);
        assert_eq!(
            d.poll(t0 + Duration::from_millis(500)).as_deref(),
            Some("mil")
        );
    }
}
