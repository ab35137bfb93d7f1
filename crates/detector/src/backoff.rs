use std::time::Duration;

/// Doubling retry schedule with a hard cap.
///
/// `next_delay` returns `None` once the doubled delay would exceed the cap;
/// the episode is over until `reset` re-arms it. With the 5s/120s defaults
/// the sequence is 5s, 10s, 20s, 40s, 80s, stop.
#[derive(Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: None,
        }
    }

    pub fn next_delay(&mut self) -> Option<Duration> {
        let next = match self.current {
            None => self.initial,
            Some(previous) => previous.saturating_mul(2),
        };
        if next > self.max {
            return None;
        }
        self.current = Some(next);
        Some(next)
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}
