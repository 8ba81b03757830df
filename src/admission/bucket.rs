use std::time::{Duration, Instant};

/// Throttling state for a single client.
#[derive(Debug, Clone)]
pub struct ClientBucket {
    capacity: u32,
    tokens: f64,
    refill_rate: f64, // tokens per second
    last_refill: Instant,
    last_seen: Instant,
}

impl ClientBucket {
    /// A fresh bucket starts full.
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Refill for the time elapsed since the last check, then take one token
    /// if a whole one is available. Both timestamps move on every call.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.last_seen = self.last_seen.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// True when the bucket has not been checked for longer than `ttl`.
    pub fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }

    /// Time until one whole token is available, `None` if one already is.
    pub fn time_until_available(&self) -> Option<Duration> {
        if self.tokens >= 1.0 {
            return None;
        }

        let tokens_needed = 1.0 - self.tokens;
        Some(Duration::try_from_secs_f64(tokens_needed / self.refill_rate).unwrap_or(Duration::MAX))
    }

    fn refill(&mut self, now: Instant) {
        // A caller that read the clock before a racing caller took the lock
        // sees `now < last_refill`; treat that as zero elapsed.
        let elapsed = now.saturating_duration_since(self.last_refill);
        let tokens_to_add = self.refill_rate * elapsed.as_secs_f64();

        self.tokens = (self.tokens + tokens_to_add).min(self.capacity as f64);
        self.last_refill = self.last_refill.max(now);
    }
}
