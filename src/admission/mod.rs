//! Per-client admission control.
//!
//! Every client key owns an independent token bucket, created lazily on first
//! sight and reclaimed by a background sweep once it has been idle for longer
//! than the configured TTL. Buckets live in a sharded map: checks for
//! different keys mostly land on different shards, and checks for the same key
//! are serialized by the shard guard held across the refill-then-consume step.

mod bucket;
mod clock;
mod reclaim;

pub use bucket::ClientBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use reclaim::{ReclaimHandle, ReclaimTask};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Tuning for an [`AdmissionController`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionSettings {
    /// Tokens added per second.
    pub rate_per_second: f64,
    /// Maximum burst size.
    pub burst: u32,
    /// Idle time after which a bucket may be reclaimed. Zero disables reclamation.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Period of the reclamation sweep. Zero disables reclamation.
    #[serde(with = "humantime_serde")]
    pub reclaim_interval: Duration,
}

impl AdmissionSettings {
    pub fn reclamation_enabled(&self) -> bool {
        !self.ttl.is_zero() && !self.reclaim_interval.is_zero()
    }
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self {
            rate_per_second: 10.0,
            burst: 20,
            ttl: Duration::from_secs(600),
            reclaim_interval: Duration::from_secs(60),
        }
    }
}

pub struct AdmissionController<C: Clock = SystemClock> {
    settings: AdmissionSettings,
    buckets: DashMap<String, ClientBucket>,
    clock: C,
}

impl AdmissionController<SystemClock> {
    pub fn new(settings: AdmissionSettings) -> Self {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> AdmissionController<C> {
    /// Build a controller reading time from `clock`.
    ///
    /// `rate_per_second` must be positive and finite and `burst` at least one;
    /// both are checked when configuration is loaded, so out-of-range values
    /// are clamped here rather than reported.
    pub fn with_clock(mut settings: AdmissionSettings, clock: C) -> Self {
        if !(settings.rate_per_second.is_finite() && settings.rate_per_second > 0.0) {
            settings.rate_per_second = f64::MIN_POSITIVE;
        }
        settings.burst = settings.burst.max(1);

        Self {
            settings,
            buckets: DashMap::new(),
            clock,
        }
    }

    pub fn settings(&self) -> &AdmissionSettings {
        &self.settings
    }

    /// Decide whether the client identified by `key` may proceed.
    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let ttl = self.settings.ttl;
        let reclaiming = self.settings.reclamation_enabled();

        if let Some(mut bucket) = self.buckets.get_mut(key) {
            if reclaiming && bucket.is_idle(now, ttl) {
                *bucket = self.fresh_bucket(now);
            }
            return bucket.try_acquire(now);
        }

        let mut bucket = self
            .buckets
            .entry(key.to_owned())
            .or_insert_with(|| self.fresh_bucket(now));
        bucket.try_acquire(now)
    }

    /// Remove every bucket idle for longer than the TTL. Returns how many
    /// were removed.
    pub fn reclaim(&self) -> usize {
        if !self.settings.reclamation_enabled() {
            return 0;
        }

        let now = self.clock.now();
        let ttl = self.settings.ttl;
        let mut removed = 0;

        self.buckets.retain(|_, bucket| {
            let idle = bucket.is_idle(now, ttl);
            removed += usize::from(idle);
            !idle
        });

        debug!(
            target: "catalog::admission",
            removed,
            remaining = self.buckets.len(),
            "Reclaimed idle client buckets"
        );
        removed
    }

    /// Number of clients currently holding a bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Token balance recorded for `key` at its last check, without refilling.
    pub fn tokens(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|bucket| bucket.tokens())
    }

    /// Whole seconds a rejected client should wait for one token to accrue.
    pub fn retry_after(&self, key: &str) -> u64 {
        let wait = match self.buckets.get(key) {
            Some(bucket) => bucket
                .time_until_available()
                .map_or(0.0, |wait| wait.as_secs_f64()),
            None => 1.0 / self.settings.rate_per_second,
        };

        // Float-to-int casts saturate, so an unbounded wait maps to u64::MAX.
        wait.ceil().max(1.0) as u64
    }

    fn fresh_bucket(&self, now: Instant) -> ClientBucket {
        ClientBucket::new(self.settings.burst, self.settings.rate_per_second, now)
    }
}
