//! # Temporal Types: Epoch-Second Timestamps and Clocks
//!
//! Proof tokens carry their issuance time as Unix epoch seconds
//! (`time_stamp`). The Verifier compares that value against its own clock to
//! enforce the proof TTL, so the clock is injected through the [`Clock`]
//! trait rather than read from a global. Tests pin time with
//! [`FixedClock`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ZkPassError;

/// A UTC timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// From Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ZkPassError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| ZkPassError::InvalidProof(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Current time as non-negative Unix epoch seconds.
    fn now_epoch_secs(&self) -> u64 {
        u64::try_from(self.now().epoch_secs()).unwrap_or(0)
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock pinned to a settable instant.
#[derive(Debug, Default)]
pub struct FixedClock {
    epoch_secs: AtomicI64,
}

impl FixedClock {
    pub fn at_epoch_secs(secs: i64) -> Self {
        Self {
            epoch_secs: AtomicI64::new(secs),
        }
    }

    pub fn set_epoch_secs(&self, secs: i64) {
        self.epoch_secs.store(secs, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.epoch_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        Timestamp::from_epoch_secs(secs)
            .unwrap_or_else(|_| Timestamp::from_utc(DateTime::<Utc>::UNIX_EPOCH))
    }
}
