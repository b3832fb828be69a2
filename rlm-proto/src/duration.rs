//! A stable wire-format duration type.
//!
//! Wraps `u64` milliseconds rather than `std::time::Duration` so that the
//! serialized form never changes shape (plain integer, not a
//! `{secs, nanos}` struct) as the engine evolves.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A duration expressed in whole milliseconds, serializing as a plain `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DurationMs(pub u64);

impl DurationMs {
    /// Zero duration.
    pub const ZERO: Self = Self(0);

    /// Construct from whole milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Construct from a `std::time::Duration`, saturating at `u64::MAX` ms.
    pub fn from_std(d: Duration) -> Self {
        Self(d.as_millis().min(u64::MAX as u128) as u64)
    }

    /// Convert to `std::time::Duration`.
    pub fn to_std(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<Duration> for DurationMs {
    fn from(d: Duration) -> Self {
        Self::from_std(d)
    }
}

impl From<DurationMs> for Duration {
    fn from(d: DurationMs) -> Self {
        d.to_std()
    }
}
