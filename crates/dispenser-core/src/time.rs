//! Time sources for the snowflake kernel.
//!
//! Kept as a trait, the same way the teacher crate's `TimeSource` decouples
//! the snowflake kernel from `SystemTime` so tests can inject a fixed or
//! stepped clock.

use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC.
///
/// Fixed by the specification; every snowflake dispenser in this process
/// shares it regardless of `datacenter_id`/`machine_id`.
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// A source of the current wall-clock millisecond.
///
/// Abstracted so the snowflake kernel's clock-regression and spin-wait
/// behavior can be exercised deterministically in tests.
pub trait TimeSource: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// The real system clock, measured against [`UNIX_EPOCH`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_millis() as u64
    }
}
