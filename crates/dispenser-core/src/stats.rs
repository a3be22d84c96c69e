//! Per-dispenser generation statistics.

use portable_atomic::{AtomicU64, Ordering};

/// Counters tracked by every dispenser kind, per spec §3 ("All kinds:
/// statistics counters `generated`, `wasted`").
///
/// `wasted` is only ever incremented for the two monotonic kinds; random,
/// alphanumeric, and UUID dispensers always report zero.
#[derive(Debug, Default)]
pub struct StatsCounters {
    generated: AtomicU64,
    wasted: AtomicU64,
}

impl StatsCounters {
    pub fn record_generated(&self) {
        self.generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_wasted(&self, amount: u64) {
        self.wasted.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispenserStats {
        DispenserStats {
            generated: self.generated.load(Ordering::Relaxed),
            wasted: self.wasted.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of a dispenser's counters, as reported by `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispenserStats {
    pub generated: u64,
    pub wasted: u64,
}

impl DispenserStats {
    /// `wasted / generated`, or `0.0` if nothing has been generated yet.
    pub fn waste_rate(&self) -> f64 {
        if self.generated == 0 {
            0.0
        } else {
            self.wasted as f64 / self.generated as f64
        }
    }
}
