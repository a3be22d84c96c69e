//! Numeric-random kernel (spec §4.1, invariants I3/I4).
//!
//! Self-contained: unlike the monotonic kernel, this kind has no persistent
//! progress, so it owns its `issued` set and RNG directly and implements
//! [`crate::Dispenser`] itself rather than being composed by the durability
//! factory.

use std::collections::HashSet;

use parking_lot::Mutex;
use rand::Rng;

use crate::stats::StatsCounters;
use crate::{Dispenser, DispenserConfig, DispenserError, DispenserStats};

/// A numeric-random dispenser never hands out the same string twice (I3)
/// and refuses requests once 80% of its space is issued (I4).
pub struct NumericRandomDispenser {
    length: u32,
    space: u64,
    low: u64,
    issued: Mutex<HashSet<String>>,
    stats: StatsCounters,
}

const MAX_DRAW_RETRIES: u32 = 100;
const EXHAUSTION_RATIO: f64 = 0.8;

impl NumericRandomDispenser {
    pub fn new(config: &DispenserConfig) -> Self {
        let length = config.length;
        let low = 10u64.pow(length.saturating_sub(1));
        let space = config.numeric_random_space();
        Self {
            length,
            space,
            low,
            issued: Mutex::new(HashSet::new()),
            stats: StatsCounters::default(),
        }
    }
}

impl Dispenser for NumericRandomDispenser {
    fn next(&self) -> Result<String, DispenserError> {
        let mut issued = self.issued.lock();

        // Threshold is the smallest issued-count at which |issued|/space
        // exceeds 0.8; for round spaces this lands exactly on 0.8 (e.g.
        // 72/90), so the check is phrased as "at or past" the ceiling
        // rather than a strict floating-point `>`.
        let threshold = (EXHAUSTION_RATIO * self.space as f64).ceil() as usize;
        if issued.len() >= threshold {
            return Err(DispenserError::Exhausted {
                reason: format!(
                    "numeric-random at {}/{} (threshold {threshold})",
                    issued.len(),
                    self.space
                ),
            });
        }

        let mut rng = rand::thread_rng();
        for _ in 0..MAX_DRAW_RETRIES {
            let draw = self.low + rng.gen_range(0..self.space);
            let candidate = format!("{draw:0width$}", width = self.length as usize);
            if issued.insert(candidate.clone()) {
                self.stats.record_generated();
                return Ok(candidate);
            }
        }

        Err(DispenserError::Exhausted {
            reason: format!("numeric-random exceeded {MAX_DRAW_RETRIES} collision retries"),
        })
    }

    fn current(&self) -> Option<i128> {
        None
    }

    fn set_current(&self, _value: i128) -> Result<(), DispenserError> {
        Ok(())
    }

    fn stats(&self) -> DispenserStats {
        self.stats.snapshot()
    }

    fn info_fields(&self) -> Vec<(String, String)> {
        vec![("length".to_string(), self.length.to_string())]
    }

    fn shutdown(&self) {}
}
