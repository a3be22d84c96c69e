//! Snowflake kernel (spec §4.1, invariant I5).
//!
//! Layout: `(Δms << 22) | (datacenter_id & 0x1F) << 17 | (machine_id &
//! 0x1F) << 12 | sequence`, where `Δms` is milliseconds since
//! [`crate::TWITTER_EPOCH`] and `sequence` is a 12-bit counter.
//!
//! Clock regression is resolved per the open question in §9: the source's
//! behavior was unspecified there, and this implementation takes the
//! spec's own "safe choice" and fails with `clock-regression` rather than
//! silently waiting or rewinding.

use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::stats::StatsCounters;
use crate::{Dispenser, DispenserConfig, DispenserError, DispenserStats, TWITTER_EPOCH, TimeSource};

const SEQUENCE_BITS: u32 = 12;
const MACHINE_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

struct SnowflakeState {
    last_timestamp_ms: u64,
    sequence: u16,
}

pub struct SnowflakeDispenser<T: TimeSource> {
    machine_id: u8,
    datacenter_id: u8,
    clock: T,
    state: Mutex<SnowflakeState>,
    stats: StatsCounters,
}

impl<T: TimeSource> SnowflakeDispenser<T> {
    pub fn new(config: &DispenserConfig, clock: T) -> Self {
        Self {
            machine_id: config.machine_id,
            datacenter_id: config.datacenter_id,
            clock,
            state: Mutex::new(SnowflakeState {
                last_timestamp_ms: 0,
                sequence: 0,
            }),
            stats: StatsCounters::default(),
        }
    }

    fn epoch_ms() -> u64 {
        TWITTER_EPOCH.as_millis() as u64
    }
}

impl<T: TimeSource> Dispenser for SnowflakeDispenser<T> {
    fn next(&self) -> Result<String, DispenserError> {
        let mut state = self.state.lock();
        let epoch = Self::epoch_ms();

        loop {
            let now = self.clock.now_millis();

            if now < state.last_timestamp_ms {
                return Err(DispenserError::ClockRegression {
                    last_ms: state.last_timestamp_ms,
                    observed_ms: now,
                });
            }

            if now == state.last_timestamp_ms {
                let next_seq = (u64::from(state.sequence) + 1) & SEQUENCE_MASK;
                if next_seq == 0 {
                    // Sequence wrapped: busy-wait until the clock advances.
                    thread::sleep(Duration::from_micros(100));
                    continue;
                }
                state.sequence = next_seq as u16;
            } else {
                state.last_timestamp_ms = now;
                state.sequence = 0;
            }

            let delta = now - epoch;
            let id = (delta << 22)
                | (u64::from(self.datacenter_id & 0x1F) << 17)
                | (u64::from(self.machine_id & 0x1F) << 12)
                | u64::from(state.sequence);

            self.stats.record_generated();
            return Ok(id.to_string());
        }
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
        vec![
            ("machine_id".to_string(), self.machine_id.to_string()),
            ("datacenter_id".to_string(), self.datacenter_id.to_string()),
        ]
    }

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DispenserKind;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct SteppedClock {
        millis: AtomicU64,
    }

    impl TimeSource for SteppedClock {
        fn now_millis(&self) -> u64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    fn config() -> DispenserConfig {
        DispenserConfig {
            kind: DispenserKind::Snowflake,
            machine_id: 1,
            datacenter_id: 2,
            ..Default::default()
        }
    }

    #[test]
    fn same_millisecond_differs_in_low_bits() {
        let clock = SteppedClock {
            millis: AtomicU64::new(TWITTER_EPOCH.as_millis() as u64 + 1000),
        };
        let d = SnowflakeDispenser::new(&config(), clock);
        let a: u64 = d.next().unwrap().parse().unwrap();
        let b: u64 = d.next().unwrap().parse().unwrap();
        assert_ne!(a & 0xFFF, b & 0xFFF);
        assert_eq!(a & !0xFFFu64, b & !0xFFFu64);
    }

    #[test]
    fn strictly_increasing_across_milliseconds() {
        let base = TWITTER_EPOCH.as_millis() as u64 + 1000;
        let clock = SteppedClock {
            millis: AtomicU64::new(base),
        };
        let d = SnowflakeDispenser::new(&config(), clock);
        let mut prev: u64 = d.next().unwrap().parse().unwrap();
        for step in 1..5 {
            d.clock.millis.store(base + step, Ordering::SeqCst);
            let id: u64 = d.next().unwrap().parse().unwrap();
            assert!(id > prev);
            prev = id;
        }
    }

    #[test]
    fn clock_regression_is_reported() {
        let base = TWITTER_EPOCH.as_millis() as u64 + 1000;
        let clock = SteppedClock {
            millis: AtomicU64::new(base),
        };
        let d = SnowflakeDispenser::new(&config(), clock);
        d.next().unwrap();
        d.clock.millis.store(base - 1, Ordering::SeqCst);
        let err = d.next().unwrap_err();
        assert!(matches!(err, DispenserError::ClockRegression { .. }));
    }
}
