//! Durability strategy selector (spec §4.4).
//!
//! A factory that, given a declared [`DurabilityStrategyKind`], wires an
//! algorithm kernel to zero or more of {segment allocator, checkpoint
//! timer, per-request immediate save, graceful-shutdown save}.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};

use crate::checkpoint::DEFAULT_CHECKPOINT_INTERVAL;
use crate::kernel::{alphanumeric::AlphanumericDispenser, numeric_monotonic, numeric_random::NumericRandomDispenser, snowflake::SnowflakeDispenser, uuid::UuidDispenser};
use crate::segment::SegmentAllocator;
use crate::stats::StatsCounters;
use crate::time::WallClock;
use crate::{Dispenser, DispenserConfig, DispenserError, DispenserKind, DispenserStats, DurabilityStrategyKind, MonotonicMode, NullPersistence, PersistenceHook};

/// Tunables for the segment allocator and checkpoint timer, shared across
/// every segment-backed dispenser in the registry. Configurable from the
/// server's CLI surface (§6.3).
#[derive(Debug, Clone, Copy)]
pub struct DurabilityStrategy {
    pub segment_size: u64,
    pub refill_threshold: f64,
    pub checkpoint_interval: Duration,
}

impl Default for DurabilityStrategy {
    fn default() -> Self {
        Self {
            segment_size: 1000,
            refill_threshold: 0.1,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

/// A monotonic dispenser with no segment allocator, used by `memory` and
/// `elegant_close`, optionally persisting `current` after every successful
/// `next()` (`immediate_save`).
struct SimpleMonotonicDispenser {
    name: String,
    config: DispenserConfig,
    persistence: Arc<dyn PersistenceHook>,
    current: Mutex<i128>,
    immediate_save: bool,
    shutting_down: AtomicBool,
    stats: StatsCounters,
}

impl Dispenser for SimpleMonotonicDispenser {
    fn next(&self) -> Result<String, DispenserError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(DispenserError::Shutdown);
        }
        let mut current = self.current.lock();
        let (emitted, next_value) = numeric_monotonic::step(
            *current,
            self.config.step,
            self.config.monotonic_mode,
            self.config.length,
        )?;
        *current = next_value;
        self.stats.record_generated();

        if self.immediate_save {
            self.persistence.save(&self.name, &self.config, next_value)?;
        }

        Ok(emitted)
    }

    fn current(&self) -> Option<i128> {
        Some(*self.current.lock())
    }

    fn set_current(&self, value: i128) -> Result<(), DispenserError> {
        *self.current.lock() = value;
        Ok(())
    }

    fn stats(&self) -> DispenserStats {
        self.stats.snapshot()
    }

    fn info_fields(&self) -> Vec<(String, String)> {
        vec![(
            "incr_mode".to_string(),
            match self.config.monotonic_mode {
                MonotonicMode::FixedWidth => "fixed".to_string(),
                MonotonicMode::Sequence => "sequence".to_string(),
            },
        )]
    }

    fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        // `elegant_close` already persisted `current` after every `next()`;
        // this final save is an idempotent safety net, not extra waste
        // accounting (immediate-save strategies never accrue waste).
        let current = *self.current.lock();
        if let Err(err) = self.persistence.save(&self.name, &self.config, current) {
            tracing::warn!(dispenser = %self.name, %err, "graceful-shutdown save failed");
        }
    }
}

/// Builds the live [`Dispenser`] for `config`, wired according to
/// `config.durability`. `starting_current` is `config.starting` on first
/// creation, or the loaded snapshot position on startup replay.
pub fn build_dispenser(
    name: &str,
    config: &DispenserConfig,
    starting_current: i128,
    persistence: Arc<dyn PersistenceHook>,
    strategy: DurabilityStrategy,
) -> Result<Arc<dyn Dispenser>, DispenserError> {
    config.validate()?;

    match config.kind {
        DispenserKind::NumericRandom => {
            Ok(Arc::new(NumericRandomDispenser::new(config)))
        }
        DispenserKind::AlphanumericRandom => Ok(Arc::new(AlphanumericDispenser::new(config))),
        DispenserKind::Uuid => Ok(Arc::new(UuidDispenser::new(config))),
        DispenserKind::Snowflake => Ok(Arc::new(SnowflakeDispenser::new(config, WallClock))),
        DispenserKind::NumericMonotonic => build_monotonic(name, config, starting_current, persistence, strategy),
    }
}

fn build_monotonic(
    name: &str,
    config: &DispenserConfig,
    starting_current: i128,
    persistence: Arc<dyn PersistenceHook>,
    strategy: DurabilityStrategy,
) -> Result<Arc<dyn Dispenser>, DispenserError> {
    match config.durability {
        DurabilityStrategyKind::Memory => Ok(Arc::new(SimpleMonotonicDispenser {
            name: name.to_string(),
            config: config.clone(),
            persistence: Arc::new(NullPersistence),
            current: Mutex::new(starting_current),
            immediate_save: false,
            shutting_down: AtomicBool::new(false),
            stats: StatsCounters::default(),
        })),
        DurabilityStrategyKind::ElegantClose => {
            persistence.save(name, config, starting_current)?;
            Ok(Arc::new(SimpleMonotonicDispenser {
                name: name.to_string(),
                config: config.clone(),
                persistence,
                current: Mutex::new(starting_current),
                immediate_save: true,
                shutting_down: AtomicBool::new(false),
                stats: StatsCounters::default(),
            }))
        }
        DurabilityStrategyKind::PreBase => Ok(Arc::new(SegmentAllocator::new(
            name.to_string(),
            config.clone(),
            persistence,
            starting_current,
            strategy.segment_size,
            strategy.refill_threshold,
            None,
            false,
        )?)),
        DurabilityStrategyKind::PreCheckpoint => Ok(Arc::new(SegmentAllocator::new(
            name.to_string(),
            config.clone(),
            persistence,
            starting_current,
            strategy.segment_size,
            strategy.refill_threshold,
            Some(strategy.checkpoint_interval),
            false,
        )?)),
        DurabilityStrategyKind::PreClose => Ok(Arc::new(SegmentAllocator::new(
            name.to_string(),
            config.clone(),
            persistence,
            starting_current,
            strategy.segment_size,
            strategy.refill_threshold,
            Some(strategy.checkpoint_interval),
            true,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::NullPersistence;

    fn config(durability: DurabilityStrategyKind) -> DispenserConfig {
        DispenserConfig {
            kind: DispenserKind::NumericMonotonic,
            monotonic_mode: MonotonicMode::Sequence,
            step: 1,
            durability,
            ..Default::default()
        }
    }

    #[test]
    fn memory_has_no_waste_bookkeeping_and_resets_on_rebuild() {
        let d = build_dispenser(
            "m",
            &config(DurabilityStrategyKind::Memory),
            0,
            Arc::new(NullPersistence),
            DurabilityStrategy::default(),
        )
        .unwrap();
        assert_eq!(d.next().unwrap(), "0");
        assert_eq!(d.next().unwrap(), "1");
        // "restart" rebuilds from the same starting_current (nothing was
        // ever persisted under `memory`), losing all progress.
        let restarted = build_dispenser(
            "m",
            &config(DurabilityStrategyKind::Memory),
            0,
            Arc::new(NullPersistence),
            DurabilityStrategy::default(),
        )
        .unwrap();
        assert_eq!(restarted.next().unwrap(), "0");
    }

    #[test]
    fn elegant_close_persists_after_every_next() {
        struct Count(std::sync::atomic::AtomicUsize);
        impl PersistenceHook for Count {
            fn save(&self, _: &str, _: &DispenserConfig, _: i128) -> crate::Result<()> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
            fn remove(&self, _: &str) -> crate::Result<()> {
                Ok(())
            }
            fn flush(&self) -> crate::Result<()> {
                Ok(())
            }
        }
        let counter = Arc::new(Count(std::sync::atomic::AtomicUsize::new(0)));
        let d = build_dispenser(
            "e",
            &config(DurabilityStrategyKind::ElegantClose),
            0,
            counter.clone(),
            DurabilityStrategy::default(),
        )
        .unwrap();
        // one save at creation (initial position) plus one per next().
        d.next().unwrap();
        d.next().unwrap();
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn pre_close_zeroes_waste_on_graceful_shutdown() {
        let d = build_dispenser(
            "p",
            &config(DurabilityStrategyKind::PreClose),
            0,
            Arc::new(NullPersistence),
            DurabilityStrategy {
                segment_size: 20,
                ..Default::default()
            },
        )
        .unwrap();
        for _ in 0..5 {
            d.next().unwrap();
        }
        d.shutdown();
        assert_eq!(d.stats().wasted, 0);
    }

    #[test]
    fn pre_base_bounds_waste_by_segment_size_on_crash_shutdown() {
        let d = build_dispenser(
            "b",
            &config(DurabilityStrategyKind::PreBase),
            0,
            Arc::new(NullPersistence),
            DurabilityStrategy {
                segment_size: 20,
                ..Default::default()
            },
        )
        .unwrap();
        for _ in 0..5 {
            d.next().unwrap();
        }
        d.shutdown();
        assert!(d.stats().wasted <= 20);
        assert_eq!(d.stats().wasted, 15);
    }
}
