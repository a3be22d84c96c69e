//! Segment allocator (spec §4.2) for the two monotonic kinds under the
//! three segment-backed durability strategies (`pre-base`, `pre-checkpoint`,
//! `pre_close`).
//!
//! Holds the live `[current, segment_end)` half-open range, commits a new
//! range's end through the persistence hook before any value in it is
//! handed out (I2), and asynchronously pre-fetches the next range once the
//! live one is mostly consumed.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};

use crate::checkpoint::CheckpointTimer;
use crate::kernel::numeric_monotonic;
use crate::stats::StatsCounters;
use crate::{Dispenser, DispenserConfig, DispenserError, DispenserStats, MonotonicMode, PersistenceHook};

struct SegmentState {
    current: i128,
    segment_end: i128,
}

/// Allocates and commits `[start, start + segment_size*step)`, clamped to
/// the fixed-width cap if applicable. The commit happens before this
/// function returns success, satisfying I2.
fn commit_segment(
    start: i128,
    segment_size: u64,
    step: i128,
    mode: MonotonicMode,
    name: &str,
    config: &DispenserConfig,
    persistence: &dyn PersistenceHook,
) -> Result<(i128, i128), DispenserError> {
    let mut end = start + step * i128::from(segment_size);
    if mode == MonotonicMode::FixedWidth {
        let cap = config.fixed_width_cap();
        if start > cap {
            return Err(DispenserError::Exhausted {
                reason: format!("numeric-monotonic exceeded fixed-width cap {cap}"),
            });
        }
        if end > cap + 1 {
            end = cap + 1;
        }
    }
    persistence.save(name, config, end)?;
    Ok((start, end))
}

/// A monotonic dispenser backed by pre-committed segments, with an optional
/// checkpoint timer and an optional tight graceful-shutdown save, per the
/// `pre-base` / `pre-checkpoint` / `pre_close` rows of the durability table
/// in §4.4.
pub struct SegmentAllocator {
    name: String,
    config: DispenserConfig,
    persistence: Arc<dyn PersistenceHook>,
    segment_size: u64,
    refill_threshold: f64,
    state: Arc<Mutex<SegmentState>>,
    prepared: Arc<Mutex<Option<(i128, i128)>>>,
    prefetch_in_flight: Arc<AtomicBool>,
    checkpoint: Mutex<Option<CheckpointTimer>>,
    graceful_save_current: bool,
    shutting_down: AtomicBool,
    stats: StatsCounters,
}

impl SegmentAllocator {
    /// Allocates the initial segment synchronously (so creation itself
    /// satisfies I2), then optionally starts the checkpoint timer.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        config: DispenserConfig,
        persistence: Arc<dyn PersistenceHook>,
        starting_current: i128,
        segment_size: u64,
        refill_threshold: f64,
        checkpoint_interval: Option<Duration>,
        graceful_save_current: bool,
    ) -> Result<Self, DispenserError> {
        let (start, end) = commit_segment(
            starting_current,
            segment_size,
            config.step,
            config.monotonic_mode,
            &name,
            &config,
            persistence.as_ref(),
        )?;

        let allocator = Self {
            name,
            config,
            persistence,
            segment_size,
            refill_threshold,
            state: Arc::new(Mutex::new(SegmentState {
                current: start,
                segment_end: end,
            })),
            prepared: Arc::new(Mutex::new(None)),
            prefetch_in_flight: Arc::new(AtomicBool::new(false)),
            checkpoint: Mutex::new(None),
            graceful_save_current,
            shutting_down: AtomicBool::new(false),
            stats: StatsCounters::default(),
        };

        if let Some(interval) = checkpoint_interval {
            allocator.start_checkpoint(interval);
        }

        Ok(allocator)
    }

    fn start_checkpoint(&self, interval: Duration) {
        let state = Arc::clone(&self.state);
        let current_fn = move || state.lock().current;
        let timer = CheckpointTimer::start(
            self.name.clone(),
            self.config.clone(),
            Arc::clone(&self.persistence),
            interval,
            current_fn,
        );
        *self.checkpoint.lock() = Some(timer);
    }

    fn spawn_prefetch(&self, from: i128) {
        let persistence = Arc::clone(&self.persistence);
        let name = self.name.clone();
        let config = self.config.clone();
        let segment_size = self.segment_size;
        let prepared = Arc::clone(&self.prepared);
        let in_flight = Arc::clone(&self.prefetch_in_flight);

        let spawned = thread::Builder::new()
            .name(format!("prefetch-{}", self.name))
            .spawn(move || {
                match commit_segment(
                    from,
                    segment_size,
                    config.step,
                    config.monotonic_mode,
                    &name,
                    &config,
                    persistence.as_ref(),
                ) {
                    Ok(pair) => *prepared.lock() = Some(pair),
                    Err(err) => {
                        tracing::warn!(dispenser = %name, %err, "pre-fetch failed, next rollover will retry synchronously");
                    }
                }
                in_flight.store(false, Ordering::Release);
            });

        if spawned.is_err() {
            self.prefetch_in_flight.store(false, Ordering::Release);
        }
    }
}

impl Dispenser for SegmentAllocator {
    fn next(&self) -> Result<String, DispenserError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(DispenserError::Shutdown);
        }

        let mut state = self.state.lock();

        if state.current >= state.segment_end {
            let mut prepared = self.prepared.lock();
            let reused = prepared.take().filter(|(s, _)| *s == state.segment_end);
            drop(prepared);
            let new_end = match reused {
                Some((_, e)) => e,
                None => {
                    let (_, e) = commit_segment(
                        state.segment_end,
                        self.segment_size,
                        self.config.step,
                        self.config.monotonic_mode,
                        &self.name,
                        &self.config,
                        self.persistence.as_ref(),
                    )?;
                    e
                }
            };
            state.segment_end = new_end;
        }

        let (emitted, next_current) = numeric_monotonic::step(
            state.current,
            self.config.step,
            self.config.monotonic_mode,
            self.config.length,
        )?;
        state.current = next_current;
        self.stats.record_generated();

        let step = self.config.step.max(1);
        let window = i128::from(self.segment_size) * step;
        let remaining = if window > 0 {
            (state.segment_end - state.current) as f64 / window as f64
        } else {
            0.0
        };
        let segment_end = state.segment_end;
        drop(state);

        if remaining <= self.refill_threshold {
            let prepared = self.prepared.lock();
            if prepared.is_none() && !self.prefetch_in_flight.swap(true, Ordering::AcqRel) {
                drop(prepared);
                self.spawn_prefetch(segment_end);
            }
        }

        Ok(emitted)
    }

    fn current(&self) -> Option<i128> {
        Some(self.state.lock().current)
    }

    fn set_current(&self, value: i128) -> Result<(), DispenserError> {
        let mut state = self.state.lock();
        state.current = value;
        if value > state.segment_end {
            state.segment_end = value;
        }
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

        if let Some(timer) = self.checkpoint.lock().as_mut() {
            timer.stop();
        }

        let state = self.state.lock();
        if self.graceful_save_current {
            if let Err(err) = self.persistence.save(&self.name, &self.config, state.current) {
                tracing::warn!(dispenser = %self.name, %err, "graceful-shutdown save failed");
            }
        } else {
            let gap = state.segment_end - state.current;
            if gap > 0 {
                self.stats
                    .record_wasted(u64::try_from(gap).unwrap_or(u64::MAX));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::NullPersistence;
    use crate::DispenserKind;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingPersistence {
        saves: StdMutex<Vec<i128>>,
    }

    impl PersistenceHook for RecordingPersistence {
        fn save(&self, _name: &str, _config: &DispenserConfig, position: i128) -> crate::Result<()> {
            self.saves.lock().unwrap().push(position);
            Ok(())
        }

        fn remove(&self, _name: &str) -> crate::Result<()> {
            Ok(())
        }

        fn flush(&self) -> crate::Result<()> {
            Ok(())
        }
    }

    fn config() -> DispenserConfig {
        DispenserConfig {
            kind: DispenserKind::NumericMonotonic,
            monotonic_mode: MonotonicMode::Sequence,
            step: 1,
            ..Default::default()
        }
    }

    #[test]
    fn commits_before_issuing_and_rolls_over() {
        let persistence = Arc::new(RecordingPersistence::default());
        let allocator = SegmentAllocator::new(
            "d".to_string(),
            config(),
            persistence.clone(),
            0,
            3,
            0.0,
            None,
            false,
        )
        .unwrap();

        // segment [0, 3) committed at construction.
        assert_eq!(*persistence.saves.lock().unwrap(), vec![3]);

        assert_eq!(allocator.next().unwrap(), "0");
        assert_eq!(allocator.next().unwrap(), "1");
        assert_eq!(allocator.next().unwrap(), "2");
        // rollover commits [3, 6) synchronously since refill_threshold is 0.
        assert_eq!(allocator.next().unwrap(), "3");
        assert_eq!(*persistence.saves.lock().unwrap(), vec![3, 6]);
    }

    #[test]
    fn shutdown_without_graceful_save_records_waste() {
        let allocator = SegmentAllocator::new(
            "d".to_string(),
            config(),
            Arc::new(NullPersistence),
            0,
            10,
            0.0,
            None,
            false,
        )
        .unwrap();
        allocator.next().unwrap();
        allocator.next().unwrap();
        allocator.shutdown();
        // segment committed [0,10); two consumed, eight unreachable.
        assert_eq!(allocator.stats().wasted, 8);
    }

    #[test]
    fn shutdown_with_graceful_save_records_no_waste() {
        let persistence = Arc::new(RecordingPersistence::default());
        let allocator = SegmentAllocator::new(
            "d".to_string(),
            config(),
            persistence.clone(),
            0,
            10,
            0.0,
            None,
            true,
        )
        .unwrap();
        allocator.next().unwrap();
        allocator.next().unwrap();
        allocator.shutdown();
        assert_eq!(allocator.stats().wasted, 0);
        assert_eq!(*persistence.saves.lock().unwrap(), vec![10, 2]);
    }

    #[test]
    fn next_after_shutdown_fails() {
        let allocator = SegmentAllocator::new(
            "d".to_string(),
            config(),
            Arc::new(NullPersistence),
            0,
            5,
            0.0,
            None,
            false,
        )
        .unwrap();
        allocator.shutdown();
        assert!(matches!(
            allocator.next().unwrap_err(),
            DispenserError::Shutdown
        ));
    }
}
