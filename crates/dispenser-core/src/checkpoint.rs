//! Checkpoint timer (spec §4.3).
//!
//! A single periodic background thread per dispenser that persists the
//! *actual* consumed position, bounding post-crash waste to one checkpoint
//! interval. Modeled as an OS thread with a stop flag rather than a tokio
//! task, per the "concurrency primitives" note in spec §9 — `dispenser-core`
//! has no async runtime dependency, and a periodic tick is exactly the kind
//! of thing that translates straight across.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use portable_atomic::{AtomicBool, AtomicI64, Ordering};

use crate::{DispenserConfig, PersistenceHook};

/// Default checkpoint period (spec §4.3).
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(2);

struct Shared {
    stop: AtomicBool,
    last_persisted: AtomicI64,
}

/// Periodically persists `current_fn()`'s value if it has moved since the
/// last tick.
pub struct CheckpointTimer {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl CheckpointTimer {
    /// Spawns the ticking thread. `current_fn` reads the dispenser's
    /// current position under its own lock and must not block for long.
    pub fn start<F>(
        name: String,
        config: DispenserConfig,
        persistence: Arc<dyn PersistenceHook>,
        interval: Duration,
        current_fn: F,
    ) -> Self
    where
        F: Fn() -> i128 + Send + 'static,
    {
        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            last_persisted: AtomicI64::new(i64::MIN),
        });
        let worker_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name(format!("checkpoint-{name}"))
            .spawn(move || {
                while !worker_shared.stop.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    if worker_shared.stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let current = current_fn();
                    let last = worker_shared.last_persisted.load(Ordering::Relaxed);
                    #[allow(clippy::cast_possible_truncation)]
                    if last == i64::MIN || current as i64 != last {
                        match persistence.save(&name, &config, current) {
                            Ok(()) => {
                                worker_shared
                                    .last_persisted
                                    .store(current as i64, Ordering::Relaxed);
                                tracing::debug!(dispenser = %name, %current, "checkpoint saved");
                            }
                            Err(err) => {
                                tracing::warn!(dispenser = %name, %err, "checkpoint save failed, retrying next tick");
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn checkpoint thread");

        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Stops the ticking thread and joins it. Idempotent.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CheckpointTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
