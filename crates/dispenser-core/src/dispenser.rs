//! The capability set every kernel/durability combination implements
//! (spec §9: "the five algorithm kernels and the three durability wrappers
//! ... are expressed behind a small capability set").

use crate::{DispenserError, DispenserStats};

/// A live, named identifier generator.
///
/// Implementations own their per-dispenser lock internally; `next()` may
/// block the caller on that lock, on the persistence hook during a
/// synchronous segment allocation, or on the snowflake spin-wait, per §5.
pub trait Dispenser: Send + Sync {
    /// Produce the next identifier, or fail per §7.
    fn next(&self) -> Result<String, DispenserError>;

    /// The current monotonic position, if this kind tracks one. `None` for
    /// the three kinds with no persistent progress (random, alphanumeric,
    /// uuid).
    fn current(&self) -> Option<i128>;

    /// Used only by registry reconfiguration, to carry `current` across a
    /// durability-only swap (§4.5).
    fn set_current(&self, value: i128) -> Result<(), DispenserError>;

    /// A snapshot of `generated`/`wasted` counters for `info`.
    fn stats(&self) -> DispenserStats;

    /// Kind-specific fields rendered by `info`, in declaration order,
    /// excluding `name`, `type`, `current`, `auto_disk`, `generated`,
    /// `wasted`, `waste_rate` (added by the caller).
    fn info_fields(&self) -> Vec<(String, String)>;

    /// Stops any background tasks (checkpoint timer, pre-fetch) and runs
    /// this dispenser's graceful-shutdown save, per §4.4. Idempotent.
    fn shutdown(&self);
}
