//! Algorithm kernels, segment allocation, checkpointing, and durability
//! strategies for the identifier dispenser service.
//!
//! This crate owns the correctness-critical half of the system: the five
//! generation algorithms ([`kernel`]), the segment pre-allocation and
//! checkpointing machinery that bounds post-crash waste
//! ([`segment`], [`checkpoint`]), the factory that wires a kernel to one of
//! the five named durability tradeoffs ([`durability`]), and the named
//! registry that owns every live dispenser ([`registry`]).
//!
//! The wire protocol, the on-disk snapshot format, and the TCP server are
//! deliberately kept out of this crate; `dispenser-proto` and
//! `dispenser-server` consume the [`Dispenser`] trait and the
//! [`PersistenceHook`] trait defined here.

mod checkpoint;
mod config;
mod dispenser;
mod durability;
mod error;
pub mod kernel;
mod persistence;
mod registry;
mod segment;
mod stats;
mod time;

pub use checkpoint::CheckpointTimer;
pub use config::{
    AlphanumericCharset, DispenserConfig, DispenserKind, DurabilityStrategyKind, MonotonicMode,
    UuidFormat, MAX_ALPHANUMERIC_LENGTH, MAX_NUMERIC_LENGTH, MAX_NUMERIC_RANDOM_LENGTH,
};
pub use dispenser::Dispenser;
pub use durability::{DurabilityStrategy, build_dispenser};
pub use error::DispenserError;
pub use persistence::{NullPersistence, PersistenceHook};
pub use registry::{DispenserSnapshot, ReconfigureOutcome, Registry, MAX_NAME_LEN};
pub use segment::SegmentAllocator;
pub use stats::DispenserStats;
pub use time::{TWITTER_EPOCH, TimeSource, WallClock};

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, DispenserError>;
