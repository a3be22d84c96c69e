//! The five algorithm kernels of spec §4.1.
//!
//! Each kernel is a pure function of its state plus the thinnest wrapper
//! needed to own that state. [`numeric_monotonic::step`] is kept as a
//! standalone pure function (no lock, no I/O) because it is also called
//! from inside [`crate::SegmentAllocator`]'s lock during segment rollover;
//! the other four kinds are simple enough to own their state directly.

pub mod alphanumeric;
pub mod numeric_monotonic;
pub mod numeric_random;
pub mod snowflake;
pub mod uuid;
