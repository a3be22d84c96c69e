//! Error types for the dispenser engine.
//!
//! Mirrors the flat, `thiserror`-derived error enum style used across the
//! rest of the system: one variant per named failure mode from the wire
//! protocol's error kinds, with `Display` messages a dispatcher can forward
//! to a client more or less verbatim.

/// Unified error type for dispenser configuration and generation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispenserError {
    /// Field value out of range, missing required field, or unknown field
    /// name.
    #[error("bad config: {reason}")]
    BadConfig { reason: String },

    /// An attempt to change a field other than `durability` on an existing
    /// dispenser. Lists every rejected field.
    #[error("config immutable: rejected fields [{}]", rejected.join(", "))]
    ConfigImmutable { rejected: Vec<String> },

    /// `get`/`info`/`del` named a dispenser that does not exist.
    #[error("unknown dispenser: {name}")]
    UnknownDispenser { name: String },

    /// Numeric-monotonic past its cap, or numeric-random past its 80%
    /// threshold or 100-retry budget.
    #[error("exhausted: {reason}")]
    Exhausted { reason: String },

    /// The persistence hook failed on a path that cannot proceed without it.
    #[error("persistence failed: {reason}")]
    PersistenceFailed { reason: String },

    /// A snowflake dispenser observed wall-clock time moving backward.
    #[error("clock regression: observed {observed_ms}ms behind last seen {last_ms}ms")]
    ClockRegression { last_ms: u64, observed_ms: u64 },

    /// `next()` was called after graceful shutdown began.
    #[error("dispenser is shutting down")]
    Shutdown,
}

impl DispenserError {
    /// The kebab-case wire error kind used as the RESP error prefix, per the
    /// protocol's error-kind convention.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadConfig { .. } => "bad-config",
            Self::ConfigImmutable { .. } => "config-immutable",
            Self::UnknownDispenser { .. } => "unknown-dispenser",
            Self::Exhausted { .. } => "exhausted",
            Self::PersistenceFailed { .. } => "persistence-failed",
            Self::ClockRegression { .. } => "clock-regression",
            Self::Shutdown => "shutdown",
        }
    }
}
