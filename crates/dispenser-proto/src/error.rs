//! Errors from framing, command parsing, and the snapshot file, layered on
//! top of [`dispenser_core::DispenserError`].

use dispenser_core::DispenserError;

/// Unified error type for everything above the dispenser engine itself.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// A dispenser operation failed; carries the engine's own kebab-case
    /// error kind through to the RESP error reply.
    #[error(transparent)]
    Dispenser(#[from] DispenserError),

    /// The request did not parse as a recognized command.
    #[error("unknown command: {command}")]
    UnknownCommand { command: String },

    /// A recognized command was missing a required argument or received a
    /// malformed one.
    #[error("wrong number of arguments for '{command}'")]
    WrongArity { command: String },

    /// A field name in `hset` is not one of the recognized configuration
    /// fields.
    #[error("unknown field: {field}")]
    UnknownField { field: String },

    /// A field value failed to parse as its expected type (integer, enum).
    #[error("invalid value for field '{field}': {value}")]
    InvalidFieldValue { field: String, value: String },

    /// The connection closed, or the frame was malformed at the byte level.
    #[error("protocol error: {reason}")]
    Framing { reason: String },

    /// The on-disk snapshot file could not be read, parsed, or written.
    #[error("snapshot error: {reason}")]
    Snapshot { reason: String },
}

impl ProtoError {
    /// The kebab-case error kind used as the RESP error reply's prefix.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dispenser(err) => err.kind(),
            Self::UnknownCommand { .. } => "unknown-command",
            Self::WrongArity { .. } => "wrong-arity",
            // Spec §7 classifies an unrecognized `hset` field name and an
            // out-of-range/malformed field value as the same wire kind as
            // any other bad configuration.
            Self::UnknownField { .. } | Self::InvalidFieldValue { .. } => "bad-config",
            Self::Framing { .. } => "protocol-error",
            Self::Snapshot { .. } => "snapshot-error",
        }
    }
}
