//! The persistence hook interface (spec §4.6).
//!
//! `dispenser-core` depends only on this trait; the concrete JSON
//! snapshot-file implementation lives in `dispenser-proto` so the core
//! engine never has an opinion about the on-disk format.

use crate::DispenserConfig;

/// A single primitive consumed by the core: commit `position` as the saved
/// state for `name`, along with its configuration so a reload can
/// reinstantiate it. `flush` forces any buffered writes to stable storage.
///
/// Implementations may coalesce multiple `save` calls into one underlying
/// file write; the core only assumes that after a successful `save` +
/// `flush`, a subsequent startup observes at least `position` for `name`
/// (spec I2).
pub trait PersistenceHook: Send + Sync {
    fn save(&self, name: &str, config: &DispenserConfig, position: i128) -> crate::Result<()>;

    /// Drops `name` from the snapshot entirely, for `del` and for a
    /// reconfiguration into `memory` (which persists nothing going
    /// forward and should not leave stale disk state behind).
    fn remove(&self, name: &str) -> crate::Result<()>;

    fn flush(&self) -> crate::Result<()>;
}

/// A no-op hook used by the `memory` durability strategy, which per §4.4
/// "has no persistence hook at all".
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPersistence;

impl PersistenceHook for NullPersistence {
    fn save(&self, _name: &str, _config: &DispenserConfig, _position: i128) -> crate::Result<()> {
        Ok(())
    }

    fn remove(&self, _name: &str) -> crate::Result<()> {
        Ok(())
    }

    fn flush(&self) -> crate::Result<()> {
        Ok(())
    }
}
