//! Dispenser registry and lifecycle (spec §4.5).
//!
//! Named mapping from dispenser name to a live dispenser; at most one live
//! dispenser per name. Owns creation, reconfiguration (durability-only),
//! deletion, startup replay from the snapshot, and orchestrated shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::durability::{build_dispenser, DurabilityStrategy};
use crate::{Dispenser, DispenserConfig, DispenserError, DispenserStats, PersistenceHook};

/// Maximum dispenser name length, per the wire protocol's naming rule.
pub const MAX_NAME_LEN: usize = 128;

fn validate_name(name: &str) -> Result<(), DispenserError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(DispenserError::BadConfig {
            reason: format!("dispenser name must be 1..{MAX_NAME_LEN} bytes, got {}", name.len()),
        });
    }
    Ok(())
}

struct Entry {
    dispenser: Arc<dyn Dispenser>,
    config: DispenserConfig,
}

/// The outcome of a `hset` command, distinguishing a brand-new dispenser
/// from a durability-only swap from a no-op reconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconfigureOutcome {
    Created,
    Reconfigured,
    Unchanged,
}

/// A point-in-time rendering of one dispenser's state, enough to build an
/// `info` reply without the caller needing to know about [`Dispenser`].
#[derive(Debug, Clone)]
pub struct DispenserSnapshot {
    pub config: DispenserConfig,
    pub current: Option<i128>,
    pub stats: DispenserStats,
    pub kind_fields: Vec<(String, String)>,
}

pub struct Registry {
    entries: RwLock<HashMap<String, Entry>>,
    persistence: Arc<dyn PersistenceHook>,
    strategy: DurabilityStrategy,
}

impl Registry {
    pub fn new(persistence: Arc<dyn PersistenceHook>, strategy: DurabilityStrategy) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            persistence,
            strategy,
        }
    }

    /// Replays the on-disk snapshot at startup. `loaded` is `(name, config,
    /// saved_position)` for every entry the snapshot file contained; per I1
    /// the live `current` for each is set from `saved_position`.
    pub fn load(&self, loaded: Vec<(String, DispenserConfig, i128)>) -> Result<(), DispenserError> {
        let mut entries = self.entries.write();
        for (name, config, position) in loaded {
            config.validate()?;
            let dispenser = build_dispenser(&name, &config, position, Arc::clone(&self.persistence), self.strategy)?;
            entries.insert(name, Entry { dispenser, config });
        }
        Ok(())
    }

    /// `hset`: create a new dispenser, or reconfigure an existing one's
    /// durability strategy. Any other field difference fails with
    /// `config-immutable`.
    pub fn create_or_reconfigure(
        &self,
        name: &str,
        incoming: DispenserConfig,
    ) -> Result<ReconfigureOutcome, DispenserError> {
        validate_name(name)?;
        incoming.validate()?;

        let mut entries = self.entries.write();

        match entries.get(name) {
            None => {
                let dispenser = build_dispenser(
                    name,
                    &incoming,
                    incoming.starting,
                    Arc::clone(&self.persistence),
                    self.strategy,
                )?;
                entries.insert(
                    name.to_string(),
                    Entry {
                        dispenser,
                        config: incoming,
                    },
                );
                Ok(ReconfigureOutcome::Created)
            }
            Some(existing) => {
                let rejected = existing.config.rejected_fields(&incoming);
                if !rejected.is_empty() {
                    return Err(DispenserError::ConfigImmutable { rejected });
                }

                if existing.config.durability == incoming.durability {
                    return Ok(ReconfigureOutcome::Unchanged);
                }

                // Durability only has an effect on the two monotonic kinds
                // (§4.4); for the other three, changing it would silently
                // reset a live generator (the numeric-random `issued` set,
                // in particular) for no observable benefit, so it is
                // immutable there too.
                if existing.config.kind != crate::DispenserKind::NumericMonotonic {
                    return Err(DispenserError::ConfigImmutable {
                        rejected: vec!["auto_disk".to_string()],
                    });
                }

                let carried_current = existing.dispenser.current().unwrap_or(incoming.starting);
                // Stops the outgoing dispenser's checkpoint timer (and runs
                // its own graceful-shutdown bookkeeping, which is harmless
                // here since this object and its stats are about to be
                // discarded in favor of the freshly built one).
                existing.dispenser.shutdown();

                let dispenser = build_dispenser(
                    name,
                    &incoming,
                    carried_current,
                    Arc::clone(&self.persistence),
                    self.strategy,
                )?;

                if incoming.durability == crate::DurabilityStrategyKind::Memory {
                    self.persistence.remove(name)?;
                }

                entries.insert(
                    name.to_string(),
                    Entry {
                        dispenser,
                        config: incoming,
                    },
                );
                Ok(ReconfigureOutcome::Reconfigured)
            }
        }
    }

    /// The live configuration for `name`, if it already exists. Lets a
    /// caller merging `hset` fields onto the right base decide whether
    /// `type` is required (creation) or may be omitted (reconfiguration).
    pub fn config(&self, name: &str) -> Option<DispenserConfig> {
        self.entries.read().get(name).map(|entry| entry.config.clone())
    }

    /// `get`: emit the next identifier from `name`.
    pub fn next(&self, name: &str) -> Result<String, DispenserError> {
        let entries = self.entries.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| DispenserError::UnknownDispenser { name: name.to_string() })?;
        entry.dispenser.next()
    }

    /// `info`: a full rendering of `name`'s live state.
    pub fn snapshot(&self, name: &str) -> Result<DispenserSnapshot, DispenserError> {
        let entries = self.entries.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| DispenserError::UnknownDispenser { name: name.to_string() })?;
        Ok(DispenserSnapshot {
            config: entry.config.clone(),
            current: entry.dispenser.current(),
            stats: entry.dispenser.stats(),
            kind_fields: entry.dispenser.info_fields(),
        })
    }

    /// `del`: removes `name`, stopping its background tasks and dropping
    /// its disk state. Returns whether it was present.
    pub fn delete(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        match entries.remove(name) {
            Some(entry) => {
                entry.dispenser.shutdown();
                let _ = self.persistence.remove(name);
                true
            }
            None => false,
        }
    }

    /// Orchestrated shutdown: run every live dispenser's graceful-shutdown
    /// sequence, then flush the persistence layer once.
    pub fn shutdown(&self) {
        let entries = self.entries.read();
        for entry in entries.values() {
            entry.dispenser.shutdown();
        }
        drop(entries);
        if let Err(err) = self.persistence.flush() {
            tracing::warn!(%err, "final flush on shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlphanumericCharset, DispenserKind, DurabilityStrategyKind, MonotonicMode, NullPersistence, UuidFormat};

    fn registry() -> Registry {
        Registry::new(Arc::new(NullPersistence), DurabilityStrategy::default())
    }

    fn monotonic(durability: DurabilityStrategyKind) -> DispenserConfig {
        DispenserConfig {
            kind: DispenserKind::NumericMonotonic,
            monotonic_mode: MonotonicMode::Sequence,
            step: 1,
            durability,
            ..Default::default()
        }
    }

    #[test]
    fn create_then_reject_immutable_field_change() {
        let reg = registry();
        assert_eq!(
            reg.create_or_reconfigure("a", monotonic(DurabilityStrategyKind::Memory))
                .unwrap(),
            ReconfigureOutcome::Created
        );

        let mut changed = monotonic(DurabilityStrategyKind::Memory);
        changed.length = 9;
        let err = reg.create_or_reconfigure("a", changed).unwrap_err();
        assert!(matches!(err, DispenserError::ConfigImmutable { rejected } if rejected == vec!["length".to_string()]));
    }

    #[test]
    fn reconfigure_durability_only_carries_current() {
        let reg = registry();
        reg.create_or_reconfigure("a", monotonic(DurabilityStrategyKind::Memory))
            .unwrap();
        reg.next("a").unwrap();
        reg.next("a").unwrap();

        let outcome = reg
            .create_or_reconfigure("a", monotonic(DurabilityStrategyKind::ElegantClose))
            .unwrap();
        assert_eq!(outcome, ReconfigureOutcome::Reconfigured);
        assert_eq!(reg.next("a").unwrap(), "2");
    }

    #[test]
    fn unchanged_reconfigure_is_a_no_op() {
        let reg = registry();
        reg.create_or_reconfigure("a", monotonic(DurabilityStrategyKind::Memory))
            .unwrap();
        reg.next("a").unwrap();
        let outcome = reg
            .create_or_reconfigure("a", monotonic(DurabilityStrategyKind::Memory))
            .unwrap();
        assert_eq!(outcome, ReconfigureOutcome::Unchanged);
        // current was not reset by the no-op reconfigure.
        assert_eq!(reg.next("a").unwrap(), "1");
    }

    #[test]
    fn delete_then_unknown_on_subsequent_access() {
        let reg = registry();
        reg.create_or_reconfigure("a", monotonic(DurabilityStrategyKind::Memory))
            .unwrap();
        assert!(reg.delete("a"));
        assert!(!reg.delete("a"));
        assert!(matches!(
            reg.next("a").unwrap_err(),
            DispenserError::UnknownDispenser { .. }
        ));
    }

    #[test]
    fn info_reports_kind_fields_and_stats() {
        let reg = registry();
        reg.create_or_reconfigure(
            "u",
            DispenserConfig {
                kind: DispenserKind::Uuid,
                uuid_format: UuidFormat::Standard,
                ..Default::default()
            },
        )
        .unwrap();
        reg.next("u").unwrap();
        let snap = reg.snapshot("u").unwrap();
        assert_eq!(snap.stats.generated, 1);
        assert_eq!(snap.current, None);
        assert!(snap.kind_fields.iter().any(|(k, _)| k == "uuid_format"));
    }

    #[test]
    fn load_replays_saved_position() {
        let reg = registry();
        reg.load(vec![(
            "r".to_string(),
            monotonic(DurabilityStrategyKind::Memory),
            42,
        )])
        .unwrap();
        assert_eq!(reg.next("r").unwrap(), "42");
    }

    #[test]
    fn rejects_overlong_name() {
        let reg = registry();
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let err = reg
            .create_or_reconfigure(&long, monotonic(DurabilityStrategyKind::Memory))
            .unwrap_err();
        assert!(matches!(err, DispenserError::BadConfig { .. }));
    }

    #[test]
    fn charset_field_is_rejected_if_changed() {
        let reg = registry();
        reg.create_or_reconfigure(
            "c",
            DispenserConfig {
                kind: DispenserKind::AlphanumericRandom,
                charset: AlphanumericCharset::Hex,
                length: 8,
                ..Default::default()
            },
        )
        .unwrap();
        let err = reg
            .create_or_reconfigure(
                "c",
                DispenserConfig {
                    kind: DispenserKind::AlphanumericRandom,
                    charset: AlphanumericCharset::Base62,
                    length: 8,
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DispenserError::ConfigImmutable { .. }));
    }
}
