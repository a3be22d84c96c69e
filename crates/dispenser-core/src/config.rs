//! Dispenser configuration: the immutable-after-creation half of §3's data
//! model, plus the per-kind validation rules of §4.1 and the
//! reconfiguration-immutability check of §4.5/I6.

use serde::{Deserialize, Serialize};

use crate::DispenserError;

/// Per-length cap applied to `numeric-random`, per the open question in §9:
/// an unbounded `issued` set is impractical above this length, so creation
/// is refused with `bad-config` instead.
pub const MAX_NUMERIC_RANDOM_LENGTH: u32 = 7;

/// Per spec §3: numeric kinds accept `length` in `1..18`.
pub const MAX_NUMERIC_LENGTH: u32 = 18;

/// Per spec §3: alphanumeric kinds accept `length` in `1..64`.
pub const MAX_ALPHANUMERIC_LENGTH: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispenserKind {
    NumericRandom,
    NumericMonotonic,
    AlphanumericRandom,
    Snowflake,
    Uuid,
}

impl DispenserKind {
    /// `type` field values are `1..5` in the order declared in §3.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::NumericRandom),
            2 => Some(Self::NumericMonotonic),
            3 => Some(Self::AlphanumericRandom),
            4 => Some(Self::Snowflake),
            5 => Some(Self::Uuid),
            _ => None,
        }
    }

    pub fn wire_value(self) -> i64 {
        match self {
            Self::NumericRandom => 1,
            Self::NumericMonotonic => 2,
            Self::AlphanumericRandom => 3,
            Self::Snowflake => 4,
            Self::Uuid => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NumericRandom => "numeric-random",
            Self::NumericMonotonic => "numeric-monotonic",
            Self::AlphanumericRandom => "alphanumeric-random",
            Self::Snowflake => "snowflake",
            Self::Uuid => "uuid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonotonicMode {
    FixedWidth,
    Sequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlphanumericCharset {
    Hex,
    Base62,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UuidFormat {
    Standard,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurabilityStrategyKind {
    Memory,
    PreBase,
    PreCheckpoint,
    ElegantClose,
    PreClose,
}

impl DurabilityStrategyKind {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "memory" => Some(Self::Memory),
            "pre-base" => Some(Self::PreBase),
            "pre-checkpoint" => Some(Self::PreCheckpoint),
            "elegant_close" => Some(Self::ElegantClose),
            "pre_close" => Some(Self::PreClose),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::PreBase => "pre-base",
            Self::PreCheckpoint => "pre-checkpoint",
            Self::ElegantClose => "elegant_close",
            Self::PreClose => "pre_close",
        }
    }
}

impl Default for DurabilityStrategyKind {
    fn default() -> Self {
        Self::ElegantClose
    }
}

/// Immutable-after-creation dispenser configuration (spec §3).
///
/// Every field except `durability` is frozen at creation time; §4.5 governs
/// what a later `hset` for the same name is allowed to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispenserConfig {
    pub kind: DispenserKind,
    pub length: u32,
    pub starting: i128,
    pub step: i128,
    pub monotonic_mode: MonotonicMode,
    pub charset: AlphanumericCharset,
    pub machine_id: u8,
    pub datacenter_id: u8,
    pub uuid_format: UuidFormat,
    pub durability: DurabilityStrategyKind,
}

impl Default for DispenserConfig {
    fn default() -> Self {
        Self {
            kind: DispenserKind::NumericMonotonic,
            length: 8,
            starting: 0,
            step: 1,
            monotonic_mode: MonotonicMode::Sequence,
            charset: AlphanumericCharset::Hex,
            machine_id: 0,
            datacenter_id: 0,
            uuid_format: UuidFormat::Standard,
            durability: DurabilityStrategyKind::default(),
        }
    }
}

impl DispenserConfig {
    /// Validates the per-kind rules of §4.1 / §3. Called once at creation;
    /// reconfiguration re-validates the merged config before diffing it
    /// against the live one.
    pub fn validate(&self) -> Result<(), DispenserError> {
        match self.kind {
            DispenserKind::NumericRandom => {
                if self.length == 0 || self.length > MAX_NUMERIC_RANDOM_LENGTH {
                    return Err(DispenserError::BadConfig {
                        reason: format!(
                            "numeric-random length must be in 1..{MAX_NUMERIC_RANDOM_LENGTH}, got {}",
                            self.length
                        ),
                    });
                }
            }
            DispenserKind::NumericMonotonic => {
                if self.length == 0 || self.length > MAX_NUMERIC_LENGTH {
                    return Err(DispenserError::BadConfig {
                        reason: format!(
                            "numeric-monotonic length must be in 1..{MAX_NUMERIC_LENGTH}, got {}",
                            self.length
                        ),
                    });
                }
                if self.step <= 0 {
                    return Err(DispenserError::BadConfig {
                        reason: "step must be a positive integer".to_string(),
                    });
                }
                if self.starting < 0 {
                    return Err(DispenserError::BadConfig {
                        reason: "starting must be a non-negative integer".to_string(),
                    });
                }
            }
            DispenserKind::AlphanumericRandom => {
                if self.length == 0 || self.length > MAX_ALPHANUMERIC_LENGTH {
                    return Err(DispenserError::BadConfig {
                        reason: format!(
                            "alphanumeric-random length must be in 1..{MAX_ALPHANUMERIC_LENGTH}, got {}",
                            self.length
                        ),
                    });
                }
            }
            DispenserKind::Snowflake => {
                if self.machine_id > 31 {
                    return Err(DispenserError::BadConfig {
                        reason: format!("machine_id must be in 0..31, got {}", self.machine_id),
                    });
                }
                if self.datacenter_id > 31 {
                    return Err(DispenserError::BadConfig {
                        reason: format!(
                            "datacenter_id must be in 0..31, got {}",
                            self.datacenter_id
                        ),
                    });
                }
            }
            DispenserKind::Uuid => {}
        }
        Ok(())
    }

    /// The cap for `fixed-width` numeric-monotonic dispensers: `10^length -
    /// 1`.
    pub fn fixed_width_cap(&self) -> i128 {
        10i128.pow(self.length) - 1
    }

    /// The closed interval size for `numeric-random`: `10^length -
    /// 10^(length-1)`.
    pub fn numeric_random_space(&self) -> u64 {
        (10u64.pow(self.length) - 10u64.pow(self.length.saturating_sub(1))) as u64
    }

    /// §4.5: only `durability` may change between two `hset` calls for the
    /// same name. Returns the list of rejected (changed, non-durability)
    /// field names, empty if the reconfiguration is legal.
    pub fn rejected_fields(&self, incoming: &Self) -> Vec<String> {
        let mut rejected = Vec::new();
        if self.kind != incoming.kind {
            rejected.push("type".to_string());
        }
        if self.length != incoming.length {
            rejected.push("length".to_string());
        }
        if self.starting != incoming.starting {
            rejected.push("starting".to_string());
        }
        if self.step != incoming.step {
            rejected.push("step".to_string());
        }
        if self.monotonic_mode != incoming.monotonic_mode {
            rejected.push("incr_mode".to_string());
        }
        if self.charset != incoming.charset {
            rejected.push("charset".to_string());
        }
        if self.machine_id != incoming.machine_id {
            rejected.push("machine_id".to_string());
        }
        if self.datacenter_id != incoming.datacenter_id {
            rejected.push("datacenter_id".to_string());
        }
        if self.uuid_format != incoming.uuid_format {
            rejected.push("uuid_format".to_string());
        }
        rejected
    }
}
