//! The five commands of spec §6.1, parsed from a RESP request's raw
//! argument bytes, plus the `hset` field-merging logic that turns a field
//! list into a [`DispenserConfig`].

use dispenser_core::{
    AlphanumericCharset, DispenserConfig, DispenserKind, DurabilityStrategyKind, MonotonicMode,
    UuidFormat,
};

use crate::error::ProtoError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    HSet { name: String, fields: Vec<(String, String)> },
    Get { name: String },
    Info { name: String },
    Del { name: String },
    Ping,
}

fn arg_to_string(arg: &[u8], field: &str) -> Result<String, ProtoError> {
    String::from_utf8(arg.to_vec()).map_err(|_| ProtoError::InvalidFieldValue {
        field: field.to_string(),
        value: String::from_utf8_lossy(arg).into_owned(),
    })
}

impl Command {
    /// Parses the raw argument list of one RESP request (command name
    /// first) into a [`Command`].
    pub fn parse(args: &[Vec<u8>]) -> Result<Self, ProtoError> {
        let (name, rest) = args.split_first().ok_or_else(|| ProtoError::Framing {
            reason: "empty request".to_string(),
        })?;
        let name = arg_to_string(name, "command")?.to_ascii_lowercase();

        match name.as_str() {
            "ping" => {
                if !rest.is_empty() {
                    return Err(ProtoError::WrongArity { command: name });
                }
                Ok(Self::Ping)
            }
            "get" | "info" | "del" => {
                let [dispenser] = rest else {
                    return Err(ProtoError::WrongArity { command: name });
                };
                let dispenser = arg_to_string(dispenser, "name")?;
                Ok(match name.as_str() {
                    "get" => Self::Get { name: dispenser },
                    "info" => Self::Info { name: dispenser },
                    _ => Self::Del { name: dispenser },
                })
            }
            "hset" => {
                let (dispenser, field_args) = rest.split_first().ok_or(ProtoError::WrongArity {
                    command: name.clone(),
                })?;
                if field_args.is_empty() || field_args.len() % 2 != 0 {
                    return Err(ProtoError::WrongArity { command: name });
                }
                let dispenser = arg_to_string(dispenser, "name")?;
                let mut fields = Vec::with_capacity(field_args.len() / 2);
                for pair in field_args.chunks_exact(2) {
                    fields.push((arg_to_string(&pair[0], "field")?, arg_to_string(&pair[1], "value")?));
                }
                Ok(Self::HSet { name: dispenser, fields })
            }
            other => Err(ProtoError::UnknownCommand { command: other.to_string() }),
        }
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ProtoError> {
    value.parse().map_err(|_| ProtoError::InvalidFieldValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Merges `fields` from an `hset` command onto `base` (the default config,
/// or the already-live config when reconfiguring), per the field table in
/// spec §6.1. `unique_check` and `unique_cache_size` are accepted for wire
/// compatibility but have no effect: this implementation always performs
/// full duplicate checking for `numeric-random` (spec §9's open question on
/// the duplicate-check memory bound is handled by capping `length`
/// instead, not by making the check itself optional).
pub fn merge_config(
    base: &DispenserConfig,
    fields: &[(String, String)],
    require_type: bool,
) -> Result<DispenserConfig, ProtoError> {
    let mut config = base.clone();
    let mut saw_type = !require_type;

    for (field, value) in fields {
        match field.as_str() {
            "type" => {
                let wire: i64 = parse_field("type", value)?;
                config.kind = DispenserKind::from_wire(wire).ok_or_else(|| ProtoError::InvalidFieldValue {
                    field: "type".to_string(),
                    value: value.clone(),
                })?;
                saw_type = true;
            }
            "length" => config.length = parse_field("length", value)?,
            "starting" => config.starting = parse_field("starting", value)?,
            "step" => config.step = parse_field("step", value)?,
            "incr_mode" => {
                config.monotonic_mode = match value.as_str() {
                    "fixed" => MonotonicMode::FixedWidth,
                    "sequence" => MonotonicMode::Sequence,
                    _ => {
                        return Err(ProtoError::InvalidFieldValue {
                            field: "incr_mode".to_string(),
                            value: value.clone(),
                        })
                    }
                };
            }
            "charset" => {
                config.charset = match value.as_str() {
                    "hex" => AlphanumericCharset::Hex,
                    "base62" => AlphanumericCharset::Base62,
                    _ => {
                        return Err(ProtoError::InvalidFieldValue {
                            field: "charset".to_string(),
                            value: value.clone(),
                        })
                    }
                };
            }
            "machine_id" => config.machine_id = parse_field("machine_id", value)?,
            "datacenter_id" => config.datacenter_id = parse_field("datacenter_id", value)?,
            "uuid_format" => {
                config.uuid_format = match value.as_str() {
                    "standard" => UuidFormat::Standard,
                    "compact" => UuidFormat::Compact,
                    _ => {
                        return Err(ProtoError::InvalidFieldValue {
                            field: "uuid_format".to_string(),
                            value: value.clone(),
                        })
                    }
                };
            }
            "auto_disk" => {
                config.durability = DurabilityStrategyKind::from_wire(value).ok_or_else(|| ProtoError::InvalidFieldValue {
                    field: "auto_disk".to_string(),
                    value: value.clone(),
                })?;
            }
            "unique_check" | "unique_cache_size" => {
                let _: i64 = parse_field(field, value).or_else(|_| match value.as_str() {
                    "true" => Ok(1),
                    "false" => Ok(0),
                    _ => Err(ProtoError::InvalidFieldValue { field: field.clone(), value: value.clone() }),
                })?;
            }
            other => {
                return Err(ProtoError::UnknownField { field: other.to_string() });
            }
        }
    }

    if !saw_type {
        return Err(ProtoError::Dispenser(dispenser_core::DispenserError::BadConfig {
            reason: "type is required".to_string(),
        }));
    }

    Ok(config)
}
