//! RFC 4122 v4 UUID kernel (spec §4.1).

use crate::stats::StatsCounters;
use crate::{Dispenser, DispenserConfig, DispenserError, DispenserStats, UuidFormat};

pub struct UuidDispenser {
    format: UuidFormat,
    stats: StatsCounters,
}

impl UuidDispenser {
    pub fn new(config: &DispenserConfig) -> Self {
        Self {
            format: config.uuid_format,
            stats: StatsCounters::default(),
        }
    }
}

impl Dispenser for UuidDispenser {
    fn next(&self) -> Result<String, DispenserError> {
        let id = uuid::Uuid::new_v4();
        self.stats.record_generated();
        Ok(match self.format {
            UuidFormat::Standard => id.hyphenated().to_string(),
            UuidFormat::Compact => id.simple().to_string(),
        })
    }

    fn current(&self) -> Option<i128> {
        None
    }

    fn set_current(&self, _value: i128) -> Result<(), DispenserError> {
        Ok(())
    }

    fn stats(&self) -> DispenserStats {
        self.stats.snapshot()
    }

    fn info_fields(&self) -> Vec<(String, String)> {
        vec![(
            "uuid_format".to_string(),
            match self.format {
                UuidFormat::Standard => "standard".to_string(),
                UuidFormat::Compact => "compact".to_string(),
            },
        )]
    }

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DispenserKind;

    fn config(format: UuidFormat) -> DispenserConfig {
        DispenserConfig {
            kind: DispenserKind::Uuid,
            uuid_format: format,
            ..Default::default()
        }
    }

    fn hex_bytes(id: &str) -> Vec<u8> {
        (0..16)
            .map(|i| u8::from_str_radix(&id[i * 2..i * 2 + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn standard_format_matches_v4_shape() {
        let d = UuidDispenser::new(&config(UuidFormat::Standard));
        let id = d.next().unwrap();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![8, 4, 4, 4, 12]
        );
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_hexdigit())));
        assert!(parts[2].starts_with('4'));
        assert!(matches!(parts[3].chars().next(), Some('8' | '9' | 'a' | 'b')));
    }

    #[test]
    fn version_and_variant_bits() {
        let d = UuidDispenser::new(&config(UuidFormat::Compact));
        let id = d.next().unwrap();
        assert_eq!(id.len(), 32);
        let bytes = hex_bytes(&id);
        assert_eq!(bytes[6] >> 4, 4);
        assert_eq!(bytes[8] >> 6, 0b10);
    }
}
