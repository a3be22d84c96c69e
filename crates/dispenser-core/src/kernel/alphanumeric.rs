//! Alphanumeric-random kernel (spec §4.1).
//!
//! `hex` draws `ceil(length/2)` random bytes and hex-encodes them; `base62`
//! draws one random byte per character and rejection-samples it into
//! `0-9A-Za-z` to avoid modulo bias.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::stats::StatsCounters;
use crate::{AlphanumericCharset, Dispenser, DispenserConfig, DispenserError, DispenserStats};

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub struct AlphanumericDispenser {
    length: u32,
    charset: AlphanumericCharset,
    stats: StatsCounters,
}

impl AlphanumericDispenser {
    pub fn new(config: &DispenserConfig) -> Self {
        Self {
            length: config.length,
            charset: config.charset,
            stats: StatsCounters::default(),
        }
    }

    fn draw_hex(&self) -> String {
        let byte_len = self.length.div_ceil(2) as usize;
        let mut bytes = vec![0u8; byte_len];
        OsRng.fill_bytes(&mut bytes);
        let encoded = hex_encode(&bytes);
        encoded[..self.length as usize].to_string()
    }

    fn draw_base62(&self) -> String {
        let mut out = String::with_capacity(self.length as usize);
        let mut rng = OsRng;
        // Rejection sampling: 62 does not divide 256 evenly (256 = 4*62 +
        // 8), so bytes in [248, 256) are discarded to avoid biasing the
        // low characters of the alphabet.
        let limit = 256 - (256 % BASE62_ALPHABET.len());
        let mut scratch = [0u8; 1];
        while out.len() < self.length as usize {
            rng.fill_bytes(&mut scratch);
            let b = scratch[0] as usize;
            if b < limit {
                out.push(BASE62_ALPHABET[b % BASE62_ALPHABET.len()] as char);
            }
        }
        out
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Dispenser for AlphanumericDispenser {
    fn next(&self) -> Result<String, DispenserError> {
        let value = match self.charset {
            AlphanumericCharset::Hex => self.draw_hex(),
            AlphanumericCharset::Base62 => self.draw_base62(),
        };
        self.stats.record_generated();
        Ok(value)
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
        vec![
            ("length".to_string(), self.length.to_string()),
            (
                "charset".to_string(),
                match self.charset {
                    AlphanumericCharset::Hex => "hex".to_string(),
                    AlphanumericCharset::Base62 => "base62".to_string(),
                },
            ),
        ]
    }

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DispenserKind;

    fn config(charset: AlphanumericCharset, length: u32) -> DispenserConfig {
        DispenserConfig {
            kind: DispenserKind::AlphanumericRandom,
            length,
            charset,
            ..Default::default()
        }
    }

    #[test]
    fn hex_output_is_exact_length_and_charset() {
        let d = AlphanumericDispenser::new(&config(AlphanumericCharset::Hex, 11));
        let v = d.next().unwrap();
        assert_eq!(v.len(), 11);
        assert!(v.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn base62_output_is_exact_length_and_charset() {
        let d = AlphanumericDispenser::new(&config(AlphanumericCharset::Base62, 16));
        let v = d.next().unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
