//! Numeric-monotonic kernel (spec §4.1).
//!
//! Kept as a pure function of `(current, step, mode, length)` rather than a
//! struct, since the segment allocator needs to call it under its own lock
//! during rollover (§4.2: "the emit-then-increment happens inside the
//! allocator's lock").

use crate::{DispenserError, MonotonicMode};

/// One step of the numeric-monotonic kernel: emit `current`, then advance
/// it by `step`.
///
/// In `fixed-width` mode the emitted value is zero-padded to `length` and
/// `current > 10^length - 1` fails with `exhausted`. In `sequence` mode
/// there is no cap and no padding.
pub fn step(
    current: i128,
    step_by: i128,
    mode: MonotonicMode,
    length: u32,
) -> Result<(String, i128), DispenserError> {
    match mode {
        MonotonicMode::FixedWidth => {
            let cap = 10i128.pow(length) - 1;
            if current > cap {
                return Err(DispenserError::Exhausted {
                    reason: format!("numeric-monotonic exceeded fixed-width cap {cap}"),
                });
            }
            let emitted = format!("{current:0width$}", width = length as usize);
            Ok((emitted, current + step_by))
        }
        MonotonicMode::Sequence => Ok((current.to_string(), current + step_by)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_mode_has_no_cap() {
        let (emitted, next) = step(i128::from(u64::MAX), 1, MonotonicMode::Sequence, 4).unwrap();
        assert_eq!(emitted, u64::MAX.to_string());
        assert_eq!(next, i128::from(u64::MAX) + 1);
    }

    #[test]
    fn fixed_width_pads_and_caps() {
        let (emitted, next) = step(7, 1, MonotonicMode::FixedWidth, 3).unwrap();
        assert_eq!(emitted, "007");
        assert_eq!(next, 8);

        let err = step(1000, 1, MonotonicMode::FixedWidth, 3).unwrap_err();
        assert!(matches!(err, DispenserError::Exhausted { .. }));
    }

    #[test]
    fn fixed_width_last_value_succeeds_then_exhausts() {
        let cap = 10i128.pow(3) - 1;
        let (emitted, next) = step(cap, 1, MonotonicMode::FixedWidth, 3).unwrap();
        assert_eq!(emitted, "999");
        assert_eq!(next, cap + 1);

        let err = step(next, 1, MonotonicMode::FixedWidth, 3).unwrap_err();
        assert!(matches!(err, DispenserError::Exhausted { .. }));
    }

    #[test]
    fn sequence_strictly_increasing_by_step() {
        let mut current = 0i128;
        let mut seen = Vec::new();
        for _ in 0..10 {
            let (emitted, next) = step(current, 3, MonotonicMode::Sequence, 0).unwrap();
            seen.push(emitted.parse::<i128>().unwrap());
            current = next;
        }
        for window in seen.windows(2) {
            assert_eq!(window[1] - window[0], 3);
        }
    }
}
