//! Fixed-point math utilities for deterministic cost growth.
//!
//! Building costs grow geometrically with the level. Computing the growth
//! with floating point would make costs depend on the platform, so the
//! registry works in fixed point and truncates to whole resource units.

use fixed::types::I80F48;

/// Fixed-point number type for cost and energy growth.
///
/// Uses 80 bits for the integer part and 48 bits for the fractional part.
/// High-level buildings cost well beyond `i32::MAX`, so the integer part
/// is wide.
pub type Fixed = I80F48;

/// Convert a growth factor given in percent (e.g. `150` for ×1.5) to fixed point.
#[must_use]
pub fn percent(value: u32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// `base * factor^exponent`, truncated toward zero and saturating at `i64::MAX`.
///
/// A negative exponent divides by the factor instead, so the cost of
/// "level 0" (the target of destroying a level-1 building) stays defined.
#[must_use]
pub fn geometric(base: i64, factor: Fixed, exponent: i64) -> i64 {
    if base == 0 {
        return 0;
    }

    let mut value = Fixed::from_num(base);
    if exponent >= 0 {
        for _ in 0..exponent {
            value = value.saturating_mul(factor);
            if value == Fixed::MAX {
                break;
            }
        }
    } else if factor > Fixed::ZERO {
        for _ in 0..exponent.unsigned_abs() {
            value /= factor;
        }
    }

    value.saturating_to_num::<i64>()
}
