//! Numeric helpers shared by the report extractors.
//!
//! Percentages are rounded on the *decimal* representation of the value, the
//! way a `BigDecimal` with `HALF_UP` would do it: `2.675` rounds to `2.68`
//! even though the nearest binary double is slightly below the midpoint.

use crate::error::{CoverageError, Result};

/// Parse a possibly-absent numeric attribute.
///
/// Absent and blank values count as `0.0`. English grouping separators are
/// accepted (`"1,234"`). Anything else that is not a finite number is a
/// malformed report.
pub fn parse_number(value: Option<&str>) -> Result<f64> {
    let Some(raw) = value else {
        return Ok(0.0);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let cleaned = trimmed.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(CoverageError::malformed(format!("not a number: '{raw}'"))),
    }
}

/// Parse a required integer attribute such as a line number.
pub fn parse_count(value: Option<&str>, what: &str) -> Result<u32> {
    let raw = value.ok_or_else(|| CoverageError::malformed(format!("missing {what}")))?;
    raw.trim()
        .parse::<u32>()
        .map_err(|_| CoverageError::malformed(format!("invalid {what}: '{raw}'")))
}

/// Round to 2 decimal places, halfway cases away from zero.
#[must_use]
pub fn scale(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    // Display for f64 never uses exponent notation and prints the shortest
    // string that round-trips.
    let repr = format!("{}", value.abs());
    let Some((int_part, frac_part)) = repr.split_once('.') else {
        return value;
    };
    if frac_part.len() <= 2 {
        return value;
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(2))
        .collect();
    if frac_part.as_bytes()[2] >= b'5' {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let mut rounded: String = digits.iter().map(|&b| b as char).collect();
    rounded.insert(rounded.len() - 2, '.');
    let magnitude = rounded.parse::<f64>().unwrap_or(value.abs());
    if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// Percentage of `covered` over `total`, scaled; `0.0` when nothing is
/// coverable.
#[must_use]
pub fn pct(covered: u32, total: u32) -> f64 {
    if total > 0 {
        scale(100.0 * (f64::from(covered) / f64::from(total)))
    } else {
        0.0
    }
}
