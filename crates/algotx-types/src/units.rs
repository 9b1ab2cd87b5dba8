//! Decimal ⇄ base-unit amount conversion.
//!
//! Amounts are carried as digit strings so that values wider than `u64`
//! and arbitrary decimal counts survive the conversion unchanged. Scaling up
//! truncates extra fractional digits; it never rounds.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid character '{0}' in amount")]
    InvalidCharacter(char),

    #[error("amount has more than one decimal point")]
    MultipleDecimalPoints,

    #[error("amount does not fit in 64 bits: {0}")]
    Overflow(String),
}

fn check_digits(s: &str) -> Result<(), AmountError> {
    match s.chars().find(|c| !c.is_ascii_digit()) {
        Some(c) => Err(AmountError::InvalidCharacter(c)),
        None => Ok(()),
    }
}

fn strip_leading_zeros(s: &str) -> &str {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

/// Scale a decimal amount up to integer base units.
///
/// `decimal_to_base_units("5", 6) == "5000000"`,
/// `decimal_to_base_units(".0025", 3) == "2"`. Empty input yields `"0"`.
pub fn decimal_to_base_units(value: &str, decimals: u32) -> Result<String, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok("0".to_string());
    }

    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => {
            if f.contains('.') {
                return Err(AmountError::MultipleDecimalPoints);
            }
            (w, f)
        }
        None => (value, ""),
    };
    check_digits(whole)?;
    check_digits(frac)?;

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    if frac.len() >= decimals {
        digits.push_str(&frac[..decimals]);
    } else {
        digits.push_str(frac);
        digits.extend(std::iter::repeat('0').take(decimals - frac.len()));
    }

    Ok(strip_leading_zeros(&digits).to_string())
}

/// Render integer base units as a normalized decimal string.
///
/// `base_units_to_decimal("1000", 6) == "0.001"`. No superfluous zeros are
/// produced; zero or empty input yields `"0"`.
pub fn base_units_to_decimal(value: &str, decimals: u32) -> Result<String, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok("0".to_string());
    }
    check_digits(value)?;

    let digits = strip_leading_zeros(value);
    let decimals = decimals as usize;
    if decimals == 0 {
        return Ok(digits.to_string());
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits.to_string()
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        Ok(int_part.to_string())
    } else {
        Ok(format!("{}.{}", int_part, frac_part))
    }
}

/// [`decimal_to_base_units`] parsed into a `u64`.
pub fn decimal_to_base_units_u64(value: &str, decimals: u32) -> Result<u64, AmountError> {
    let units = decimal_to_base_units(value, decimals)?;
    units.parse().map_err(|_| AmountError::Overflow(units))
}

/// [`base_units_to_decimal`] for a `u64` amount.
pub fn format_base_units(amount: u64, decimals: u32) -> String {
    // A decimal rendering of a u64 only ever contains digits.
    base_units_to_decimal(&amount.to_string(), decimals).unwrap_or_else(|_| amount.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_up() {
        assert_eq!(decimal_to_base_units("5", 6).unwrap(), "5000000");
        assert_eq!(decimal_to_base_units("0.001", 6).unwrap(), "1000");
        assert_eq!(decimal_to_base_units("1.5", 2).unwrap(), "150");
        assert_eq!(decimal_to_base_units("12", 0).unwrap(), "12");
    }

    #[test]
    fn test_empty_and_zero() {
        for n in 0..=19 {
            assert_eq!(decimal_to_base_units("", n).unwrap(), "0");
            assert_eq!(decimal_to_base_units("0", n).unwrap(), "0");
            assert_eq!(decimal_to_base_units(&0.to_string(), n).unwrap(), "0");
            assert_eq!(base_units_to_decimal("", n).unwrap(), "0");
            assert_eq!(base_units_to_decimal("0", n).unwrap(), "0");
        }
    }

    #[test]
    fn test_truncates_instead_of_rounding() {
        assert_eq!(decimal_to_base_units(".0025", 3).unwrap(), "2");
        assert_eq!(decimal_to_base_units("0.0029", 3).unwrap(), "2");
        assert_eq!(decimal_to_base_units("1.9999999", 6).unwrap(), "1999999");
    }

    #[test]
    fn test_leading_zeros_insignificant() {
        assert_eq!(decimal_to_base_units("007.5", 6).unwrap(), "7500000");
        assert_eq!(decimal_to_base_units("000", 6).unwrap(), "0");
        assert_eq!(base_units_to_decimal("000150", 2).unwrap(), "1.5");
    }

    #[test]
    fn test_scale_down() {
        assert_eq!(base_units_to_decimal("5000000", 6).unwrap(), "5");
        assert_eq!(base_units_to_decimal("1000", 6).unwrap(), "0.001");
        assert_eq!(base_units_to_decimal("1234", 2).unwrap(), "12.34");
        assert_eq!(base_units_to_decimal("5", 3).unwrap(), "0.005");
        assert_eq!(base_units_to_decimal("120", 0).unwrap(), "120");
    }

    #[test]
    fn test_roundtrip_within_precision() {
        for s in ["1", "0.5", "123.456", "0.000001", "99999999.999999"] {
            let units = decimal_to_base_units(s, 6).unwrap();
            assert_eq!(base_units_to_decimal(&units, 6).unwrap(), s);
        }
        for units in ["1", "10", "1000000", "123456789"] {
            let dec = base_units_to_decimal(units, 6).unwrap();
            assert_eq!(decimal_to_base_units(&dec, 6).unwrap(), units);
        }
    }

    #[test]
    fn test_not_inverse_above_precision() {
        let units = decimal_to_base_units("0.0025", 3).unwrap();
        let back = base_units_to_decimal(&units, 3).unwrap();
        assert_eq!(back, "0.002");
        assert_ne!(back, "0.0025");
    }

    #[test]
    fn test_wide_values_survive() {
        let big = "123456789012345678901234567890";
        assert_eq!(
            decimal_to_base_units(big, 2).unwrap(),
            format!("{}00", big)
        );
        assert!(matches!(
            decimal_to_base_units_u64(big, 2),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(
            decimal_to_base_units("1,5", 2),
            Err(AmountError::InvalidCharacter(','))
        );
        assert_eq!(
            decimal_to_base_units("1.2.3", 2),
            Err(AmountError::MultipleDecimalPoints)
        );
        assert_eq!(
            decimal_to_base_units("-1", 2),
            Err(AmountError::InvalidCharacter('-'))
        );
        assert_eq!(
            base_units_to_decimal("1.5", 2),
            Err(AmountError::InvalidCharacter('.'))
        );
    }

    #[test]
    fn test_format_base_units() {
        assert_eq!(format_base_units(1_000, 6), "0.001");
        assert_eq!(format_base_units(0, 6), "0");
        assert_eq!(format_base_units(2_500_000, 6), "2.5");
    }
}
