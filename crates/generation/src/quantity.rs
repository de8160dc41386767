//! Kubernetes resource quantities (`500m`, `128Mi`, `1.5G`, `2e3`) in exact
//! integer arithmetic.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("invalid quantity '{0}'")]
    Invalid(String),
    #[error("quantity '{0}' has too many digits")]
    TooLarge(String),
}

/// Decimal scale exponents for [`ParsedQuantity::scaled_value`].
pub const MILLI: i32 = -3;
pub const MEGA: i32 = 6;

/// `mantissa * 10^exp10 * 2^exp2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedQuantity {
    mantissa: i128,
    exp10: i32,
    exp2: u32,
}

const MAX_DIGITS: usize = 30;

fn suffix(s: &str) -> Option<(i32, u32)> {
    Some(match s {
        "" => (0, 0),
        "n" => (-9, 0),
        "u" => (-6, 0),
        "m" => (-3, 0),
        "k" => (3, 0),
        "M" => (6, 0),
        "G" => (9, 0),
        "T" => (12, 0),
        "P" => (15, 0),
        "E" => (18, 0),
        "Ki" => (0, 10),
        "Mi" => (0, 20),
        "Gi" => (0, 30),
        "Ti" => (0, 40),
        "Pi" => (0, 50),
        "Ei" => (0, 60),
        _ => {
            let exp = s.strip_prefix(&['e', 'E'][..])?;
            (exp.parse().ok()?, 0)
        }
    })
}

impl ParsedQuantity {
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        let invalid = || QuantityError::Invalid(input.to_string());
        let s = input.trim();
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let number_len = unsigned.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(unsigned.len());
        let (number, rest) = unsigned.split_at(number_len);
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if int_part.is_empty() && frac_part.is_empty() { return Err(invalid()); }
        if frac_part.contains('.') { return Err(invalid()); }

        let digits = format!("{}{}", int_part, frac_part);
        let digits = digits.trim_start_matches('0');
        if digits.len() > MAX_DIGITS { return Err(QuantityError::TooLarge(input.to_string())); }
        let mut mantissa: i128 = if digits.is_empty() { 0 } else { digits.parse().map_err(|_| invalid())? };
        if negative { mantissa = -mantissa; }

        let (exp10, exp2) = suffix(rest).ok_or_else(invalid)?;
        let exp10 = i32::try_from(frac_part.len())
            .ok()
            .and_then(|frac| exp10.checked_sub(frac))
            .ok_or_else(|| QuantityError::TooLarge(input.to_string()))?;
        Ok(Self { mantissa, exp10, exp2 })
    }

    pub fn from_quantity(q: &Quantity) -> Result<Self, QuantityError> { Self::parse(&q.0) }

    pub fn is_zero(&self) -> bool { self.mantissa == 0 }

    /// The value in units of `10^scale`, rounded up.
    pub fn scaled_value(&self, scale: i32) -> i64 {
        let Some(num) = self.mantissa.checked_mul(1i128 << self.exp2) else {
            return if self.mantissa < 0 { i64::MIN } else { i64::MAX };
        };
        let e = self.exp10.saturating_sub(scale);
        let v = if e >= 0 {
            match 10i128.checked_pow(e as u32).and_then(|p| num.checked_mul(p)) {
                Some(v) => v,
                None if num == 0 => 0,
                None => if num < 0 { i128::MIN } else { i128::MAX },
            }
        } else {
            match 10i128.checked_pow(e.unsigned_abs()) {
                Some(den) => num / den + i128::from(num % den > 0),
                None => i128::from(num > 0),
            }
        };
        v.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// [`Self::scaled_value`] clamped into the parameter range.
    pub fn scaled_i32(&self, scale: i32) -> i32 {
        self.scaled_value(scale).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}
