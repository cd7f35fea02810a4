//! Conversion between human decimal amounts and the ledger's scaled integers.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Precision used when none is configured.
pub const DEFAULT_DECIMALS: u8 = 7;

/// Largest precision whose scale (10^18) leaves headroom in 128-bit magnitudes.
pub const MAX_DECIMALS: u8 = 18;

/// Errors produced by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is not a finite number")]
    NonFinite,

    #[error("amount must be greater than zero, got {0}")]
    NotPositive(String),

    #[error("amount is smaller than one unit at {0} decimals")]
    BelowSmallestUnit(u8),

    #[error("malformed decimal amount '{0}'")]
    Malformed(String),

    #[error("amount exceeds the 128-bit ledger range")]
    Overflow,

    #[error("precision {0} exceeds the supported maximum of 18 decimals")]
    Precision(u8),
}

/// Number of digits after the decimal point, validated against [`MAX_DECIMALS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precision(u8);

impl Precision {
    pub const DEFAULT: Precision = Precision(DEFAULT_DECIMALS);

    pub fn new(decimals: u8) -> Result<Self, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::Precision(decimals));
        }
        Ok(Self(decimals))
    }

    pub fn decimals(self) -> u8 {
        self.0
    }

    /// 10^decimals, the number of smallest units in one whole unit.
    pub fn scale(self) -> u128 {
        10u128.pow(self.0 as u32)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A sign-magnitude fixed-point amount.
///
/// The sign is carried explicitly so magnitudes can use the full unsigned
/// 128-bit range. Zero is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    magnitude: u128,
    negative: bool,
    precision: Precision,
}

impl FixedPoint {
    pub fn new(magnitude: u128, negative: bool, precision: Precision) -> Self {
        Self {
            magnitude,
            negative: negative && magnitude != 0,
            precision,
        }
    }

    pub fn zero(precision: Precision) -> Self {
        Self::new(0, false, precision)
    }

    /// Convert a human amount, truncating digits beyond the precision.
    ///
    /// The float is rendered to its shortest round-trip decimal first, so
    /// truncation operates on the decimal the caller wrote (`1.0000001` keeps
    /// its last digit) rather than on the binary approximation.
    pub fn from_human(amount: f64, precision: Precision) -> Result<Self, AmountError> {
        if !amount.is_finite() {
            return Err(AmountError::NonFinite);
        }
        let rendered = format!("{}", amount.abs());
        let unsigned = Self::parse(&rendered, precision)?;
        Ok(Self::new(unsigned.magnitude, amount < 0.0, precision))
    }

    /// Parse a plain decimal string such as `-12.5` or `.25`, truncating
    /// fractional digits beyond the precision. Exponent notation is rejected.
    pub fn parse(input: &str, precision: Precision) -> Result<Self, AmountError> {
        let malformed = || AmountError::Malformed(input.to_string());
        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(malformed());
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(malformed());
        }

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| AmountError::Overflow)?
        };

        let width = precision.decimals() as usize;
        let kept: String = frac_part.chars().take(width).collect();
        let frac: u128 = if width == 0 {
            0
        } else {
            format!("{:0<width$}", kept, width = width)
                .parse()
                .map_err(|_| malformed())?
        };

        let magnitude = whole
            .checked_mul(precision.scale())
            .and_then(|m| m.checked_add(frac))
            .ok_or(AmountError::Overflow)?;
        Ok(Self::new(magnitude, negative, precision))
    }

    /// Decode a signed ledger amount.
    pub fn from_i128(value: i128, precision: Precision) -> Self {
        Self::new(value.unsigned_abs(), value < 0, precision)
    }

    /// Encode for the ledger's signed 128-bit argument type.
    pub fn to_i128(&self) -> Result<i128, AmountError> {
        const NEG_LIMIT: u128 = 1 << 127;
        if self.negative {
            match self.magnitude.cmp(&NEG_LIMIT) {
                Ordering::Less => Ok(-(self.magnitude as i128)),
                Ordering::Equal => Ok(i128::MIN),
                Ordering::Greater => Err(AmountError::Overflow),
            }
        } else {
            i128::try_from(self.magnitude).map_err(|_| AmountError::Overflow)
        }
    }

    pub fn to_human(&self) -> f64 {
        to_human(self.magnitude, self.negative, self.precision)
    }

    pub fn magnitude(&self) -> u128 {
        self.magnitude
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude == 0
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn negated(&self) -> Self {
        Self::new(self.magnitude, !self.negative, self.precision)
    }

    /// Signed addition. `None` on overflow or mixed precision.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        if self.precision != other.precision {
            return None;
        }
        if self.negative == other.negative {
            let magnitude = self.magnitude.checked_add(other.magnitude)?;
            return Some(Self::new(magnitude, self.negative, self.precision));
        }
        let result = if self.magnitude >= other.magnitude {
            Self::new(self.magnitude - other.magnitude, self.negative, self.precision)
        } else {
            Self::new(other.magnitude - self.magnitude, other.negative, self.precision)
        };
        Some(result)
    }

    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.checked_add(&other.negated())
    }

    /// One smallest unit closer to zero. `None` when already zero.
    pub fn decrement_unit(&self) -> Option<Self> {
        if self.magnitude == 0 {
            return None;
        }
        Some(Self::new(self.magnitude - 1, self.negative, self.precision))
    }
}

impl PartialOrd for FixedPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.precision != other.precision {
            return None;
        }
        let ordering = match (self.negative, other.negative) {
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
        };
        Some(ordering)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        let width = self.precision.decimals() as usize;
        if width == 0 {
            return write!(f, "{}{}", sign, self.magnitude);
        }
        let scale = self.precision.scale();
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            self.magnitude / scale,
            self.magnitude % scale,
            width = width
        )
    }
}

/// Human amount to fixed point, truncating beyond `precision` digits.
pub fn to_fixed_point(amount: f64, precision: Precision) -> Result<FixedPoint, AmountError> {
    FixedPoint::from_human(amount, precision)
}

/// Fixed point back to a human amount via its decimal rendering.
pub fn to_human(magnitude: u128, negative: bool, precision: Precision) -> f64 {
    FixedPoint::new(magnitude, negative, precision)
        .to_string()
        .parse()
        .unwrap_or(0.0)
}

/// `amount` truncated (not rounded) to `precision` digits.
pub fn truncate(amount: f64, precision: Precision) -> Result<f64, AmountError> {
    Ok(FixedPoint::from_human(amount, precision)?.to_human())
}
