//! Fixed-point amount codec.
//!
//! # Data Flow
//! ```text
//! UI amount (f64)
//!     → ensure_positive (finite, > 0; before any I/O)
//!     → FixedPoint::from_human (shortest decimal rendering, truncated)
//!     → to_i128 (ledger argument)
//!
//! ledger return value (i128)
//!     → FixedPoint::from_i128
//!     → to_human (decimal string, parsed back to f64)
//! ```

pub mod fixed_point;

pub use fixed_point::{
    to_fixed_point, to_human, truncate, AmountError, FixedPoint, Precision, DEFAULT_DECIMALS,
    MAX_DECIMALS,
};

/// Reject non-finite, zero and negative amounts.
pub fn ensure_positive(amount: f64) -> Result<(), AmountError> {
    if !amount.is_finite() {
        return Err(AmountError::NonFinite);
    }
    if amount <= 0.0 {
        return Err(AmountError::NotPositive(amount.to_string()));
    }
    Ok(())
}

/// Validate a mutation amount and convert it. An amount that truncates to
/// zero smallest units is rejected as well.
pub fn positive_fixed(amount: f64, precision: Precision) -> Result<FixedPoint, AmountError> {
    ensure_positive(amount)?;
    let fixed = FixedPoint::from_human(amount, precision)?;
    if fixed.is_zero() {
        return Err(AmountError::BelowSmallestUnit(precision.decimals()));
    }
    Ok(fixed)
}
