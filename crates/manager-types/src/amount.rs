//! Conversions between decimal amounts and on-chain integer units.
//!
//! Caller-facing amounts are `rust_decimal` values; contracts deal in
//! fixed-point integers at each token's decimal scale. `Decimal::MAX`
//! doubles as the unlimited sentinel and `Decimal::MIN` as the close-out
//! sentinel on signed deltas.

use alloy_primitives::{Sign, I256, U256};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
	/// The amount carries more fractional digits than the token supports.
	#[error("Amount {0} has more fractional digits than the token's {1} decimals")]
	PrecisionLoss(Decimal, u8),
	/// A spend amount must not be negative.
	#[error("Amount {0} is negative")]
	Negative(Decimal),
	/// The scaled value does not fit the on-chain integer range.
	#[error("Amount {0} does not fit into the on-chain integer range")]
	Overflow(Decimal),
}

/// Converts a non-negative decimal amount to base units at the given token
/// scale. `Decimal::MAX` maps to `U256::MAX`.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, AmountError> {
	if amount == Decimal::MAX {
		return Ok(U256::MAX);
	}
	if amount.is_sign_negative() {
		return Err(AmountError::Negative(amount));
	}
	let amount = amount.normalize();
	let scale = amount.scale();
	if scale > decimals as u32 {
		return Err(AmountError::PrecisionLoss(amount, decimals));
	}
	let mantissa = U256::from(amount.mantissa().unsigned_abs());
	Ok(mantissa * U256::from(10u8).pow(U256::from(decimals as u32 - scale)))
}

/// Converts a signed decimal delta to base units. `Decimal::MIN` maps to
/// `I256::MIN`, the repay-everything convention of the vault engine.
pub fn to_signed_base_units(delta: Decimal, decimals: u8) -> Result<I256, AmountError> {
	if delta == Decimal::MIN {
		return Ok(I256::MIN);
	}
	let delta = delta.normalize();
	let scale = delta.scale();
	if scale > decimals as u32 {
		return Err(AmountError::PrecisionLoss(delta, decimals));
	}
	let magnitude = U256::from(delta.mantissa().unsigned_abs())
		* U256::from(10u8).pow(U256::from(decimals as u32 - scale));
	let sign = if delta.is_sign_negative() {
		Sign::Negative
	} else {
		Sign::Positive
	};
	I256::checked_from_sign_and_abs(sign, magnitude).ok_or(AmountError::Overflow(delta))
}

/// Converts on-chain base units back to a decimal at the given token
/// scale. Values beyond the decimal range clamp to `Decimal::MAX`, which
/// keeps allowance comparisons correct for effectively-unlimited grants.
pub fn from_base_units(units: U256, decimals: u8) -> Decimal {
	let raw = match u128::try_from(units) {
		Ok(value) if value <= i128::MAX as u128 => value as i128,
		_ => return Decimal::MAX,
	};
	Decimal::try_from_i128_with_scale(raw, decimals as u32).unwrap_or(Decimal::MAX)
}
