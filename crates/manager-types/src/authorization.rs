//! Authorization snapshots and permit signature material.

use alloy_primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// EIP-2612 permit signature material, carried into the terminal call.
///
/// The all-zero value is a well-known sentinel meaning "no permit used",
/// passed through when authorization was granted by approval instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
	pub token: Address,
	pub value: U256,
	pub deadline: u64,
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

impl PermitSignature {
	/// The "no permit used" sentinel: zero address, zero value, zero
	/// deadline, zero signature components.
	pub fn empty() -> Self {
		Self {
			token: Address::ZERO,
			value: U256::ZERO,
			deadline: 0,
			v: 0,
			r: B256::ZERO,
			s: B256::ZERO,
		}
	}

	pub fn is_empty(&self) -> bool {
		self == &Self::empty()
	}
}

impl Default for PermitSignature {
	fn default() -> Self {
		Self::empty()
	}
}

/// Raw EIP-712 signature components returned by a typed-data signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedSignature {
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

/// Snapshot of the caller's current on-chain authorization state.
///
/// Every field is independently caller-overridable; fields left `None`
/// are fetched by the planner on first use. One instance is owned by
/// exactly one planning call and discarded afterwards.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationState {
	/// Whether the gateway is already whitelisted on the caller's position.
	pub operator_approved: Option<bool>,
	/// Current allowance on the collateral / savings-underlying side.
	pub primary_allowance: Option<Decimal>,
	/// Current allowance on the debt-repayment side.
	pub secondary_allowance: Option<Decimal>,
	/// Previously signed permit covering the primary side.
	pub primary_permit: Option<PermitSignature>,
	/// Previously signed permit covering the secondary side.
	pub secondary_permit: Option<PermitSignature>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_sentinel_round_trips() {
		let sentinel = PermitSignature::empty();
		assert!(sentinel.is_empty());

		let mut signed = PermitSignature::empty();
		signed.v = 27;
		assert!(!signed.is_empty());
	}
}
