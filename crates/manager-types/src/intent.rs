//! Caller intents: the desired net change to a position or savings balance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a configured token, keyed into the network token table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TokenId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for TokenId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

/// How the caller prefers to grant token authorizations.
///
/// A permit preference is honored only when the signer and the token can
/// actually produce one; everything else falls back to on-chain approvals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMethod {
	Permit,
	Approve,
}

/// The amount changes the caller wants applied on-chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntentAction {
	/// Adjust a borrow position: positive collateral locks, negative frees;
	/// positive debt draws, negative repays. A debt delta of `Decimal::MIN`
	/// closes the position out entirely.
	AdjustPosition {
		collateral_delta: Decimal,
		debt_delta: Decimal,
	},
	/// Move funds in or out of the savings vault: positive deposits,
	/// negative withdraws.
	Savings { delta: Decimal },
}

/// A single caller intent, planned and executed as one step sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
	pub action: IntentAction,
	/// The debt-side token whose spending is authorized for this operation.
	pub authorization_token: TokenId,
	/// Maximum fee per gas, in the network's configured fee denomination.
	/// Zero leaves fees to the node's own estimation.
	pub fee_cap: Decimal,
	pub approval_preference: ApprovalMethod,
}

impl Intent {
	/// True when this intent is the close-out sentinel: no collateral
	/// change and a repay-everything debt delta.
	pub fn is_close(&self) -> bool {
		matches!(
			&self.action,
			IntentAction::AdjustPosition {
				collateral_delta,
				debt_delta,
			} if collateral_delta.is_zero() && *debt_delta == Decimal::MIN
		)
	}

	/// True when every amount change is exactly zero.
	pub fn is_noop(&self) -> bool {
		match &self.action {
			IntentAction::AdjustPosition {
				collateral_delta,
				debt_delta,
			} => collateral_delta.is_zero() && debt_delta.is_zero(),
			IntentAction::Savings { delta } => delta.is_zero(),
		}
	}
}
