//! Planned steps: the ordered actions that realize an intent on-chain.

use crate::authorization::PermitSignature;
use crate::intent::TokenId;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which contract path an execution takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
	/// Straight to the vault engine or savings vault.
	Direct,
	/// Through the gateway contract, which must be whitelisted as an
	/// operator on the caller's position.
	Gateway,
}

/// Call parameters for the terminal state-mutating step.
///
/// Permit slots default to the empty sentinel and are filled with the
/// signatures collected earlier in the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecuteCall {
	AdjustPosition {
		collateral_delta: Decimal,
		debt_delta: Decimal,
		route: Route,
		collateral_permit: PermitSignature,
		debt_permit: PermitSignature,
	},
	SavingsDeposit {
		amount: Decimal,
		permit: PermitSignature,
	},
	SavingsWithdraw {
		amount: Decimal,
	},
}

/// One planned action. `Execute` is always present and always last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepKind {
	/// Whitelist the operator contract on the caller's position.
	Whitelist { operator: Address },
	/// Sign an off-chain permit granting `spender` up to `amount`.
	Permit {
		token: TokenId,
		amount: Decimal,
		spender: Address,
	},
	/// Submit an on-chain approval granting `spender` exactly `amount`.
	Approve {
		token: TokenId,
		amount: Decimal,
		spender: Address,
	},
	/// The terminal position / savings mutation.
	Execute { call: ExecuteCall },
}

impl StepKind {
	pub fn label(&self) -> &'static str {
		match self {
			StepKind::Whitelist { .. } => "whitelist",
			StepKind::Permit { .. } => "permit",
			StepKind::Approve { .. } => "approve",
			StepKind::Execute { .. } => "execute",
		}
	}
}

/// A step yielded by the sequencer. Numbering is contiguous from 1 and
/// `total_steps` is fixed before the first step is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
	pub step_number: u32,
	pub total_steps: u32,
	pub kind: StepKind,
}
