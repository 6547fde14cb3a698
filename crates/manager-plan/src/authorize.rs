//! Permit-or-approve decisions for a single token authorization
//! requirement.

use manager_config::TokenConfig;
use manager_types::{
	to_base_units, Address, AmountError, ApprovalMethod, PermitSignature, TokenId, U256,
};
use rust_decimal::Decimal;

/// Concrete action chosen for one authorization requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
	Permit,
	Approve,
}

/// One token authorization the plan must satisfy before executing.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthRequirement {
	pub token: TokenId,
	pub amount: Decimal,
	pub spender: Address,
	pub method: AuthMethod,
}

/// Outcome of evaluating one side of the intent.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
	/// The existing allowance already covers the amount.
	AllowanceSufficient,
	/// A cached permit signature covers the amount; it is carried into
	/// the terminal call instead of emitting a step.
	CachedPermit(PermitSignature),
	/// A fresh authorization step is required.
	Step(AuthRequirement),
}

/// Picks permit or approval for a requirement. Permits are only offered
/// to EOA signers on permit-capable tokens; everything else downgrades
/// to an on-chain approval.
pub fn choose_method(
	preference: ApprovalMethod,
	signer_is_eoa: bool,
	token_supports_permit: bool,
) -> AuthMethod {
	if preference == ApprovalMethod::Permit && signer_is_eoa && token_supports_permit {
		AuthMethod::Permit
	} else {
		AuthMethod::Approve
	}
}

/// Whether a cached permit satisfies the requested amount. Expired,
/// empty or mismatched signatures never do.
pub fn permit_covers(
	signature: Option<&PermitSignature>,
	token_address: Address,
	amount_units: U256,
	now: u64,
) -> bool {
	match signature {
		Some(signature) => {
			!signature.is_empty()
				&& signature.token == token_address
				&& signature.deadline > now
				&& signature.value >= amount_units
		}
		None => false,
	}
}

/// Evaluates one side of the intent: short-circuits on a sufficient
/// cached allowance or permit, otherwise requires a fresh step.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
	token: TokenId,
	token_config: &TokenConfig,
	amount: Decimal,
	spender: Address,
	allowance: Decimal,
	cached_permit: Option<&PermitSignature>,
	preference: ApprovalMethod,
	signer_is_eoa: bool,
	now: u64,
) -> Result<AuthDecision, AmountError> {
	if allowance >= amount {
		return Ok(AuthDecision::AllowanceSufficient);
	}

	let method = choose_method(preference, signer_is_eoa, token_config.permit);
	if method == AuthMethod::Permit {
		let amount_units = to_base_units(amount, token_config.decimals)?;
		if let Some(signature) = cached_permit {
			if permit_covers(Some(signature), token_config.address, amount_units, now) {
				// The cached signature is threaded into the terminal call.
				return Ok(AuthDecision::CachedPermit(signature.clone()));
			}
		}
	}

	Ok(AuthDecision::Step(AuthRequirement {
		token,
		amount,
		spender,
		method,
	}))
}
