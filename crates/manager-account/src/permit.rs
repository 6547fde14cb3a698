//! EIP-2612 permit message construction.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};

/// Permit signatures are valid for 30 minutes from issuance.
pub const PERMIT_TTL_SECS: u64 = 30 * 60;

sol! {
	/// EIP-2612 permit message.
	struct Permit {
		address owner;
		address spender;
		uint256 value;
		uint256 nonce;
		uint256 deadline;
	}
}

/// EIP-712 domain for a permit-capable token, bound to the token's
/// on-chain name and the network's chain id.
pub fn permit_domain(name: &str, version: &str, chain_id: u64, token: Address) -> Eip712Domain {
	Eip712Domain::new(
		Some(name.to_string().into()),
		Some(version.to_string().into()),
		Some(U256::from(chain_id)),
		Some(token),
		None,
	)
}

/// Signing digest for a permit granting `spender` up to `value` of the
/// owner's tokens until `deadline`.
pub fn permit_digest(
	domain: &Eip712Domain,
	owner: Address,
	spender: Address,
	value: U256,
	nonce: U256,
	deadline: u64,
) -> B256 {
	let message = Permit {
		owner,
		spender,
		value,
		nonce,
		deadline: U256::from(deadline),
	};
	message.eip712_signing_hash(domain)
}
