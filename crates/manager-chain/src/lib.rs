//! Chain read interface and contract call construction.
//!
//! The planner consults `ChainReader` for the authorization state it was
//! not handed up front; the driver turns planned steps into transactions
//! via the builders in [`calls`]. All ABI knowledge lives in this crate.

use async_trait::async_trait;
use manager_config::ConfigError;
use manager_types::{Address, AmountError, U256};
use thiserror::Error;

pub mod calls;
pub mod implementations;

#[derive(Debug, Error)]
pub enum ChainError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Failed to decode contract response: {0}")]
	Decode(String),
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Amount(#[from] AmountError),
}

/// Read-only chain state consulted while building a step plan.
#[async_trait]
pub trait ChainReader: Send + Sync {
	/// Current ERC-20 allowance granted by `owner` to `spender`.
	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ChainError>;

	/// Whether `operator` is whitelisted on the owner's position.
	async fn is_operator_approved(
		&self,
		owner: Address,
		operator: Address,
	) -> Result<bool, ChainError>;

	/// Whether the address has no deployed code, i.e. signs as an EOA.
	async fn is_externally_owned(&self, address: Address) -> Result<bool, ChainError>;

	/// Current EIP-2612 nonce for `owner` on a permit-capable token.
	async fn permit_nonce(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

	/// ERC-20 name, as bound into permit signing domains.
	async fn token_name(&self, token: Address) -> Result<String, ChainError>;
}
