//! Contract call surface and calldata construction.
//!
//! Every transaction this system submits is built here, from the ERC-20
//! approvals up to the terminal position / savings mutations.

use crate::ChainError;
use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};
use manager_config::NetworkConfig;
use manager_types::{
	to_base_units, to_signed_base_units, Address, ExecuteCall, PermitSignature, Route, TokenId,
	Transaction,
};
use rust_decimal::Decimal;

sol! {
	/// Permit material threaded into state-mutating calls; zeroed when the
	/// authorization was granted by approval instead.
	struct PermitPayload {
		address token;
		uint256 value;
		uint256 deadline;
		uint8 v;
		bytes32 r;
		bytes32 s;
	}

	interface IERC20 {
		function approve(address spender, uint256 value) external returns (bool ok);
		function allowance(address owner, address spender) external view returns (uint256 remaining);
		function nonces(address owner) external view returns (uint256 nonce);
		function name() external view returns (string tokenName);
	}

	interface IVaultEngine {
		function approveOperator(address operator) external;
		function isOperator(address owner, address operator) external view returns (bool approved);
		function adjust(int256 collateralDelta, int256 debtDelta, PermitPayload collateralPermit) external;
	}

	interface IGateway {
		function adjust(address owner, int256 collateralDelta, int256 debtDelta, PermitPayload collateralPermit, PermitPayload debtPermit) external;
	}

	interface ISavingsVault {
		function deposit(uint256 assets, address receiver, PermitPayload assetPermit) external returns (uint256 shares);
		function withdraw(uint256 assets, address receiver) external returns (uint256 shares);
	}
}

fn permit_payload(signature: &PermitSignature) -> PermitPayload {
	PermitPayload {
		token: signature.token,
		value: signature.value,
		deadline: U256::from(signature.deadline),
		v: signature.v,
		r: signature.r,
		s: signature.s,
	}
}

fn transaction(config: &NetworkConfig, to: Address, data: Vec<u8>) -> Transaction {
	Transaction {
		to,
		data: data.into(),
		value: U256::ZERO,
		chain_id: config.network.chain_id,
		gas_limit: None,
		max_fee_per_gas: None,
		max_priority_fee_per_gas: None,
	}
}

/// ERC-20 approval for exactly `amount` towards `spender`.
pub fn approve_transaction(
	config: &NetworkConfig,
	token: &TokenId,
	spender: Address,
	amount: Decimal,
) -> Result<Transaction, ChainError> {
	let token = config.token(token)?;
	let value = to_base_units(amount, token.decimals)?;
	let data = IERC20::approveCall { spender, value }.abi_encode();
	Ok(transaction(config, token.address, data))
}

/// Whitelists `operator` on the caller's position.
pub fn whitelist_transaction(config: &NetworkConfig, operator: Address) -> Transaction {
	let data = IVaultEngine::approveOperatorCall { operator }.abi_encode();
	transaction(config, config.contracts.vault_engine, data)
}

/// The terminal state-mutating call for an intent.
pub fn execute_transaction(
	config: &NetworkConfig,
	owner: Address,
	call: &ExecuteCall,
) -> Result<Transaction, ChainError> {
	match call {
		ExecuteCall::AdjustPosition {
			collateral_delta,
			debt_delta,
			route,
			collateral_permit,
			debt_permit,
		} => {
			let collateral = config.token(&TokenId::new(&config.position.collateral_token))?;
			let debt = config.token(&TokenId::new(&config.position.debt_token))?;
			let collateral_delta = to_signed_base_units(*collateral_delta, collateral.decimals)?;
			let debt_delta = to_signed_base_units(*debt_delta, debt.decimals)?;

			match route {
				Route::Direct => {
					let data = IVaultEngine::adjustCall {
						collateralDelta: collateral_delta,
						debtDelta: debt_delta,
						collateralPermit: permit_payload(collateral_permit),
					}
					.abi_encode();
					Ok(transaction(config, config.contracts.vault_engine, data))
				}
				Route::Gateway => {
					let data = IGateway::adjustCall {
						owner,
						collateralDelta: collateral_delta,
						debtDelta: debt_delta,
						collateralPermit: permit_payload(collateral_permit),
						debtPermit: permit_payload(debt_permit),
					}
					.abi_encode();
					Ok(transaction(config, config.contracts.gateway, data))
				}
			}
		}
		ExecuteCall::SavingsDeposit { amount, permit } => {
			let underlying = config.token(&TokenId::new(&config.savings.underlying_token))?;
			let assets = to_base_units(*amount, underlying.decimals)?;
			let data = ISavingsVault::depositCall {
				assets,
				receiver: owner,
				assetPermit: permit_payload(permit),
			}
			.abi_encode();
			Ok(transaction(config, config.contracts.savings_vault, data))
		}
		ExecuteCall::SavingsWithdraw { amount } => {
			let underlying = config.token(&TokenId::new(&config.savings.underlying_token))?;
			let assets = to_base_units(*amount, underlying.decimals)?;
			let data = ISavingsVault::withdrawCall {
				assets,
				receiver: owner,
			}
			.abi_encode();
			Ok(transaction(config, config.contracts.savings_vault, data))
		}
	}
}
