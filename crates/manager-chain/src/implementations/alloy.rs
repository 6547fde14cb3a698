//! Alloy-backed chain reader.
//!
//! Issues `eth_call` view reads against the sol!-declared surface in
//! [`crate::calls`] and inspects account code for the EOA check.

use crate::calls::{IVaultEngine, IERC20};
use crate::{ChainError, ChainReader};
use alloy_primitives::{Bytes, TxKind};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use alloy_transport_http::Http;
use async_trait::async_trait;
use manager_config::NetworkConfig;
use manager_types::{Address, U256};
use std::sync::Arc;

/// Read-only provider over an HTTP RPC endpoint.
pub struct AlloyChainReader {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	/// The vault engine consulted for operator whitelist flags.
	vault_engine: Address,
}

impl AlloyChainReader {
	pub fn new(rpc_url: &str, vault_engine: Address) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::Network(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new().on_http(url);

		Ok(Self {
			provider: Arc::new(provider),
			vault_engine,
		})
	}

	async fn view_call(&self, to: Address, data: Vec<u8>) -> Result<Bytes, ChainError> {
		let request = TransactionRequest {
			to: Some(TxKind::Call(to)),
			input: TransactionInput {
				input: Some(data.into()),
				data: None,
			},
			..Default::default()
		};

		self.provider
			.call(&request)
			.await
			.map_err(|e| ChainError::Network(format!("eth_call failed: {}", e)))
	}
}

#[async_trait]
impl ChainReader for AlloyChainReader {
	async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ChainError> {
		let data = IERC20::allowanceCall { owner, spender }.abi_encode();
		let raw = self.view_call(token, data).await?;
		let decoded = IERC20::allowanceCall::abi_decode_returns(&raw, true)
			.map_err(|e| ChainError::Decode(e.to_string()))?;
		Ok(decoded.remaining)
	}

	async fn is_operator_approved(
		&self,
		owner: Address,
		operator: Address,
	) -> Result<bool, ChainError> {
		let data = IVaultEngine::isOperatorCall { owner, operator }.abi_encode();
		let raw = self.view_call(self.vault_engine, data).await?;
		let decoded = IVaultEngine::isOperatorCall::abi_decode_returns(&raw, true)
			.map_err(|e| ChainError::Decode(e.to_string()))?;
		Ok(decoded.approved)
	}

	async fn is_externally_owned(&self, address: Address) -> Result<bool, ChainError> {
		let code = self
			.provider
			.get_code_at(address)
			.await
			.map_err(|e| ChainError::Network(format!("eth_getCode failed: {}", e)))?;
		Ok(code.is_empty())
	}

	async fn permit_nonce(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
		let data = IERC20::noncesCall { owner }.abi_encode();
		let raw = self.view_call(token, data).await?;
		let decoded = IERC20::noncesCall::abi_decode_returns(&raw, true)
			.map_err(|e| ChainError::Decode(e.to_string()))?;
		Ok(decoded.nonce)
	}

	async fn token_name(&self, token: Address) -> Result<String, ChainError> {
		let data = IERC20::nameCall {}.abi_encode();
		let raw = self.view_call(token, data).await?;
		let decoded = IERC20::nameCall::abi_decode_returns(&raw, true)
			.map_err(|e| ChainError::Decode(e.to_string()))?;
		Ok(decoded.tokenName)
	}
}

/// Factory function to create a chain reader from configuration.
pub fn create_chain_reader(config: &NetworkConfig) -> Result<Box<dyn ChainReader>, ChainError> {
	tracing::debug!(rpc_url = %config.network.rpc_url, "Creating chain reader");
	Ok(Box::new(AlloyChainReader::new(
		&config.network.rpc_url,
		config.contracts.vault_engine,
	)?))
}
