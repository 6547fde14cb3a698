//! Alloy-backed transaction delivery.
//!
//! Submits through a wallet-filled provider and polls for receipts until
//! the requested confirmation depth is reached.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::EthereumWallet;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use manager_config::NetworkConfig;
use manager_types::{Transaction, TransactionHash, TransactionReceipt};
use std::sync::Arc;

/// EVM delivery over an HTTP RPC endpoint.
pub struct AlloyDelivery {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
}

impl AlloyDelivery {
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		signer: PrivateKeySigner,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::Network(format!("Invalid RPC URL: {}", e)))?;

		let signer = signer.with_chain_id(Some(chain_id));
		let wallet = EthereumWallet::from(signer);

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		Ok(Self {
			provider: Arc::new(provider),
		})
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError> {
		let request: TransactionRequest = tx.clone().into();
		self.provider
			.estimate_gas(&request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Gas estimation failed: {}", e)))
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let request: TransactionRequest = tx.into();

		let pending_tx = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let hash = TransactionHash(*pending_tx.tx_hash());
		tracing::info!(tx_hash = %hash.truncated(), "Submitted transaction");

		Ok(hash)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		// Poll interval for checking confirmations
		let poll_interval = tokio::time::Duration::from_secs(10);
		// Allow ~15 seconds per confirmation (typical block time) plus buffer
		let seconds_per_confirmation = 20;
		let max_timeout = 3600;
		let timeout_seconds = (confirmations * seconds_per_confirmation)
			.max(seconds_per_confirmation)
			.min(max_timeout);
		let max_wait_time = tokio::time::Duration::from_secs(timeout_seconds);
		let start_time = tokio::time::Instant::now();

		tracing::info!(
			tx_hash = %hash.truncated(),
			"Waiting for {} confirmations (timeout: {}s)",
			confirmations,
			timeout_seconds
		);

		loop {
			if start_time.elapsed() > max_wait_time {
				return Err(DeliveryError::ConfirmationTimeout {
					hash: *hash,
					confirmations,
				});
			}

			let receipt = match self.provider.get_transaction_receipt(hash.0).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					// Not yet mined
					tokio::time::sleep(poll_interval).await;
					continue;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				}
			};

			let current_block = self.provider.get_block_number().await.map_err(|e| {
				DeliveryError::Network(format!("Failed to get block number: {}", e))
			})?;

			let tx_block = receipt.block_number.unwrap_or(0);
			let current_confirmations = current_block.saturating_sub(tx_block);

			if current_confirmations >= confirmations {
				return Ok(TransactionReceipt {
					hash: TransactionHash(receipt.transaction_hash),
					block_number: tx_block,
					success: receipt.status(),
				});
			}

			tracing::debug!(
				tx_hash = %hash.truncated(),
				"Waiting for {} more confirmations",
				confirmations.saturating_sub(current_confirmations)
			);

			tokio::time::sleep(poll_interval).await;
		}
	}
}

/// Factory function to create an HTTP-based delivery provider from
/// configuration. The signing key comes from the account section.
pub fn create_http_delivery(
	config: &NetworkConfig,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	let signer: PrivateKeySigner = config
		.account
		.private_key
		.parse()
		.map_err(|e| DeliveryError::Network(format!("Invalid private key: {}", e)))?;

	Ok(Box::new(AlloyDelivery::new(
		&config.network.rpc_url,
		config.network.chain_id,
		signer,
	)?))
}
