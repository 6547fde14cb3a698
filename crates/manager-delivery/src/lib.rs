//! Transaction delivery: gas estimation, submission and confirmation.

use async_trait::async_trait;
use manager_types::{Transaction, TransactionHash, TransactionReceipt};
use thiserror::Error;

pub mod implementations;

#[derive(Debug, Error)]
pub enum DeliveryError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Timed out waiting for {confirmations} confirmations of {hash}")]
	ConfirmationTimeout {
		hash: TransactionHash,
		confirmations: u64,
	},
}

/// Submits transactions and tracks them to confirmation depth.
///
/// Implementations perform no retries; a failed submission or a timed-out
/// confirmation surfaces to the caller as-is.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Estimates the gas a call will consume.
	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError>;

	/// Signs and broadcasts a transaction.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Waits until the transaction has the requested number of
	/// confirmations and returns its receipt, success flag included.
	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;
}
