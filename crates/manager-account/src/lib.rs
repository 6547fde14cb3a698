//! Account abstraction: address derivation and EIP-712 digest signing.

use async_trait::async_trait;
use manager_types::{Address, TypedSignature, B256};
use thiserror::Error;

pub mod implementations;
pub mod permit;

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// A signer capable of producing EIP-712 signatures over prepared digests.
///
/// Only the digest crosses this boundary; typed-data assembly (domains,
/// struct hashes) stays with the caller, which keeps implementations
/// oblivious to the message schema they sign.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	async fn address(&self) -> Result<Address, AccountError>;
	async fn sign_digest(&self, digest: &B256) -> Result<TypedSignature, AccountError>;
}
