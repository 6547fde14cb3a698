//! Account provider implementations.
//!
//! Currently a single implementation backed by a locally held private key,
//! using the Alloy signer. Suitable wherever key management simplicity is
//! acceptable; hardware or remote signers would slot in behind the same
//! trait.

use crate::{AccountError, AccountInterface};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use manager_config::AccountSettings;
use manager_types::{Address, TypedSignature, B256};

/// Local wallet over an in-memory private key.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a new LocalWallet from a hex-encoded private key, with or
	/// without the 0x prefix.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_digest(&self, digest: &B256) -> Result<TypedSignature, AccountError> {
		let signature = self
			.signer
			.sign_hash(digest)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign digest: {}", e)))?;

		// Standard Ethereum recovery id encoding: v = 27 + y_parity
		Ok(TypedSignature {
			v: if signature.v() { 28 } else { 27 },
			r: B256::from(signature.r()),
			s: B256::from(signature.s()),
		})
	}
}

/// Factory function to create an account provider from configuration.
pub fn create_account(settings: &AccountSettings) -> Result<Box<dyn AccountInterface>, AccountError> {
	Ok(Box::new(LocalWallet::new(&settings.private_key)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{PrimitiveSignature, U256};

	const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f";

	#[tokio::test]
	async fn signature_recovers_to_the_wallet_address() {
		let wallet = LocalWallet::new(TEST_KEY).unwrap();
		let address = wallet.address().await.unwrap();

		let digest = B256::repeat_byte(0x42);
		let signature = wallet.sign_digest(&digest).await.unwrap();
		assert!(signature.v == 27 || signature.v == 28);

		let recoverable = PrimitiveSignature::new(
			U256::from_be_bytes(signature.r.0),
			U256::from_be_bytes(signature.s.0),
			signature.v == 28,
		);
		let recovered = recoverable.recover_address_from_prehash(&digest).unwrap();
		assert_eq!(recovered, address);
	}

	#[test]
	fn invalid_key_is_rejected() {
		assert!(matches!(
			LocalWallet::new("not-a-key"),
			Err(AccountError::InvalidKey(_))
		));
	}

	#[test]
	fn factory_rejects_malformed_keys() {
		let settings = AccountSettings {
			private_key: "not-a-key".to_string(),
		};
		assert!(create_account(&settings).is_err());
	}
}
