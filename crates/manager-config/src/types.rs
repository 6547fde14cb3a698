//! Configuration types for the position manager.
//!
//! Per-network wiring lives in one explicit object handed to the planner
//! and driver at construction; nothing here is ambient or global.

use crate::ConfigError;
use manager_types::{Address, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete per-network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Network identity and connection settings
	pub network: NetworkSettings,
	/// Signing account settings
	pub account: AccountSettings,
	/// Deployed contract addresses
	pub contracts: ContractsConfig,
	/// Token table, keyed by token id
	pub tokens: HashMap<String, TokenConfig>,
	/// Borrow position wiring
	pub position: PositionConfig,
	/// Savings vault wiring
	pub savings: SavingsConfig,
}

/// Network identity and connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkSettings {
	/// Network name for logging
	pub name: String,
	/// Chain ID, bound into permit signing domains
	pub chain_id: u64,
	/// HTTP RPC endpoint URL
	pub rpc_url: String,
	/// Block confirmations awaited after each submitted step
	pub confirmations: u64,
	/// Decimal scale of fee-per-gas values in intents (9 = gwei)
	#[serde(default = "default_fee_decimals")]
	pub fee_decimals: u8,
}

/// Signing account settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountSettings {
	/// Private key (hex, usually substituted from the environment)
	pub private_key: String,
}

/// Deployed contract addresses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
	/// The collateralized borrow engine
	pub vault_engine: Address,
	/// The savings vault
	pub savings_vault: Address,
	/// The operator contract routing alternate-token operations
	pub gateway: Address,
}

/// One entry in the token table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub decimals: u8,
	/// EIP-2612 support; tokens without it always use approvals
	#[serde(default)]
	pub permit: bool,
	/// EIP-712 domain version used when signing permits
	#[serde(default = "default_permit_version")]
	pub version: String,
}

/// Borrow position wiring.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionConfig {
	/// Token locked as collateral
	pub collateral_token: String,
	/// The engine's native debt token
	pub debt_token: String,
	/// Alternate debt-side token accepted via the gateway route
	pub gateway_token: String,
}

/// Savings vault wiring.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SavingsConfig {
	/// The vault's underlying deposit token
	pub underlying_token: String,
}

fn default_fee_decimals() -> u8 {
	9
}

fn default_permit_version() -> String {
	"1".to_string()
}

impl NetworkConfig {
	/// Looks a token up in the table.
	pub fn token(&self, id: &TokenId) -> Result<&TokenConfig, ConfigError> {
		self.tokens
			.get(id.as_str())
			.ok_or_else(|| ConfigError::UnknownToken(id.to_string()))
	}

	/// Checks internal consistency: referenced tokens exist and the RPC
	/// endpoint looks usable.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.network.rpc_url.starts_with("http://")
			&& !self.network.rpc_url.starts_with("https://")
		{
			return Err(ConfigError::ValidationError(
				"rpc_url must start with http:// or https://".to_string(),
			));
		}
		if self.network.chain_id == 0 {
			return Err(ConfigError::ValidationError(
				"chain_id must be non-zero".to_string(),
			));
		}

		for referenced in [
			&self.position.collateral_token,
			&self.position.debt_token,
			&self.position.gateway_token,
			&self.savings.underlying_token,
		] {
			if !self.tokens.contains_key(referenced) {
				return Err(ConfigError::ValidationError(format!(
					"referenced token '{}' is missing from the token table",
					referenced
				)));
			}
		}

		if self.position.debt_token == self.position.gateway_token {
			return Err(ConfigError::ValidationError(
				"gateway_token must differ from the native debt_token".to_string(),
			));
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	pub(crate) const SAMPLE: &str = r#"
		[network]
		name = "testnet"
		chain_id = 11155111
		rpc_url = "https://rpc.example.org"
		confirmations = 1

		[account]
		private_key = "0x0000000000000000000000000000000000000000000000000000000000000001"

		[contracts]
		vault_engine = "0x1111111111111111111111111111111111111111"
		savings_vault = "0x2222222222222222222222222222222222222222"
		gateway = "0x3333333333333333333333333333333333333333"

		[tokens.weth]
		address = "0x4444444444444444444444444444444444444444"
		decimals = 18

		[tokens.usds]
		address = "0x5555555555555555555555555555555555555555"
		decimals = 18
		permit = true

		[tokens.dai]
		address = "0x6666666666666666666666666666666666666666"
		decimals = 18
		permit = true

		[position]
		collateral_token = "weth"
		debt_token = "usds"
		gateway_token = "dai"

		[savings]
		underlying_token = "usds"
	"#;

	#[test]
	fn sample_config_parses_and_validates() {
		let config: NetworkConfig = toml::from_str(SAMPLE).unwrap();
		config.validate().unwrap();

		assert_eq!(config.network.fee_decimals, 9);
		assert!(config.tokens["usds"].permit);
		assert!(!config.tokens["weth"].permit);
		assert_eq!(config.tokens["usds"].version, "1");
	}

	#[test]
	fn unknown_token_lookup_fails() {
		let config: NetworkConfig = toml::from_str(SAMPLE).unwrap();
		assert!(matches!(
			config.token(&TokenId::from("wbtc")),
			Err(ConfigError::UnknownToken(_))
		));
	}

	#[test]
	fn missing_referenced_token_fails_validation() {
		let mut config: NetworkConfig = toml::from_str(SAMPLE).unwrap();
		config.tokens.remove("weth");
		assert!(matches!(
			config.validate(),
			Err(ConfigError::ValidationError(_))
		));
	}

	#[test]
	fn gateway_token_must_differ_from_native() {
		let mut config: NetworkConfig = toml::from_str(SAMPLE).unwrap();
		config.position.gateway_token = config.position.debt_token.clone();
		assert!(matches!(
			config.validate(),
			Err(ConfigError::ValidationError(_))
		));
	}
}
