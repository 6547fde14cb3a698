//! Configuration loading for the position manager.
//!
//! Loads the per-network TOML configuration, substitutes `${VAR}`
//! environment references (used for secrets such as the signing key) and
//! validates the result before anything else runs.

use std::env;
use std::path::Path;
use thiserror::Error;

mod types;

pub use types::{
	AccountSettings, ContractsConfig, NetworkConfig, NetworkSettings, PositionConfig,
	SavingsConfig, TokenConfig,
};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("Unknown token: {0}")]
	UnknownToken(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution.
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub async fn load(&self) -> Result<NetworkConfig, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		let config = self.load_from_file(file_path).await?;
		config.validate()?;

		tracing::debug!(network = %config.network.name, "Configuration loaded");
		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<NetworkConfig, ConfigError> {
		let content = tokio::fs::read_to_string(file_path).await?;

		// Substitute environment variables
		let substituted_content = substitute_env_vars(&content)?;

		// Parse TOML
		let config: NetworkConfig = toml::from_str(&substituted_content)
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		Ok(config)
	}
}

/// Replaces `${VAR_NAME}` references with the corresponding environment
/// variable. A missing variable is an error, never an empty substitution.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let mut result = content.to_string();

	let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const MINIMAL: &str = r#"
		[network]
		name = "testnet"
		chain_id = 11155111
		rpc_url = "https://rpc.example.org"
		confirmations = 1

		[account]
		private_key = "${MANAGER_TEST_PRIVATE_KEY}"

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

	#[tokio::test]
	async fn loads_with_env_substitution() {
		env::set_var("MANAGER_TEST_PRIVATE_KEY", "0xdeadbeef");

		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(MINIMAL.as_bytes()).unwrap();

		let config = ConfigLoader::new()
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.account.private_key, "0xdeadbeef");
	}

	#[test]
	fn missing_env_var_is_an_error() {
		env::remove_var("MANAGER_TEST_MISSING_VAR");
		let result = substitute_env_vars("key = \"${MANAGER_TEST_MISSING_VAR}\"");
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
	}

	#[tokio::test]
	async fn missing_file_is_an_error() {
		let result = ConfigLoader::new()
			.with_file("/nonexistent/config.toml")
			.load()
			.await;
		assert!(result.is_err());
	}
}
