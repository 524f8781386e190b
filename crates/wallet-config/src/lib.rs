//! Configuration module for the wallet session core.
//!
//! Configuration is a single TOML file. Environment variables are substituted
//! before parsing (`${VAR}` or `${VAR:-default}`), which is how the Infura API
//! key reaches the provider options without being committed to the file.
//! Variables may also come from a `.env` file in the working directory.

use alloy_primitives::Address;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Configuration bundled with the workspace, mirroring the production
/// deployment (USDC on mainnet, Etherscan links, both wallet backends).
pub const BUNDLED_CONFIG: &str = include_str!("../config/default.toml");

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	#[serde(default)]
	pub app: AppConfig,
	#[serde(default)]
	pub session: SessionConfig,
	/// Wallet backends offered to the user, keyed by catalog key. Each value
	/// is the backend's raw option table, validated by the backend's schema.
	pub providers: BTreeMap<String, toml::Value>,
	#[serde(default)]
	pub token: TokenConfig,
	#[serde(default)]
	pub explorer: ExplorerConfig,
}

/// Application identity shared with wallet backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
	#[serde(default = "default_app_name")]
	pub name: String,
	/// Network the backends connect to by default (`mainnet`, `sepolia`, ...).
	#[serde(default = "default_network")]
	pub network: String,
	/// Remember the chosen backend between runs.
	#[serde(default = "default_true")]
	pub cache_provider: bool,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			name: default_app_name(),
			network: default_network(),
			cache_provider: true,
		}
	}
}

/// Connect lifecycle tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
	/// Upper bound on the wallet handshake.
	#[serde(default = "default_handshake_timeout_seconds")]
	pub handshake_timeout_seconds: u64,
	/// File holding the cached provider selection. In memory when unset.
	#[serde(default)]
	pub cache_path: Option<PathBuf>,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			handshake_timeout_seconds: default_handshake_timeout_seconds(),
			cache_path: None,
		}
	}
}

/// The single token whose balance is displayed.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	#[serde(default = "default_token_symbol")]
	pub symbol: String,
	#[serde(default = "default_token_address")]
	pub address: Address,
	/// Chain on which `address` is deployed.
	#[serde(default = "default_home_chain_id")]
	pub home_chain_id: u64,
	#[serde(default = "default_token_decimals")]
	pub decimals: u8,
}

impl Default for TokenConfig {
	fn default() -> Self {
		Self {
			symbol: default_token_symbol(),
			address: default_token_address(),
			home_chain_id: default_home_chain_id(),
			decimals: default_token_decimals(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExplorerConfig {
	/// Prefix of an account page; the address is appended.
	#[serde(default = "default_explorer_url")]
	pub address_url: String,
}

impl Default for ExplorerConfig {
	fn default() -> Self {
		Self {
			address_url: default_explorer_url(),
		}
	}
}

fn default_app_name() -> String {
	"Web3Modal Example App".to_string()
}

fn default_network() -> String {
	"mainnet".to_string()
}

fn default_true() -> bool {
	true
}

fn default_handshake_timeout_seconds() -> u64 {
	120
}

fn default_token_symbol() -> String {
	"USDC".to_string()
}

fn default_token_address() -> Address {
	// USDC proxy contract on Ethereum mainnet.
	alloy_primitives::address!("0882477e7895bdC5cea7cB1552ed914aB157Fe56")
}

fn default_home_chain_id() -> u64 {
	1
}

fn default_token_decimals() -> u8 {
	6
}

fn default_explorer_url() -> String {
	"https://etherscan.io/address/".to_string()
}

/// Maximum accepted handshake bound (one hour).
const MAX_HANDSHAKE_TIMEOUT_SECONDS: u64 = 3600;

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}. Whole-line `#`
/// comments are copied unchanged.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut result = String::with_capacity(input.len());
	for line in input.split_inclusive('\n') {
		// Comment lines may document the placeholder syntax itself.
		if line.trim_start().starts_with('#') {
			result.push_str(line);
			continue;
		}

		let mut last = 0;
		for cap in re.captures_iter(line) {
			let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
				continue;
			};
			let default_value = cap.get(2).map(|m| m.as_str());

			let value = match std::env::var(var_name.as_str()) {
				Ok(v) => v,
				Err(_) => match default_value {
					Some(default) => default.to_string(),
					None => {
						return Err(ConfigError::Validation(format!(
							"Environment variable '{}' not found",
							var_name.as_str()
						)))
					},
				},
			};

			result.push_str(&line[last..full_match.start()]);
			result.push_str(&value);
			last = full_match.end();
		}
		result.push_str(&line[last..]);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file after loading `.env` from the working
	/// directory.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		if dotenvy::dotenv().is_ok() {
			tracing::debug!("Loaded environment from .env");
		}
		let contents = tokio::fs::read_to_string(path).await?;
		let config: Config = contents.parse()?;
		tracing::info!(
			path = %path.display(),
			providers = config.providers.len(),
			"Loaded configuration"
		);
		Ok(config)
	}

	/// Parses the bundled deployment configuration.
	pub fn bundled() -> Result<Self, ConfigError> {
		let _ = dotenvy::dotenv();
		BUNDLED_CONFIG.parse()
	}

	/// Handshake bound as a `Duration`.
	pub fn handshake_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.session.handshake_timeout_seconds)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.providers.is_empty() {
			return Err(ConfigError::Validation(
				"At least one provider must be configured".into(),
			));
		}
		for (key, options) in &self.providers {
			if key.trim().is_empty() {
				return Err(ConfigError::Validation("Provider key cannot be empty".into()));
			}
			if !options.is_table() {
				return Err(ConfigError::Validation(format!(
					"Options of provider '{key}' must be a table"
				)));
			}
		}

		if self.app.network.trim().is_empty() {
			return Err(ConfigError::Validation("app.network cannot be empty".into()));
		}

		let timeout = self.session.handshake_timeout_seconds;
		if timeout == 0 {
			return Err(ConfigError::Validation(
				"session.handshake_timeout_seconds must be greater than 0".into(),
			));
		}
		if timeout > MAX_HANDSHAKE_TIMEOUT_SECONDS {
			return Err(ConfigError::Validation(format!(
				"session.handshake_timeout_seconds cannot exceed {MAX_HANDSHAKE_TIMEOUT_SECONDS}"
			)));
		}

		if self.token.home_chain_id == 0 {
			return Err(ConfigError::Validation(
				"token.home_chain_id must be greater than 0".into(),
			));
		}
		if self.token.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"token.address cannot be the zero address".into(),
			));
		}

		if !self.explorer.address_url.starts_with("http") {
			return Err(ConfigError::Validation(
				"explorer.address_url must be an http(s) URL".into(),
			));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
