//! WalletConnect backend.
//!
//! Pairs through the wallet's JSON-RPC endpoint (Infura for the configured
//! network unless `rpc_url` is given). Options:
//!
//! ```toml
//! [providers.walletconnect]
//! infura_id = "${INFURA_KEY}"
//! # rpc_url = "https://..."
//! # network = "mainnet"
//! # poll_interval_ms = 4000
//! # watch_address = "0x..."
//! ```

use super::rpc::{common_optional_fields, RpcConnector, RpcOptions};
use crate::{ConnectorContext, ProviderError, WalletConnector, WalletProvider};
use async_trait::async_trait;
use std::sync::Arc;
use wallet_types::{non_empty_string, ConfigSchema, Field, FieldType, Schema, ValidationError};

/// Option schema of the WalletConnect backend.
pub struct WalletConnectSchema;

impl WalletConnectSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for WalletConnectSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("infura_id", FieldType::String).with_validator(non_empty_string)],
			common_optional_fields(),
		);
		schema.validate(config)
	}
}

/// WalletConnect connector.
pub struct WalletConnectConnector {
	inner: RpcConnector,
}

impl WalletConnectConnector {
	pub fn new(options: RpcOptions) -> Self {
		Self {
			inner: RpcConnector::new("WalletConnect", options, reqwest::Client::new()),
		}
	}
}

#[async_trait]
impl WalletConnector for WalletConnectConnector {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WalletConnectSchema)
	}

	async fn connect(&self) -> Result<Arc<dyn WalletProvider>, ProviderError> {
		tracing::debug!(url = %self.inner.options().url, "Pairing with WalletConnect endpoint");
		let provider = self.inner.open().await?;
		Ok(provider as Arc<dyn WalletProvider>)
	}
}

/// Factory function to create a WalletConnect connector from configuration.
pub fn create_walletconnect(
	config: &toml::Value,
	context: &ConnectorContext,
) -> Result<Box<dyn WalletConnector>, ProviderError> {
	WalletConnectSchema::validate_config(config)
		.map_err(|e| ProviderError::Configuration(format!("walletconnect: {}", e)))?;
	let options = RpcOptions::from_toml(config, context)?;
	Ok(Box::new(WalletConnectConnector::new(options)))
}

/// Registry for the WalletConnect backend.
pub struct Registry;

impl wallet_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "walletconnect";
	const LABEL: &'static str = "WalletConnect";
	type Factory = crate::ConnectorFactory;

	fn factory() -> Self::Factory {
		create_walletconnect
	}
}

impl crate::ConnectorRegistry for Registry {}
