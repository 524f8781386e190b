//! Coinbase Wallet backend.
//!
//! Same JSON-RPC transport as WalletConnect, but the application announces
//! itself: `app_name` is sent as the HTTP user agent.
//!
//! ```toml
//! [providers.coinbasewallet]
//! app_name = "Web3Modal Example App"
//! infura_id = "${INFURA_KEY}"
//! # dark_mode = false
//! ```

use super::rpc::{common_optional_fields, RpcConnector, RpcOptions};
use crate::{ConnectorContext, ProviderError, WalletConnector, WalletProvider};
use async_trait::async_trait;
use std::sync::Arc;
use wallet_types::{non_empty_string, ConfigSchema, Field, FieldType, Schema, ValidationError};

pub struct CoinbaseWalletSchema;

impl CoinbaseWalletSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for CoinbaseWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let mut optional = common_optional_fields();
		optional.push(Field::new("app_logo_url", FieldType::String));
		optional.push(Field::new("dark_mode", FieldType::Boolean));

		let schema = Schema::new(
			vec![
				Field::new("app_name", FieldType::String).with_validator(non_empty_string),
				Field::new("infura_id", FieldType::String).with_validator(non_empty_string),
			],
			optional,
		);
		schema.validate(config)
	}
}

pub struct CoinbaseWalletConnector {
	app_name: String,
	inner: RpcConnector,
}

impl CoinbaseWalletConnector {
	pub fn new(app_name: String, options: RpcOptions) -> Result<Self, ProviderError> {
		let http = reqwest::Client::builder()
			.user_agent(app_name.clone())
			.build()
			.map_err(|e| ProviderError::Configuration(format!("HTTP client: {}", e)))?;
		Ok(Self {
			app_name,
			inner: RpcConnector::new("Coinbase Wallet", options, http),
		})
	}

	pub fn app_name(&self) -> &str {
		&self.app_name
	}
}

#[async_trait]
impl WalletConnector for CoinbaseWalletConnector {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(CoinbaseWalletSchema)
	}

	async fn connect(&self) -> Result<Arc<dyn WalletProvider>, ProviderError> {
		tracing::debug!(app = %self.app_name, "Requesting Coinbase Wallet session");
		let provider = self.inner.open().await?;
		Ok(provider as Arc<dyn WalletProvider>)
	}
}

/// Factory function to create a Coinbase Wallet connector from configuration.
///
/// A missing `app_name` falls back to the application name from `[app]`.
pub fn create_coinbase_wallet(
	config: &toml::Value,
	context: &ConnectorContext,
) -> Result<Box<dyn WalletConnector>, ProviderError> {
	let mut config = config.clone();
	if let Some(table) = config.as_table_mut() {
		table
			.entry("app_name")
			.or_insert(toml::Value::String(context.app_name.clone()));
	}
	CoinbaseWalletSchema::validate_config(&config)
		.map_err(|e| ProviderError::Configuration(format!("coinbasewallet: {}", e)))?;

	let app_name = config
		.get("app_name")
		.and_then(|v| v.as_str())
		.unwrap_or(&context.app_name)
		.to_string();
	let options = RpcOptions::from_toml(&config, context)?;
	Ok(Box::new(CoinbaseWalletConnector::new(app_name, options)?))
}

pub struct Registry;

impl wallet_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "coinbasewallet";
	const LABEL: &'static str = "Coinbase Wallet";
	type Factory = crate::ConnectorFactory;

	fn factory() -> Self::Factory {
		create_coinbase_wallet
	}
}

impl crate::ConnectorRegistry for Registry {}
