//! Catalog of wallet backends offered for selection.
//!
//! Built once at startup from the `[providers]` table and read-only after
//! that. Each configured key must name a registered backend; the backend's
//! factory validates its own option table.

use std::sync::Arc;
use wallet_config::Config;
use wallet_provider::{get_all_implementations, ConnectorContext, ConnectorFactory, WalletConnector};
use wallet_types::{ProviderChoice, WalletError};

/// Configured backend before instantiation.
#[derive(Clone)]
pub struct ProviderOption {
	pub key: String,
	pub label: String,
	pub factory: ConnectorFactory,
	pub options: toml::Value,
}

impl ProviderOption {
	/// Resolves the configured backends against the registry, in registry
	/// order.
	pub fn from_config(config: &Config) -> Result<Vec<Self>, WalletError> {
		let registered = get_all_implementations();
		for key in config.providers.keys() {
			if !registered.iter().any(|(name, _, _)| name == key) {
				return Err(WalletError::Configuration(format!(
					"Unknown wallet provider '{}'",
					key
				)));
			}
		}

		Ok(registered
			.into_iter()
			.filter_map(|(key, label, factory)| {
				config.providers.get(key).map(|options| ProviderOption {
					key: key.to_string(),
					label: label.to_string(),
					factory,
					options: options.clone(),
				})
			})
			.collect())
	}
}

struct CatalogEntry {
	choice: ProviderChoice,
	connector: Arc<dyn WalletConnector>,
}

pub struct ProviderCatalog {
	entries: Vec<CatalogEntry>,
}

impl ProviderCatalog {
	/// Builds the catalog described by `config`.
	pub fn from_config(config: &Config) -> Result<Self, WalletError> {
		let context = ConnectorContext {
			app_name: config.app.name.clone(),
			network: config.app.network.clone(),
		};
		Self::from_options(ProviderOption::from_config(config)?, &context)
	}

	/// Instantiates every option through its factory.
	pub fn from_options(
		options: Vec<ProviderOption>,
		context: &ConnectorContext,
	) -> Result<Self, WalletError> {
		let mut entries = Vec::with_capacity(options.len());
		for option in options {
			let connector = (option.factory)(&option.options, context)
				.map_err(|e| WalletError::Configuration(e.to_string()))?;
			tracing::debug!(key = %option.key, "Registered wallet provider");
			entries.push(CatalogEntry {
				choice: ProviderChoice::new(option.key, option.label),
				connector: Arc::from(connector),
			});
		}
		Self::ensure_not_empty(entries)
	}

	/// Catalog over already constructed connectors.
	pub fn from_connectors(
		connectors: Vec<(ProviderChoice, Arc<dyn WalletConnector>)>,
	) -> Result<Self, WalletError> {
		let entries = connectors
			.into_iter()
			.map(|(choice, connector)| CatalogEntry { choice, connector })
			.collect();
		Self::ensure_not_empty(entries)
	}

	fn ensure_not_empty(entries: Vec<CatalogEntry>) -> Result<Self, WalletError> {
		if entries.is_empty() {
			return Err(WalletError::Configuration(
				"At least one wallet provider must be configured".into(),
			));
		}
		Ok(Self { entries })
	}

	/// What the selection prompt shows.
	pub fn choices(&self) -> Vec<ProviderChoice> {
		self.entries.iter().map(|entry| entry.choice.clone()).collect()
	}

	pub fn connector(&self, key: &str) -> Option<Arc<dyn WalletConnector>> {
		self.entries
			.iter()
			.find(|entry| entry.choice.key == key)
			.map(|entry| entry.connector.clone())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
