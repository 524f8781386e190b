//! Wallet provider module for the wallet session core.
//!
//! A wallet backend is split in two halves:
//!
//! - a [`WalletConnector`] built from the backend's option table, which runs
//!   the pairing handshake and yields a provider, and
//! - a [`WalletProvider`], the connected handle exposing account access,
//!   chain reads and lifecycle events.
//!
//! Backends register themselves through [`ConnectorRegistry`]; the session
//! core discovers them with [`get_all_implementations`].

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use wallet_types::{ConfigSchema, ImplementationRegistry};

pub mod events;

pub use events::{EventSubscription, ProviderEvents};

/// Re-export implementations
pub mod implementations {
	pub mod coinbase;
	pub mod rpc;
	pub mod walletconnect;
}

/// Errors reported by wallet backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
	/// The user rejected the request in the wallet.
	#[error("Request rejected by user: {0}")]
	Rejected(String),
	/// The endpoint could not be reached or answered with an error.
	#[error("Transport error: {0}")]
	Transport(String),
	/// An account identifier was malformed.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// The endpoint answered with something unexpected.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// The backend's option table is unusable.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// The provider was closed.
	#[error("Provider closed")]
	Closed,
}

/// Connected wallet handle.
///
/// Shaped after EIP-1193: consumers subscribe to lifecycle events, ask for
/// account access with [`enable`](WalletProvider::enable), and read chain
/// state through the remaining methods. All reads are one-shot and never
/// retried by the provider.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait WalletProvider: Send + Sync {
	/// Registers a listener for lifecycle events. The returned handle stops
	/// receiving when dropped or released.
	fn subscribe(&self) -> EventSubscription;

	/// Requests account access and returns the authorized accounts, primary
	/// account first.
	async fn enable(&self) -> Result<Vec<Address>, ProviderError>;

	/// Currently exposed accounts, primary first.
	async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

	/// EIP-155 chain id of the current network.
	async fn chain_id(&self) -> Result<u64, ProviderError>;

	/// `net_version` of the current network.
	async fn network_version(&self) -> Result<String, ProviderError>;

	/// Native coin balance in smallest units.
	async fn get_balance(&self, address: Address) -> Result<U256, ProviderError>;

	/// Executes a read-only contract call and returns the raw return data.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError>;

	/// Closes the underlying transport. Calling it more than once is a no-op.
	async fn close(&self) -> Result<(), ProviderError>;
}

/// Backend half that performs the handshake.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait WalletConnector: Send + Sync {
	/// Schema the backend's option table must satisfy.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Pairs with the wallet and returns a provider that is subscribed to
	/// nothing and not yet enabled.
	async fn connect(&self) -> Result<Arc<dyn WalletProvider>, ProviderError>;
}

/// Application-wide settings every backend receives alongside its options.
#[derive(Debug, Clone)]
pub struct ConnectorContext {
	/// Name the application announces to wallets.
	pub app_name: String,
	/// Default network, e.g. `mainnet`.
	pub network: String,
}

impl Default for ConnectorContext {
	fn default() -> Self {
		Self {
			app_name: "Web3Modal Example App".to_string(),
			network: "mainnet".to_string(),
		}
	}
}

/// Factory signature every backend provides.
pub type ConnectorFactory =
	fn(&toml::Value, &ConnectorContext) -> Result<Box<dyn WalletConnector>, ProviderError>;

/// Registry trait for wallet backends.
pub trait ConnectorRegistry: ImplementationRegistry<Factory = ConnectorFactory> {}

/// All registered backends as `(key, label, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, &'static str, ConnectorFactory)> {
	use implementations::{coinbase, walletconnect};

	vec![
		(
			walletconnect::Registry::NAME,
			walletconnect::Registry::LABEL,
			walletconnect::Registry::factory(),
		),
		(
			coinbase::Registry::NAME,
			coinbase::Registry::LABEL,
			coinbase::Registry::factory(),
		),
	]
}
