//! Observable session state.
//!
//! `ViewSnapshot` is the record presentation code reads. `NetworkInfo` and
//! `BalanceSnapshot` are derived from the active session and are always
//! replaced as a whole, never patched field by field.

use crate::utils::short_address;
use serde::{Deserialize, Serialize};

/// Lifecycle state of the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
	#[default]
	Disconnected,
	Connecting,
	Connected,
}

/// Identifiers of the network the wallet is currently on.
///
/// Both fields are either set together or empty together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
	chain_id: String,
	network_id: String,
}

impl NetworkInfo {
	/// Builds a populated record from the provider's chain id and network id.
	pub fn new(chain_id: u64, network_id: impl Into<String>) -> Self {
		let network_id = network_id.into();
		if network_id.is_empty() {
			return Self::default();
		}
		Self {
			chain_id: chain_id.to_string(),
			network_id,
		}
	}

	/// The empty record used while disconnected.
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn chain_id(&self) -> &str {
		&self.chain_id
	}

	pub fn network_id(&self) -> &str {
		&self.network_id
	}

	/// Numeric chain id, `None` while empty.
	pub fn chain_id_u64(&self) -> Option<u64> {
		self.chain_id.parse().ok()
	}

	pub fn is_set(&self) -> bool {
		!self.chain_id.is_empty()
	}
}

/// Balances of the connected account, in smallest units.
///
/// Serialized with the field names presentation code expects (`eth`, `usdc`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
	#[serde(rename = "eth")]
	pub native: String,
	#[serde(rename = "usdc")]
	pub token: String,
}

impl BalanceSnapshot {
	/// Value used for the token balance off its home chain.
	pub const DEFAULT_AMOUNT: &'static str = "0";

	pub fn new(native: impl Into<String>, token: impl Into<String>) -> Self {
		Self {
			native: native.into(),
			token: token.into(),
		}
	}
}

impl Default for BalanceSnapshot {
	fn default() -> Self {
		Self::new(Self::DEFAULT_AMOUNT, Self::DEFAULT_AMOUNT)
	}
}

/// Everything presentation code may read about the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
	/// Primary account, empty while disconnected.
	pub address: String,
	pub is_active: bool,
	pub network: NetworkInfo,
	pub balances: BalanceSnapshot,
	/// Catalog key of the provider behind the active session.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub provider: Option<String>,
}

impl ViewSnapshot {
	/// The cleared state shown after disconnect or provider close.
	pub fn cleared() -> Self {
		Self::default()
	}

	/// Connect vs. disconnect affordance: driven by the address alone.
	pub fn is_connected(&self) -> bool {
		!self.address.is_empty()
	}

	/// Block-explorer page for the connected account.
	pub fn explorer_url(&self, base: &str) -> Option<String> {
		if !self.is_connected() {
			return None;
		}
		let base = base.trim_end_matches('/');
		Some(format!("{}/{}", base, self.address))
	}

	/// Abbreviated address for compact display.
	pub fn short_address(&self) -> String {
		short_address(&self.address)
	}
}
