//! Balance resolution for the connected account.
//!
//! A snapshot is assembled from two reads: the native balance, always, and
//! the token balance, only on the token's home chain. Both reads run
//! concurrently and the snapshot is returned only once both have finished,
//! so callers never observe half of an update. If either read fails, the
//! whole snapshot is discarded.

use crate::chain::ChainClient;
use alloy_primitives::Address;
use wallet_config::TokenConfig;
use wallet_types::{BalanceSnapshot, WalletError};

/// The token whose balance is displayed next to the native coin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBinding {
	/// Contract address on `home_chain_id`.
	pub address: Address,
	pub home_chain_id: u64,
}

impl From<&TokenConfig> for TokenBinding {
	fn from(config: &TokenConfig) -> Self {
		Self {
			address: config.address,
			home_chain_id: config.home_chain_id,
		}
	}
}

pub struct BalanceResolver {
	client: ChainClient,
	token: TokenBinding,
}

impl BalanceResolver {
	pub fn new(client: ChainClient, token: TokenBinding) -> Self {
		Self { client, token }
	}

	/// Builds the balance snapshot of `address` on `chain_id`.
	pub async fn resolve(&self, chain_id: u64, address: &str) -> Result<BalanceSnapshot, WalletError> {
		let native = async {
			self.client
				.native_balance(address)
				.await
				.map_err(|e| WalletError::BalanceFetchFailed(format!("native balance: {}", e)))
		};
		let token = async {
			if chain_id != self.token.home_chain_id {
				tracing::debug!(
					chain_id,
					home_chain_id = self.token.home_chain_id,
					"Token not deployed on current chain"
				);
				return Ok(BalanceSnapshot::DEFAULT_AMOUNT.to_string());
			}
			self.client
				.token_balance(&self.token.address.to_string(), address)
				.await
				.map_err(|e| WalletError::BalanceFetchFailed(format!("token balance: {}", e)))
		};

		let (native, token) = tokio::try_join!(native, token)?;
		tracing::debug!(chain_id, %native, %token, "Resolved balances");
		Ok(BalanceSnapshot::new(native, token))
	}
}
