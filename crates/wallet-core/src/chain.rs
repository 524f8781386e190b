//! Read-only chain access through the connected wallet provider.
//!
//! Every read is a single request: nothing is retried or cached here. Account
//! identifiers cross this boundary as strings and are parsed on the way in,
//! so malformed input surfaces as [`WalletError::InvalidAddress`] before any
//! request is made.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use std::sync::Arc;
use wallet_provider::{ProviderError, WalletProvider};
use wallet_types::{parse_address, NetworkInfo, WalletError};

sol!(UsdcToken, "abi/usdc.json");

/// Maps a provider failure on a read path to the session error kinds.
pub(crate) fn read_error(context: &str, err: ProviderError) -> WalletError {
	match err {
		ProviderError::InvalidAddress(address) => WalletError::InvalidAddress(address),
		other => WalletError::RpcError(format!("{}: {}", context, other)),
	}
}

/// Chain reads bound to one provider handle.
#[derive(Clone)]
pub struct ChainClient {
	provider: Arc<dyn WalletProvider>,
}

impl ChainClient {
	pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
		Self { provider }
	}

	/// Accounts exposed by the wallet, canonical account first.
	pub async fn list_accounts(&self) -> Result<Vec<String>, WalletError> {
		let accounts = self
			.provider
			.accounts()
			.await
			.map_err(|e| read_error("eth_accounts", e))?;
		Ok(accounts.iter().map(|a| a.to_string()).collect())
	}

	/// Network id as reported by the provider right now.
	pub async fn current_network_id(&self) -> Result<String, WalletError> {
		self.provider
			.network_version()
			.await
			.map_err(|e| read_error("net_version", e))
	}

	pub async fn chain_id(&self) -> Result<u64, WalletError> {
		self.provider
			.chain_id()
			.await
			.map_err(|e| read_error("eth_chainId", e))
	}

	/// Reads chain id and network id together.
	pub async fn network_info(&self) -> Result<NetworkInfo, WalletError> {
		let (chain_id, network_id) = tokio::try_join!(self.chain_id(), self.current_network_id())?;
		Ok(NetworkInfo::new(chain_id, network_id))
	}

	/// Native coin balance of `address` in wei.
	pub async fn native_balance(&self, address: &str) -> Result<String, WalletError> {
		let address = parse_address(address)?;
		let balance = self
			.provider
			.get_balance(address)
			.await
			.map_err(|e| read_error("eth_getBalance", e))?;
		Ok(balance.to_string())
	}

	/// `balanceOf(address)` on the token at `contract`, in the token's
	/// smallest unit.
	pub async fn token_balance(&self, contract: &str, address: &str) -> Result<String, WalletError> {
		let contract = parse_address(contract)?;
		let account = parse_address(address)?;
		let balance = self.balance_of(contract, account).await?;
		Ok(balance.to_string())
	}

	async fn balance_of(&self, contract: Address, account: Address) -> Result<U256, WalletError> {
		let call_data = UsdcToken::balanceOfCall { account }.abi_encode();
		let response = self
			.provider
			.call(contract, call_data.into())
			.await
			.map_err(|e| read_error("balanceOf", e))?;

		if response.len() != 32 {
			return Err(WalletError::RpcError(format!(
				"Unexpected balanceOf response length: expected 32 bytes, got {}",
				response.len()
			)));
		}

		let mut balance_buf = [0u8; 32];
		balance_buf.copy_from_slice(response.as_ref());
		Ok(U256::from_be_bytes(balance_buf))
	}
}
