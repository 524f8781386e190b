//! JSON-RPC wallet provider built on Alloy.
//!
//! Both bundled backends talk to the wallet through an EIP-1193 compatible
//! JSON-RPC endpoint (Infura by default). The provider asks for accounts with
//! `eth_requestAccounts`, falls back to `eth_accounts` on endpoints that do not
//! implement it, and finally to a configured watch-only address.
//!
//! After `enable()` a watcher task polls accounts and chain id and turns
//! changes into [`ProviderEvent`]s. Repeated transport failures are reported
//! as a provider-initiated `Close`.

use crate::{ConnectorContext, EventSubscription, ProviderError, ProviderEvents, WalletProvider};
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::TransactionRequest;
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use wallet_types::{parse_address, Field, FieldType, ProviderEvent};

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;
/// JSON-RPC "method not found".
const METHOD_NOT_FOUND_CODE: i64 = -32601;
/// Consecutive failed polls after which the session is considered gone.
const MAX_POLL_FAILURES: u32 = 3;
const DEFAULT_POLL_INTERVAL_MS: u64 = 4_000;

/// Maps an Alloy transport error onto the provider error taxonomy.
pub(crate) fn classify_rpc_error(context: &str, error: TransportError) -> ProviderError {
	if let TransportError::ErrorResp(payload) = &error {
		if payload.code == USER_REJECTED_CODE {
			return ProviderError::Rejected(payload.message.to_string());
		}
	}
	ProviderError::Transport(format!("{}: {}", context, error))
}

fn is_method_not_found(error: &TransportError) -> bool {
	matches!(error, TransportError::ErrorResp(payload) if payload.code == METHOD_NOT_FOUND_CODE)
}

/// Infura endpoint for a named network.
pub fn infura_url(network: &str, infura_id: &str) -> String {
	format!("https://{}.infura.io/v3/{}", network, infura_id)
}

/// Optional fields shared by every JSON-RPC backend.
pub(crate) fn common_optional_fields() -> Vec<Field> {
	vec![
		Field::new("rpc_url", FieldType::String).with_validator(|value| {
			let url = value.as_str().unwrap_or_default();
			url::Url::parse(url)
				.map(|_| ())
				.map_err(|e| format!("invalid URL: {}", e))
		}),
		Field::new("network", FieldType::String),
		Field::new(
			"poll_interval_ms",
			FieldType::Integer {
				min: Some(100),
				max: Some(600_000),
			},
		),
		Field::new("watch_address", FieldType::String).with_validator(|value| {
			parse_address(value.as_str().unwrap_or_default())
				.map(|_| ())
				.map_err(|e| e.to_string())
		}),
	]
}

/// Endpoint and watcher settings resolved from an option table.
#[derive(Debug, Clone)]
pub struct RpcOptions {
	pub url: url::Url,
	pub poll_interval: Duration,
	pub watch_address: Option<Address>,
}

impl RpcOptions {
	/// Resolves the endpoint: an explicit `rpc_url` wins, otherwise the Infura
	/// endpoint for `network` (falling back to the application network).
	pub fn from_toml(config: &toml::Value, context: &ConnectorContext) -> Result<Self, ProviderError> {
		let url = match config.get("rpc_url").and_then(|v| v.as_str()) {
			Some(url) => url.to_string(),
			None => {
				let infura_id = config
					.get("infura_id")
					.and_then(|v| v.as_str())
					.ok_or_else(|| {
						ProviderError::Configuration("infura_id or rpc_url is required".into())
					})?;
				let network = config
					.get("network")
					.and_then(|v| v.as_str())
					.unwrap_or(&context.network);
				infura_url(network, infura_id)
			},
		};
		let url = url
			.parse()
			.map_err(|e| ProviderError::Configuration(format!("Invalid RPC URL: {}", e)))?;

		let poll_interval = config
			.get("poll_interval_ms")
			.and_then(|v| v.as_integer())
			.map(|ms| ms as u64)
			.unwrap_or(DEFAULT_POLL_INTERVAL_MS);

		let watch_address = config
			.get("watch_address")
			.and_then(|v| v.as_str())
			.map(parse_address)
			.transpose()
			.map_err(|e| ProviderError::InvalidAddress(e.to_string()))?;

		Ok(Self {
			url,
			poll_interval: Duration::from_millis(poll_interval),
			watch_address,
		})
	}
}

/// Handshake half shared by the JSON-RPC backends.
#[derive(Debug, Clone)]
pub struct RpcConnector {
	label: &'static str,
	options: RpcOptions,
	http: reqwest::Client,
}

impl RpcConnector {
	pub fn new(label: &'static str, options: RpcOptions, http: reqwest::Client) -> Self {
		Self {
			label,
			options,
			http,
		}
	}

	pub fn options(&self) -> &RpcOptions {
		&self.options
	}

	/// Opens the transport and checks that the endpoint answers.
	pub async fn open(&self) -> Result<Arc<RpcWalletProvider>, ProviderError> {
		let transport = Http::with_client(self.http.clone(), self.options.url.clone());
		let client = RpcClient::new(transport, false);
		let provider = ProviderBuilder::new().connect_client(client).erased();

		let chain_id = provider
			.get_chain_id()
			.await
			.map_err(|e| classify_rpc_error("Failed to reach wallet endpoint", e))?;
		tracing::info!(backend = self.label, chain_id, "Wallet endpoint reachable");

		Ok(Arc::new(RpcWalletProvider::new(
			self.label,
			provider,
			self.options.poll_interval,
			self.options.watch_address,
		)))
	}
}

/// Connected JSON-RPC wallet.
pub struct RpcWalletProvider {
	label: &'static str,
	provider: DynProvider,
	events: ProviderEvents,
	poll_interval: Duration,
	watch_address: Option<Address>,
	closed: Arc<AtomicBool>,
	watcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RpcWalletProvider {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RpcWalletProvider")
			.field("label", &self.label)
			.field("inner", &"<DynProvider>")
			.field("closed", &self.closed.load(Ordering::SeqCst))
			.finish()
	}
}

impl RpcWalletProvider {
	pub fn new(
		label: &'static str,
		provider: DynProvider,
		poll_interval: Duration,
		watch_address: Option<Address>,
	) -> Self {
		Self {
			label,
			provider,
			events: ProviderEvents::default(),
			poll_interval,
			watch_address,
			closed: Arc::new(AtomicBool::new(false)),
			watcher: Mutex::new(None),
		}
	}

	fn ensure_open(&self) -> Result<(), ProviderError> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(ProviderError::Closed);
		}
		Ok(())
	}

	async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
		let requested: Result<Vec<Address>, TransportError> = self
			.provider
			.raw_request("eth_requestAccounts".into(), ())
			.await;

		let accounts = match requested {
			Ok(accounts) => accounts,
			Err(e) if is_method_not_found(&e) => {
				tracing::debug!(backend = self.label, "eth_requestAccounts unsupported, using eth_accounts");
				self.provider
					.get_accounts()
					.await
					.map_err(|e| classify_rpc_error("Failed to list accounts", e))?
			},
			Err(e) => return Err(classify_rpc_error("Account request failed", e)),
		};

		if !accounts.is_empty() {
			return Ok(accounts);
		}
		match self.watch_address {
			Some(address) => Ok(vec![address]),
			None => Err(ProviderError::Rejected(
				"wallet did not authorize any account".into(),
			)),
		}
	}

	fn spawn_watcher(&self, accounts: Vec<Address>, chain_id: u64) {
		let provider = self.provider.clone();
		let events = self.events.clone();
		let closed = self.closed.clone();
		let interval = self.poll_interval;
		let poll_accounts = self.watch_address.is_none();
		let label = self.label;

		let handle = tokio::spawn(async move {
			let mut known_accounts = accounts;
			let mut known_chain = chain_id;
			let mut failures = 0u32;

			loop {
				tokio::time::sleep(interval).await;
				if closed.load(Ordering::SeqCst) {
					break;
				}

				let chain = provider.get_chain_id().await;
				let current_accounts = if poll_accounts {
					provider.get_accounts().await.map(Some)
				} else {
					Ok(None)
				};

				match (chain, current_accounts) {
					(Ok(chain), Ok(current_accounts)) => {
						failures = 0;
						if chain != known_chain {
							known_chain = chain;
							events.emit(ProviderEvent::ChainChanged(chain));
						}
						if let Some(current) = current_accounts {
							if current != known_accounts {
								known_accounts = current.clone();
								events.emit(ProviderEvent::AccountsChanged(current));
							}
						}
					},
					(chain, accounts) => {
						failures += 1;
						let error = chain.err().or(accounts.err());
						tracing::warn!(
							backend = label,
							failures,
							error = ?error,
							"Wallet poll failed"
						);
						if failures >= MAX_POLL_FAILURES {
							closed.store(true, Ordering::SeqCst);
							events.emit(ProviderEvent::Close);
							break;
						}
					},
				}
			}
		});

		if let Ok(mut watcher) = self.watcher.lock() {
			if let Some(previous) = watcher.replace(handle) {
				previous.abort();
			}
		}
	}
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
	fn subscribe(&self) -> EventSubscription {
		self.events.subscribe()
	}

	async fn enable(&self) -> Result<Vec<Address>, ProviderError> {
		self.ensure_open()?;
		let accounts = self.request_accounts().await?;
		let chain_id = self.chain_id().await?;
		self.spawn_watcher(accounts.clone(), chain_id);
		tracing::info!(
			backend = self.label,
			accounts = accounts.len(),
			chain_id,
			"Account access enabled"
		);
		Ok(accounts)
	}

	async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
		self.ensure_open()?;
		if let Some(address) = self.watch_address {
			return Ok(vec![address]);
		}
		self.provider
			.get_accounts()
			.await
			.map_err(|e| classify_rpc_error("Failed to list accounts", e))
	}

	async fn chain_id(&self) -> Result<u64, ProviderError> {
		self.ensure_open()?;
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| classify_rpc_error("Failed to get chain id", e))
	}

	async fn network_version(&self) -> Result<String, ProviderError> {
		self.ensure_open()?;
		self.provider
			.get_net_version()
			.await
			.map(|version| version.to_string())
			.map_err(|e| classify_rpc_error("Failed to get network version", e))
	}

	async fn get_balance(&self, address: Address) -> Result<U256, ProviderError> {
		self.ensure_open()?;
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| classify_rpc_error("Failed to get balance", e))
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
		self.ensure_open()?;
		let tx = TransactionRequest::default().to(to).input(data.into());
		self.provider
			.call(tx)
			.await
			.map_err(|e| classify_rpc_error("Contract call failed", e))
	}

	async fn close(&self) -> Result<(), ProviderError> {
		let already_closed = self.closed.swap(true, Ordering::SeqCst);
		let watcher = self
			.watcher
			.lock()
			.map_err(|_| ProviderError::Transport("watcher lock poisoned".into()))?
			.take();
		if let Some(handle) = watcher {
			handle.abort();
		}
		if !already_closed {
			tracing::info!(backend = self.label, "Wallet transport closed");
		}
		Ok(())
	}
}

impl Drop for RpcWalletProvider {
	fn drop(&mut self) {
		if let Ok(mut watcher) = self.watcher.lock() {
			if let Some(handle) = watcher.take() {
				handle.abort();
			}
		}
	}
}
