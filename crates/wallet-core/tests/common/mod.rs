//! Scripted wallet used by the session lifecycle tests.
//!
//! The fake answers every read from in-memory state, can delay individual
//! reads, and lets a test emit provider events at any point.

#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wallet_core::{
	FixedSelector, MemoryProviderCache, ProviderCache, ProviderCatalog, SessionManager,
	SessionSettings, TokenBinding,
};
use wallet_provider::{
	EventSubscription, ProviderError, ProviderEvents, WalletConnector, WalletProvider,
};
use wallet_types::{ConfigSchema, ProviderChoice, ProviderEvent, Schema, ValidationError};

pub const USDC: Address = alloy_primitives::address!("0882477e7895bdC5cea7cB1552ed914aB157Fe56");

pub fn account(byte: u8) -> Address {
	Address::repeat_byte(byte)
}

#[derive(Default)]
pub struct CallCounts {
	pub enable: AtomicUsize,
	pub native: AtomicUsize,
	pub token: AtomicUsize,
	pub close: AtomicUsize,
}

impl CallCounts {
	pub fn get(counter: &AtomicUsize) -> usize {
		counter.load(Ordering::SeqCst)
	}
}

pub struct FakeWallet {
	events: ProviderEvents,
	accounts: Mutex<Vec<Address>>,
	chain_id: AtomicU64,
	native: U256,
	native_by_account: HashMap<Address, U256>,
	token: U256,
	enable_delay: Duration,
	native_delay: Duration,
	token_delay: Duration,
	pub calls: CallCounts,
}

impl FakeWallet {
	/// Emits a lifecycle event as the wallet would.
	pub fn emit(&self, event: ProviderEvent) {
		if let ProviderEvent::ChainChanged(chain_id) = &event {
			self.chain_id.store(*chain_id, Ordering::SeqCst);
		}
		if let ProviderEvent::AccountsChanged(accounts) = &event {
			*self.accounts.lock().unwrap() = accounts.clone();
		}
		self.events.emit(event);
	}

	pub fn listeners(&self) -> usize {
		self.events.subscriber_count()
	}
}

#[async_trait]
impl WalletProvider for FakeWallet {
	fn subscribe(&self) -> EventSubscription {
		self.events.subscribe()
	}

	async fn enable(&self) -> Result<Vec<Address>, ProviderError> {
		self.calls.enable.fetch_add(1, Ordering::SeqCst);
		tokio::time::sleep(self.enable_delay).await;
		Ok(self.accounts.lock().unwrap().clone())
	}

	async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
		Ok(self.accounts.lock().unwrap().clone())
	}

	async fn chain_id(&self) -> Result<u64, ProviderError> {
		Ok(self.chain_id.load(Ordering::SeqCst))
	}

	async fn network_version(&self) -> Result<String, ProviderError> {
		Ok(self.chain_id.load(Ordering::SeqCst).to_string())
	}

	async fn get_balance(&self, address: Address) -> Result<U256, ProviderError> {
		tokio::time::sleep(self.native_delay).await;
		self.calls.native.fetch_add(1, Ordering::SeqCst);
		Ok(self
			.native_by_account
			.get(&address)
			.copied()
			.unwrap_or(self.native))
	}

	async fn call(&self, to: Address, _data: Bytes) -> Result<Bytes, ProviderError> {
		tokio::time::sleep(self.token_delay).await;
		self.calls.token.fetch_add(1, Ordering::SeqCst);
		if to != USDC {
			return Err(ProviderError::Transport("execution reverted".into()));
		}
		Ok(Bytes::from(self.token.to_be_bytes::<32>().to_vec()))
	}

	async fn close(&self) -> Result<(), ProviderError> {
		self.calls.close.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

pub struct FakeWalletBuilder {
	accounts: Vec<Address>,
	chain_id: u64,
	native: u64,
	native_by_account: HashMap<Address, U256>,
	token: u64,
	enable_delay: Duration,
	native_delay: Duration,
	token_delay: Duration,
}

impl Default for FakeWalletBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeWalletBuilder {
	pub fn new() -> Self {
		Self {
			accounts: vec![account(0xaa), account(0xbb)],
			chain_id: 1,
			native: 1_000,
			native_by_account: HashMap::new(),
			token: 250,
			enable_delay: Duration::ZERO,
			native_delay: Duration::ZERO,
			token_delay: Duration::ZERO,
		}
	}

	pub fn accounts(mut self, accounts: Vec<Address>) -> Self {
		self.accounts = accounts;
		self
	}

	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	pub fn balances(mut self, native: u64, token: u64) -> Self {
		self.native = native;
		self.token = token;
		self
	}

	/// Native balance reported for one account instead of the default.
	pub fn native_for(mut self, holder: Address, native: u64) -> Self {
		self.native_by_account.insert(holder, U256::from(native));
		self
	}

	pub fn enable_delay(mut self, delay: Duration) -> Self {
		self.enable_delay = delay;
		self
	}

	pub fn native_delay(mut self, delay: Duration) -> Self {
		self.native_delay = delay;
		self
	}

	pub fn token_delay(mut self, delay: Duration) -> Self {
		self.token_delay = delay;
		self
	}

	pub fn build(self) -> Arc<FakeWallet> {
		Arc::new(FakeWallet {
			events: ProviderEvents::default(),
			accounts: Mutex::new(self.accounts),
			chain_id: AtomicU64::new(self.chain_id),
			native: U256::from(self.native),
			native_by_account: self.native_by_account,
			token: U256::from(self.token),
			enable_delay: self.enable_delay,
			native_delay: self.native_delay,
			token_delay: self.token_delay,
			calls: CallCounts::default(),
		})
	}
}

struct NoOptions;

impl ConfigSchema for NoOptions {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Connector handing out the same fake wallet on every handshake.
pub struct FakeConnector {
	wallet: Arc<FakeWallet>,
}

#[async_trait]
impl WalletConnector for FakeConnector {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoOptions)
	}

	async fn connect(&self) -> Result<Arc<dyn WalletProvider>, ProviderError> {
		Ok(self.wallet.clone() as Arc<dyn WalletProvider>)
	}
}

pub struct Harness {
	pub manager: Arc<SessionManager>,
	pub wallet: Arc<FakeWallet>,
	pub cache: Arc<MemoryProviderCache>,
}

pub fn harness(wallet: Arc<FakeWallet>) -> Harness {
	let connector: Arc<dyn WalletConnector> = Arc::new(FakeConnector {
		wallet: wallet.clone(),
	});
	let catalog = ProviderCatalog::from_connectors(vec![(
		ProviderChoice::new("walletconnect", "WalletConnect"),
		connector,
	)])
	.unwrap();
	let cache = Arc::new(MemoryProviderCache::new());
	let settings = SessionSettings {
		handshake_timeout: Duration::from_secs(120),
		token: TokenBinding {
			address: USDC,
			home_chain_id: 1,
		},
	};
	let manager = SessionManager::new(
		catalog,
		Arc::new(FixedSelector::new("walletconnect")),
		Some(cache.clone() as Arc<dyn ProviderCache>),
		settings,
	);
	Harness {
		manager: Arc::new(manager),
		wallet,
		cache,
	}
}
