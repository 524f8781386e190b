//! Session lifecycle.
//!
//! [`SessionManager`] owns the single active provider handle. It runs the
//! connect handshake, forwards provider lifecycle events into [`ViewState`]
//! and tears the session down on disconnect or when the wallet closes it.
//!
//! State machine: `Disconnected -> Connecting -> Connected -> Disconnected`.
//! Only one connect attempt runs at a time; a concurrent attempt fails with
//! [`WalletError::ConnectionInProgress`] and leaves the first untouched.
//!
//! Every session carries a generation number. Work started for one session
//! (event handling, balance resolution) publishes only if its generation is
//! still the active one, so a late result never leaks into a newer session or
//! into the cleared state.

use crate::cache::{FileProviderCache, MemoryProviderCache, ProviderCache};
use crate::catalog::ProviderCatalog;
use crate::chain::ChainClient;
use crate::resolver::{BalanceResolver, TokenBinding};
use crate::selector::ProviderSelector;
use crate::view::ViewState;
use alloy_primitives::Address;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use wallet_config::Config;
use wallet_provider::{EventSubscription, ProviderError, WalletProvider};
use wallet_types::{BalanceSnapshot, ProviderEvent, SessionStatus, ViewSnapshot, WalletError};

/// Tuning of the connect lifecycle.
#[derive(Debug, Clone)]
pub struct SessionSettings {
	/// Upper bound on handshake plus account authorization.
	pub handshake_timeout: Duration,
	pub token: TokenBinding,
}

impl From<&Config> for SessionSettings {
	fn from(config: &Config) -> Self {
		Self {
			handshake_timeout: config.handshake_timeout(),
			token: TokenBinding::from(&config.token),
		}
	}
}

/// Maps a failure during the handshake to the connection error kinds.
fn handshake_error(err: ProviderError) -> WalletError {
	match err {
		ProviderError::Rejected(reason) => WalletError::ConnectionAborted(reason),
		other => WalletError::ConnectionFailed(other.to_string()),
	}
}

async fn close_quietly(provider: &Arc<dyn WalletProvider>, key: &str) {
	if let Err(e) = provider.close().await {
		tracing::warn!(provider = %key, error = %e, "Failed to close wallet provider");
	}
}

struct ActiveSession {
	key: String,
	provider: Arc<dyn WalletProvider>,
	address: String,
	/// Chain the published network and balances belong to.
	chain_id: Option<u64>,
	generation: u64,
	events: Option<JoinHandle<()>>,
}

/// Marks a connect attempt as running for as long as it is alive.
struct ConnectAttempt<'a> {
	flag: &'a AtomicBool,
}

impl<'a> ConnectAttempt<'a> {
	fn begin(flag: &'a AtomicBool) -> Result<Self, WalletError> {
		flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.map_err(|_| WalletError::ConnectionInProgress)?;
		Ok(Self { flag })
	}
}

impl Drop for ConnectAttempt<'_> {
	fn drop(&mut self) {
		self.flag.store(false, Ordering::Release);
	}
}

struct Inner {
	catalog: ProviderCatalog,
	selector: Arc<dyn ProviderSelector>,
	cache: Option<Arc<dyn ProviderCache>>,
	settings: SessionSettings,
	view: ViewState,
	connecting: AtomicBool,
	generations: AtomicU64,
	session: Mutex<Option<ActiveSession>>,
}

/// Owner of the wallet session. Share it behind an `Arc`.
pub struct SessionManager {
	inner: Arc<Inner>,
}

impl SessionManager {
	pub fn new(
		catalog: ProviderCatalog,
		selector: Arc<dyn ProviderSelector>,
		cache: Option<Arc<dyn ProviderCache>>,
		settings: SessionSettings,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				catalog,
				selector,
				cache,
				settings,
				view: ViewState::new(),
				connecting: AtomicBool::new(false),
				generations: AtomicU64::new(0),
				session: Mutex::new(None),
			}),
		}
	}

	/// Builds the catalog, cache and settings described by `config`.
	pub fn from_config(
		config: &Config,
		selector: Arc<dyn ProviderSelector>,
	) -> Result<Self, WalletError> {
		let catalog = ProviderCatalog::from_config(config)?;
		let cache: Option<Arc<dyn ProviderCache>> = if !config.app.cache_provider {
			None
		} else if let Some(path) = &config.session.cache_path {
			Some(Arc::new(FileProviderCache::new(path)))
		} else {
			Some(Arc::new(MemoryProviderCache::new()))
		};
		Ok(Self::new(catalog, selector, cache, SessionSettings::from(config)))
	}

	pub fn catalog(&self) -> &ProviderCatalog {
		&self.inner.catalog
	}

	/// Current view.
	pub fn view(&self) -> ViewSnapshot {
		self.inner.view.snapshot()
	}

	/// Receiver notified on every view change.
	pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
		self.inner.view.subscribe()
	}

	pub async fn status(&self) -> SessionStatus {
		if self.inner.session.lock().await.is_some() {
			SessionStatus::Connected
		} else if self.inner.connecting.load(Ordering::Acquire) {
			SessionStatus::Connecting
		} else {
			SessionStatus::Disconnected
		}
	}

	/// Provider key remembered from the last successful connect.
	pub async fn cached_provider(&self) -> Option<String> {
		let cache = self.inner.cache.as_ref()?;
		match cache.get().await {
			Ok(key) => key,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to read provider cache");
				None
			},
		}
	}

	/// Lets the user pick a provider, performs the handshake and publishes
	/// the new session.
	///
	/// An already active session is torn down first. Connection errors leave
	/// no session behind. Failing to read the network or balances after the
	/// handshake does not fail the connect: the address stays published and
	/// [`refresh_balances`](Self::refresh_balances) can be retried. A
	/// session ended before this returns yields `ConnectionAborted`.
	pub async fn connect(&self) -> Result<ViewSnapshot, WalletError> {
		let _attempt = ConnectAttempt::begin(&self.inner.connecting)?;
		let inner = &self.inner;

		if inner.teardown(None, true).await {
			tracing::info!("Replaced active wallet session");
		}
		inner.clear_cache().await;

		let key = inner
			.selector
			.select(&inner.catalog.choices())
			.await?
			.ok_or_else(|| WalletError::ConnectionAborted("provider selection cancelled".into()))?;
		let connector = inner
			.catalog
			.connector(&key)
			.ok_or_else(|| WalletError::ConnectionFailed(format!("Unknown provider '{}'", key)))?;
		tracing::info!(provider = %key, "Connecting wallet");

		let handshake = async {
			let provider = connector.connect().await.map_err(handshake_error)?;
			// Subscribe first so no event emitted during enable() is missed.
			let subscription = provider.subscribe();
			match provider.enable().await {
				Ok(accounts) => Ok::<_, WalletError>((provider, subscription, accounts)),
				Err(e) => {
					close_quietly(&provider, &key).await;
					Err(handshake_error(e))
				},
			}
		};
		let bound = inner.settings.handshake_timeout;
		let (provider, subscription, accounts) = tokio::time::timeout(bound, handshake)
			.await
			.map_err(|_| {
				tracing::warn!(provider = %key, timeout_secs = bound.as_secs(), "Wallet handshake timed out");
				WalletError::ConnectionTimedOut(bound.as_secs())
			})??;

		let Some(primary) = accounts.first() else {
			close_quietly(&provider, &key).await;
			return Err(WalletError::ConnectionFailed("wallet exposed no accounts".into()));
		};
		let address = primary.to_string();
		let generation = inner.generations.fetch_add(1, Ordering::AcqRel) + 1;

		{
			let mut session = inner.session.lock().await;
			*session = Some(ActiveSession {
				key: key.clone(),
				provider: provider.clone(),
				address: address.clone(),
				chain_id: None,
				generation,
				events: None,
			});
			inner.view.publish_connected(address.clone(), &key);
		}
		tracing::info!(provider = %key, %address, "Wallet connected");

		if let Err(e) = inner
			.sync_chain_state(generation, ChainClient::new(provider), address)
			.await
		{
			tracing::warn!(error = %e, "Could not load network state after connect");
		}

		// Events queued since subscribing are handled from here on, in order.
		let events = tokio::spawn(run_event_pump(
			Arc::downgrade(inner),
			generation,
			subscription,
		));
		// Teardown clears the cache only after taking the session, so the
		// write happens under the session lock.
		let mut session = inner.session.lock().await;
		let Some(active) = session.as_mut().filter(|active| active.generation == generation) else {
			events.abort();
			tracing::info!(provider = %key, "Session ended before connect completed");
			return Err(WalletError::ConnectionAborted(
				"session ended while connecting".into(),
			));
		};
		active.events = Some(events);
		if let Some(cache) = &inner.cache {
			if let Err(e) = cache.set(&key).await {
				tracing::warn!(error = %e, "Failed to remember provider selection");
			}
		}
		Ok(inner.view.snapshot())
	}

	/// Ends the session. Safe to call at any time; without an active session
	/// it does nothing. Close failures are logged and otherwise ignored.
	pub async fn disconnect(&self) {
		if !self.inner.teardown(None, true).await {
			tracing::debug!("Disconnect requested without an active session");
		}
	}

	/// Re-reads the balances of the active account and publishes them.
	///
	/// On failure the published address and network are left as they are.
	pub async fn refresh_balances(&self) -> Result<BalanceSnapshot, WalletError> {
		let (generation, provider, address, chain_id) = {
			let session = self.inner.session.lock().await;
			let active = session.as_ref().ok_or(WalletError::NotConnected)?;
			(
				active.generation,
				active.provider.clone(),
				active.address.clone(),
				active.chain_id,
			)
		};
		let client = ChainClient::new(provider);

		match chain_id {
			Some(chain_id) => {
				self.inner
					.resolve_and_publish(generation, client, chain_id, address)
					.await
			},
			None => self
				.inner
				.sync_chain_state(generation, client, address)
				.await?
				.ok_or(WalletError::NotConnected),
		}
	}
}

impl Inner {
	async fn clear_cache(&self) {
		if let Some(cache) = &self.cache {
			if let Err(e) = cache.clear().await {
				tracing::warn!(error = %e, "Failed to clear provider cache");
			}
		}
	}

	/// Removes the session matching `generation` (any session when `None`),
	/// clears the view and closes the transport. Returns false when there was
	/// nothing to tear down.
	async fn teardown(&self, generation: Option<u64>, stop_events: bool) -> bool {
		let mut session = {
			let mut guard = self.session.lock().await;
			let matches = guard
				.as_ref()
				.is_some_and(|active| generation.map_or(true, |g| g == active.generation));
			let Some(session) = guard.take_if(|_| matches) else {
				return false;
			};
			self.view.clear();
			session
		};

		if stop_events {
			if let Some(events) = session.events.take() {
				events.abort();
				// Wait for the task so its subscription is released on return.
				let _ = events.await;
			}
		}
		self.clear_cache().await;
		close_quietly(&session.provider, &session.key).await;
		tracing::info!(provider = %session.key, "Wallet session closed");
		true
	}

	/// Reads the network, publishes it and resolves balances for it.
	///
	/// Returns `None` if the session went away in the meantime or the
	/// provider reported no network.
	async fn sync_chain_state(
		&self,
		generation: u64,
		client: ChainClient,
		address: String,
	) -> Result<Option<BalanceSnapshot>, WalletError> {
		let network = client.network_info().await?;
		let chain_id = network.chain_id_u64();
		{
			let mut guard = self.session.lock().await;
			let Some(active) = guard.as_mut().filter(|active| active.generation == generation) else {
				return Ok(None);
			};
			active.chain_id = chain_id;
			tracing::info!(
				chain_id = network.chain_id(),
				network_id = network.network_id(),
				"Network updated"
			);
			self.view.set_network(network);
		}

		let Some(chain_id) = chain_id else {
			return Ok(None);
		};
		self.resolve_and_publish(generation, client, chain_id, address)
			.await
			.map(Some)
	}

	async fn resolve_and_publish(
		&self,
		generation: u64,
		client: ChainClient,
		chain_id: u64,
		address: String,
	) -> Result<BalanceSnapshot, WalletError> {
		let balances = BalanceResolver::new(client, self.settings.token.clone())
			.resolve(chain_id, &address)
			.await?;

		let guard = self.session.lock().await;
		match guard.as_ref() {
			Some(active)
				if active.generation == generation
					&& active.chain_id == Some(chain_id)
					&& active.address == address =>
			{
				self.view.publish_balances(balances.clone());
			},
			_ => tracing::debug!(chain_id, "Discarding balances of a superseded session state"),
		}
		Ok(balances)
	}

	/// Returns false once the session has ended.
	async fn on_accounts_changed(&self, generation: u64, accounts: Vec<Address>) -> bool {
		let Some(primary) = accounts.first() else {
			tracing::info!("Wallet exposed no accounts, ending session");
			self.teardown(Some(generation), false).await;
			return false;
		};
		let address = primary.to_string();

		let reread = {
			let mut guard = self.session.lock().await;
			let Some(active) = guard.as_mut().filter(|active| active.generation == generation) else {
				return true;
			};
			if active.address == address {
				return true;
			}
			tracing::info!(%address, "Primary account changed");
			active.address = address.clone();
			self.view.set_address(address.clone());
			active.chain_id.map(|chain_id| (active.provider.clone(), chain_id))
		};

		// Balances were reset with the address; read them for the new account.
		if let Some((provider, chain_id)) = reread {
			if let Err(e) = self
				.resolve_and_publish(generation, ChainClient::new(provider), chain_id, address)
				.await
			{
				tracing::warn!(error = %e, "Failed to read balances of the new account");
			}
		}
		true
	}

	async fn on_chain_changed(&self, generation: u64, chain_id: u64) {
		let current = {
			let guard = self.session.lock().await;
			guard
				.as_ref()
				.filter(|active| active.generation == generation)
				.map(|active| (active.provider.clone(), active.address.clone()))
		};
		let Some((provider, address)) = current else {
			return;
		};

		tracing::info!(chain_id, "Wallet switched chain");
		if let Err(e) = self
			.sync_chain_state(generation, ChainClient::new(provider), address)
			.await
		{
			tracing::warn!(chain_id, error = %e, "Failed to refresh state after chain change");
		}
	}
}

async fn run_event_pump(inner: Weak<Inner>, generation: u64, mut subscription: EventSubscription) {
	while let Some(event) = subscription.recv().await {
		let Some(inner) = inner.upgrade() else {
			break;
		};
		tracing::debug!(event = event.name(), generation, "Handling provider event");

		let keep_running = match event {
			ProviderEvent::Close => {
				tracing::info!("Wallet closed the connection");
				inner.teardown(Some(generation), false).await;
				false
			},
			ProviderEvent::AccountsChanged(accounts) => {
				inner.on_accounts_changed(generation, accounts).await
			},
			ProviderEvent::ChainChanged(chain_id) => {
				inner.on_chain_changed(generation, chain_id).await;
				true
			},
		};
		if !keep_running {
			break;
		}
	}
	subscription.unsubscribe();
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::selector::FixedSelector;
	use alloy_primitives::{address, Bytes, U256};
	use async_trait::async_trait;
	use wallet_provider::{MockWalletConnector, MockWalletProvider, ProviderEvents};
	use wallet_types::ProviderChoice;

	const ACCOUNT: Address = address!("742d35Cc6634C0532925a3b844Bc9e7595f0bEb0");

	struct CancelSelector;

	#[async_trait]
	impl ProviderSelector for CancelSelector {
		async fn select(&self, _: &[ProviderChoice]) -> Result<Option<String>, WalletError> {
			Ok(None)
		}
	}

	fn settings() -> SessionSettings {
		SessionSettings {
			handshake_timeout: Duration::from_secs(120),
			token: TokenBinding {
				address: address!("0882477e7895bdC5cea7cB1552ed914aB157Fe56"),
				home_chain_id: 1,
			},
		}
	}

	/// Provider on `chain_id` holding 3 wei and 4 token units.
	fn provider_on_chain(chain_id: u64, events: &ProviderEvents) -> MockWalletProvider {
		let mut mock = MockWalletProvider::new();
		let hub = events.clone();
		mock.expect_subscribe().returning(move || hub.subscribe());
		mock.expect_enable()
			.returning(|| Box::pin(async { Ok(vec![ACCOUNT]) }));
		mock.expect_chain_id()
			.returning(move || Box::pin(async move { Ok(chain_id) }));
		mock.expect_network_version()
			.returning(move || Box::pin(async move { Ok(chain_id.to_string()) }));
		mock.expect_get_balance()
			.returning(|_| Box::pin(async { Ok(U256::from(3u64)) }));
		mock
	}

	fn expect_token(mock: &mut MockWalletProvider, times: usize) {
		mock.expect_call().times(times).returning(|_, _| {
			Box::pin(async { Ok(Bytes::from(U256::from(4u64).to_be_bytes::<32>().to_vec())) })
		});
	}

	fn manager_for(provider: MockWalletProvider) -> SessionManager {
		let provider: Arc<dyn WalletProvider> = Arc::new(provider);
		let mut connector = MockWalletConnector::new();
		connector.expect_connect().returning(move || {
			let provider = provider.clone();
			Box::pin(async move { Ok(provider) })
		});
		manager_with_connector(connector, Arc::new(FixedSelector::new("walletconnect")))
	}

	fn manager_with_connector(
		connector: MockWalletConnector,
		selector: Arc<dyn ProviderSelector>,
	) -> SessionManager {
		let connector: Arc<dyn wallet_provider::WalletConnector> = Arc::new(connector);
		let catalog = ProviderCatalog::from_connectors(vec![(
			ProviderChoice::new("walletconnect", "WalletConnect"),
			connector,
		)])
		.unwrap();
		SessionManager::new(
			catalog,
			selector,
			Some(Arc::new(MemoryProviderCache::new())),
			settings(),
		)
	}

	#[tokio::test]
	async fn test_connect_publishes_account_network_and_balances() {
		let events = ProviderEvents::default();
		let mut provider = provider_on_chain(1, &events);
		expect_token(&mut provider, 1);
		let manager = manager_for(provider);

		let view = manager.connect().await.unwrap();
		assert_eq!(view.address, ACCOUNT.to_string());
		assert!(view.is_active);
		assert_eq!(view.network.chain_id(), "1");
		assert_eq!(view.network.network_id(), "1");
		assert_eq!(view.balances, BalanceSnapshot::new("3", "4"));
		assert_eq!(manager.status().await, SessionStatus::Connected);
		assert_eq!(manager.cached_provider().await.as_deref(), Some("walletconnect"));
	}

	#[tokio::test]
	async fn test_off_home_chain_never_calls_token() {
		let events = ProviderEvents::default();
		let mut provider = provider_on_chain(5, &events);
		expect_token(&mut provider, 0);
		let manager = manager_for(provider);

		let view = manager.connect().await.unwrap();
		assert_eq!(view.balances, BalanceSnapshot::new("3", "0"));
	}

	#[tokio::test]
	async fn test_cancelled_selection_aborts() {
		let connector = MockWalletConnector::new();
		let manager = manager_with_connector(connector, Arc::new(CancelSelector));

		let result = manager.connect().await;
		assert!(matches!(result, Err(WalletError::ConnectionAborted(_))));
		assert_eq!(manager.view(), ViewSnapshot::cleared());
		assert_eq!(manager.status().await, SessionStatus::Disconnected);
	}

	#[tokio::test]
	async fn test_rejected_enable_aborts_and_closes() {
		let mut provider = MockWalletProvider::new();
		let events = ProviderEvents::default();
		provider
			.expect_subscribe()
			.returning(move || events.subscribe());
		provider.expect_enable().returning(|| {
			Box::pin(async { Err(ProviderError::Rejected("User denied account authorization".into())) })
		});
		provider
			.expect_close()
			.times(1)
			.returning(|| Box::pin(async { Ok(()) }));
		let manager = manager_for(provider);

		let result = manager.connect().await;
		assert!(matches!(result, Err(WalletError::ConnectionAborted(_))));
		assert!(!manager.view().is_connected());
	}

	#[tokio::test]
	async fn test_transport_failure_during_handshake() {
		let mut connector = MockWalletConnector::new();
		connector.expect_connect().returning(|| {
			Box::pin(async { Err(ProviderError::Transport("connection refused".into())) })
		});
		let manager = manager_with_connector(connector, Arc::new(FixedSelector::new("walletconnect")));

		let result = manager.connect().await;
		assert!(matches!(result, Err(WalletError::ConnectionFailed(_))));
		assert_eq!(manager.status().await, SessionStatus::Disconnected);
	}

	#[tokio::test(start_paused = true)]
	async fn test_handshake_is_bounded() {
		let mut connector = MockWalletConnector::new();
		connector.expect_connect().returning(|| {
			Box::pin(async {
				tokio::time::sleep(Duration::from_secs(600)).await;
				Err(ProviderError::Transport("unreachable".into()))
			})
		});
		let manager = manager_with_connector(connector, Arc::new(FixedSelector::new("walletconnect")));

		let result = manager.connect().await;
		assert_eq!(result, Err(WalletError::ConnectionTimedOut(120)));
		assert_eq!(manager.status().await, SessionStatus::Disconnected);
	}

	#[tokio::test]
	async fn test_balance_failure_keeps_session() {
		let events = ProviderEvents::default();
		let mut provider = MockWalletProvider::new();
		let hub = events.clone();
		provider.expect_subscribe().returning(move || hub.subscribe());
		provider
			.expect_enable()
			.returning(|| Box::pin(async { Ok(vec![ACCOUNT]) }));
		provider
			.expect_chain_id()
			.returning(|| Box::pin(async { Ok(1) }));
		provider
			.expect_network_version()
			.returning(|| Box::pin(async { Ok("1".to_string()) }));
		provider
			.expect_get_balance()
			.returning(|_| Box::pin(async { Ok(U256::from(3u64)) }));
		provider.expect_call().returning(|_, _| {
			Box::pin(async { Err(ProviderError::Transport("execution reverted".into())) })
		});
		let manager = manager_for(provider);

		let view = manager.connect().await.unwrap();
		assert_eq!(view.address, ACCOUNT.to_string());
		assert_eq!(view.network.chain_id(), "1");
		assert_eq!(view.balances, BalanceSnapshot::default());

		let refreshed = manager.refresh_balances().await;
		assert!(matches!(refreshed, Err(WalletError::BalanceFetchFailed(_))));
		assert_eq!(manager.view().address, ACCOUNT.to_string());
	}

	#[tokio::test]
	async fn test_disconnect_is_idempotent_and_ignores_close_failure() {
		let events = ProviderEvents::default();
		let mut provider = provider_on_chain(5, &events);
		provider
			.expect_close()
			.times(1)
			.returning(|| Box::pin(async { Err(ProviderError::Transport("socket gone".into())) }));
		let manager = manager_for(provider);

		manager.connect().await.unwrap();
		manager.disconnect().await;
		let view = manager.view();
		assert_eq!(view.address, "");
		assert!(!view.is_active);
		assert_eq!(manager.cached_provider().await, None);

		manager.disconnect().await;
		assert_eq!(manager.view(), ViewSnapshot::cleared());
		assert_eq!(manager.status().await, SessionStatus::Disconnected);
	}

	#[tokio::test]
	async fn test_refresh_requires_session() {
		let manager = manager_with_connector(
			MockWalletConnector::new(),
			Arc::new(FixedSelector::new("walletconnect")),
		);
		assert_eq!(manager.refresh_balances().await, Err(WalletError::NotConnected));
	}

	#[test]
	fn test_handshake_error_mapping() {
		assert!(matches!(
			handshake_error(ProviderError::Rejected("no".into())),
			WalletError::ConnectionAborted(_)
		));
		assert!(matches!(
			handshake_error(ProviderError::Closed),
			WalletError::ConnectionFailed(_)
		));
	}
}
