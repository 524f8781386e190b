//! Session lifecycle against a scripted wallet.

mod common;

use common::{account, harness, CallCounts, FakeWalletBuilder};
use std::time::Duration;
use wallet_core::ProviderCache;
use wallet_types::{BalanceSnapshot, ProviderEvent, SessionStatus, ViewSnapshot, WalletError};

/// Waits until the published view satisfies `predicate`.
async fn wait_for_view<F>(
	receiver: &mut tokio::sync::watch::Receiver<ViewSnapshot>,
	predicate: F,
) -> ViewSnapshot
where
	F: FnMut(&ViewSnapshot) -> bool,
{
	tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(predicate))
		.await
		.expect("view did not reach the expected state")
		.expect("view channel closed")
		.clone()
}

/// Polls `condition` until it holds; event handling runs on its own task.
async fn eventually(mut condition: impl FnMut() -> bool) {
	tokio::time::timeout(Duration::from_secs(5), async {
		while !condition() {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("condition not reached");
}

#[tokio::test]
async fn connect_publishes_first_account() {
	let h = harness(FakeWalletBuilder::new().build());

	let view = h.manager.connect().await.unwrap();
	let accounts = wallet_core::ChainClient::new(h.wallet.clone()).list_accounts().await.unwrap();

	assert!(!view.address.is_empty());
	assert_eq!(view.address, accounts[0]);
	assert!(view.is_active);
	assert_eq!(view.provider.as_deref(), Some("walletconnect"));
	assert_eq!(view.balances, BalanceSnapshot::new("1000", "250"));
	assert_eq!(h.cache.get().await.unwrap().as_deref(), Some("walletconnect"));
}

#[tokio::test]
async fn subscribes_before_enable() {
	let h = harness(FakeWalletBuilder::new().build());
	assert_eq!(h.wallet.listeners(), 0);

	h.manager.connect().await.unwrap();
	assert_eq!(CallCounts::get(&h.wallet.calls.enable), 1);
	assert_eq!(h.wallet.listeners(), 1);
}

#[tokio::test]
async fn off_home_chain_token_is_default_without_calls() {
	let h = harness(FakeWalletBuilder::new().chain_id(137).balances(9, 500).build());

	let view = h.manager.connect().await.unwrap();
	assert_eq!(view.network.chain_id(), "137");
	assert_eq!(view.balances.token, "0");
	assert_eq!(view.balances.native, "9");
	assert_eq!(CallCounts::get(&h.wallet.calls.token), 0);
}

#[tokio::test]
async fn home_chain_token_matches_balance_of() {
	let h = harness(FakeWalletBuilder::new().balances(9, 123_456_789).build());

	let view = h.manager.connect().await.unwrap();
	assert_eq!(view.balances.token, "123456789");
	assert_eq!(CallCounts::get(&h.wallet.calls.token), 1);
}

#[tokio::test(start_paused = true)]
async fn balances_publish_only_after_both_reads() {
	let h = harness(
		FakeWalletBuilder::new()
			.native_delay(Duration::from_secs(2))
			.token_delay(Duration::from_millis(100))
			.build(),
	);

	let manager = h.manager.clone();
	let connect = tokio::spawn(async move { manager.connect().await });

	tokio::time::sleep(Duration::from_millis(500)).await;
	assert_eq!(CallCounts::get(&h.wallet.calls.token), 1);
	assert_eq!(CallCounts::get(&h.wallet.calls.native), 0);
	let view = h.manager.view();
	assert!(view.is_active);
	assert_eq!(view.balances, BalanceSnapshot::default());

	let view = connect.await.unwrap().unwrap();
	assert_eq!(view.balances, BalanceSnapshot::new("1000", "250"));
}

#[tokio::test]
async fn account_change_keeps_session_active() {
	let h = harness(FakeWalletBuilder::new().build());
	h.manager.connect().await.unwrap();
	let mut receiver = h.manager.subscribe();

	h.wallet
		.emit(ProviderEvent::AccountsChanged(vec![account(0xcc)]));

	let expected = account(0xcc).to_string();
	let view = wait_for_view(&mut receiver, |view| view.address == expected).await;
	assert!(view.is_active);
	assert_eq!(h.manager.status().await, SessionStatus::Connected);
}

#[tokio::test]
async fn account_change_rereads_balances_for_new_account() {
	let h = harness(
		FakeWalletBuilder::new()
			.balances(77, 250)
			.native_for(account(0xcc), 5)
			.build(),
	);
	let view = h.manager.connect().await.unwrap();
	assert_eq!(view.balances, BalanceSnapshot::new("77", "250"));
	let mut receiver = h.manager.subscribe();

	h.wallet
		.emit(ProviderEvent::AccountsChanged(vec![account(0xcc)]));

	let expected = account(0xcc).to_string();
	let view = wait_for_view(&mut receiver, |view| {
		view.address == expected && view.balances.native == "5"
	})
	.await;
	assert_eq!(view.balances, BalanceSnapshot::new("5", "250"));
	assert_eq!(CallCounts::get(&h.wallet.calls.native), 2);
	assert_eq!(CallCounts::get(&h.wallet.calls.token), 2);
}

#[tokio::test]
async fn empty_account_list_ends_session() {
	let h = harness(FakeWalletBuilder::new().build());
	h.manager.connect().await.unwrap();
	let mut receiver = h.manager.subscribe();

	h.wallet.emit(ProviderEvent::AccountsChanged(vec![]));

	let view = wait_for_view(&mut receiver, |view| !view.is_active).await;
	assert_eq!(view.address, "");
}

#[tokio::test]
async fn provider_close_resets_view() {
	let h = harness(FakeWalletBuilder::new().build());
	h.manager.connect().await.unwrap();
	let mut receiver = h.manager.subscribe();

	h.wallet.emit(ProviderEvent::Close);

	let view = wait_for_view(&mut receiver, |view| !view.is_active).await;
	assert_eq!(view, ViewSnapshot::cleared());
	assert_eq!(view.address, "");
	assert_eq!(h.manager.status().await, SessionStatus::Disconnected);
	eventually(|| CallCounts::get(&h.wallet.calls.close) == 1).await;
	assert_eq!(h.cache.get().await.unwrap(), None);

	// Disconnect after a provider close is a no-op.
	h.manager.disconnect().await;
	assert_eq!(CallCounts::get(&h.wallet.calls.close), 1);
}

#[tokio::test]
async fn chain_change_recomputes_network_and_balances() {
	let h = harness(FakeWalletBuilder::new().balances(77, 250).build());
	let view = h.manager.connect().await.unwrap();
	assert_eq!(view.balances, BalanceSnapshot::new("77", "250"));
	let mut receiver = h.manager.subscribe();

	h.wallet.emit(ProviderEvent::ChainChanged(10));

	let view = wait_for_view(&mut receiver, |view| {
		view.network.chain_id() == "10" && view.balances.native == "77"
	})
	.await;
	assert_eq!(view.network.network_id(), "10");
	assert_eq!(view.balances.token, "0");
	assert_eq!(CallCounts::get(&h.wallet.calls.token), 1);
}

#[tokio::test]
async fn disconnect_twice_is_a_noop() {
	let h = harness(FakeWalletBuilder::new().build());
	h.manager.connect().await.unwrap();

	h.manager.disconnect().await;
	let view = h.manager.view();
	assert_eq!(view.address, "");
	assert!(!view.is_active);

	h.manager.disconnect().await;
	assert_eq!(h.manager.view(), ViewSnapshot::cleared());
	assert_eq!(CallCounts::get(&h.wallet.calls.close), 1);
	assert_eq!(h.wallet.listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_connect_is_rejected() {
	let h = harness(
		FakeWalletBuilder::new()
			.enable_delay(Duration::from_secs(1))
			.build(),
	);

	let manager = h.manager.clone();
	let first = tokio::spawn(async move { manager.connect().await });
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(h.manager.status().await, SessionStatus::Connecting);

	let second = h.manager.connect().await;
	assert_eq!(second, Err(WalletError::ConnectionInProgress));

	let view = first.await.unwrap().unwrap();
	assert!(view.is_active);
	assert_eq!(CallCounts::get(&h.wallet.calls.enable), 1);
	assert_eq!(h.manager.status().await, SessionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_before_connect_returns_aborts_it() {
	let h = harness(
		FakeWalletBuilder::new()
			.native_delay(Duration::from_secs(2))
			.build(),
	);

	let manager = h.manager.clone();
	let connect = tokio::spawn(async move { manager.connect().await });
	tokio::time::sleep(Duration::from_millis(500)).await;
	assert!(h.manager.view().is_active);

	h.manager.disconnect().await;
	let result = connect.await.unwrap();

	assert!(matches!(result, Err(WalletError::ConnectionAborted(_))));
	assert_eq!(h.manager.view(), ViewSnapshot::cleared());
	assert_eq!(h.manager.status().await, SessionStatus::Disconnected);
	assert_eq!(h.cache.get().await.unwrap(), None);
	assert_eq!(CallCounts::get(&h.wallet.calls.close), 1);
}

#[tokio::test]
async fn reconnect_replaces_session() {
	let h = harness(FakeWalletBuilder::new().build());
	h.manager.connect().await.unwrap();
	let view = h.manager.connect().await.unwrap();

	assert!(view.is_active);
	assert_eq!(CallCounts::get(&h.wallet.calls.close), 1);
	assert_eq!(CallCounts::get(&h.wallet.calls.enable), 2);
	assert_eq!(h.wallet.listeners(), 1);
}

#[tokio::test]
async fn refresh_balances_publishes_new_values() {
	let h = harness(FakeWalletBuilder::new().build());
	h.manager.connect().await.unwrap();

	let balances = h.manager.refresh_balances().await.unwrap();
	assert_eq!(balances, BalanceSnapshot::new("1000", "250"));
	assert_eq!(h.manager.view().balances, balances);
	assert_eq!(CallCounts::get(&h.wallet.calls.native), 2);
}
