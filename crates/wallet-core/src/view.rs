//! Observable state read by presentation code.
//!
//! Only the session manager writes here. Observers get a
//! [`tokio::sync::watch`] receiver and always see a complete snapshot.

use tokio::sync::watch;
use wallet_types::{BalanceSnapshot, NetworkInfo, ViewSnapshot};

pub struct ViewState {
	sender: watch::Sender<ViewSnapshot>,
}

impl ViewState {
	pub fn new() -> Self {
		let (sender, _) = watch::channel(ViewSnapshot::cleared());
		Self { sender }
	}

	/// Current snapshot.
	pub fn snapshot(&self) -> ViewSnapshot {
		self.sender.borrow().clone()
	}

	/// Receiver notified on every change.
	pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
		self.sender.subscribe()
	}

	/// Publishes a fresh session: address set, active, no network yet and
	/// default balances.
	pub(crate) fn publish_connected(&self, address: String, provider: &str) {
		self.sender.send_replace(ViewSnapshot {
			address,
			is_active: true,
			network: NetworkInfo::empty(),
			balances: BalanceSnapshot::default(),
			provider: Some(provider.to_string()),
		});
	}

	/// Replaces the primary account and resets balances to their defaults
	/// until they are read for the new account. Ignored while no session is
	/// active. Returns true if the address changed.
	pub(crate) fn set_address(&self, address: String) -> bool {
		self.sender.send_if_modified(|view| {
			if !view.is_active || view.address == address {
				return false;
			}
			view.address = address;
			view.balances = BalanceSnapshot::default();
			true
		})
	}

	/// Replaces the network and resets balances to their defaults, so
	/// balances from another chain are never shown next to it.
	pub(crate) fn set_network(&self, network: NetworkInfo) {
		self.sender.send_if_modified(|view| {
			if !view.is_active {
				return false;
			}
			view.network = network;
			view.balances = BalanceSnapshot::default();
			true
		});
	}

	pub(crate) fn publish_balances(&self, balances: BalanceSnapshot) {
		self.sender.send_if_modified(|view| {
			if !view.is_active {
				return false;
			}
			view.balances = balances;
			true
		});
	}

	/// Resets everything to the disconnected state.
	pub(crate) fn clear(&self) {
		self.sender.send_if_modified(|view| {
			if *view == ViewSnapshot::cleared() {
				return false;
			}
			*view = ViewSnapshot::cleared();
			true
		});
	}
}

impl Default for ViewState {
	fn default() -> Self {
		Self::new()
	}
}
