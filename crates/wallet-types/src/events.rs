//! Provider lifecycle events.

use alloy_primitives::Address;

/// Events a connected wallet provider can emit on its own initiative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
	/// The wallet ended the session (user disconnected in the wallet UI,
	/// bridge dropped, transport gone).
	Close,
	/// The set of exposed accounts changed. The first entry is the new
	/// primary account; an empty list means the wallet locked.
	AccountsChanged(Vec<Address>),
	/// The wallet switched to another chain.
	ChainChanged(u64),
}

impl ProviderEvent {
	/// Short name used in log lines.
	pub fn name(&self) -> &'static str {
		match self {
			ProviderEvent::Close => "close",
			ProviderEvent::AccountsChanged(_) => "accountsChanged",
			ProviderEvent::ChainChanged(_) => "chainChanged",
		}
	}
}
