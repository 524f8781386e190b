//! Provider selection.
//!
//! The session manager hands the catalog's choices to a [`ProviderSelector`]
//! and waits for an answer. `None` means the user dismissed the selection.

use async_trait::async_trait;
use wallet_types::{ProviderChoice, WalletError};

#[async_trait]
pub trait ProviderSelector: Send + Sync {
	/// Returns the key of the chosen provider, or `None` when cancelled.
	async fn select(&self, choices: &[ProviderChoice]) -> Result<Option<String>, WalletError>;
}

/// Always picks the same provider. Picking a key the catalog does not offer
/// behaves like a cancelled selection.
#[derive(Debug, Clone)]
pub struct FixedSelector {
	key: String,
}

impl FixedSelector {
	pub fn new(key: impl Into<String>) -> Self {
		Self { key: key.into() }
	}
}

#[async_trait]
impl ProviderSelector for FixedSelector {
	async fn select(&self, choices: &[ProviderChoice]) -> Result<Option<String>, WalletError> {
		let offered = choices.iter().any(|choice| choice.key == self.key);
		if !offered {
			tracing::warn!(key = %self.key, "Requested provider is not in the catalog");
		}
		Ok(offered.then(|| self.key.clone()))
	}
}
