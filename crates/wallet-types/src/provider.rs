//! Selectable wallet backends as presented to the user.

use serde::{Deserialize, Serialize};

/// One entry of the provider catalog, stripped of its constructor so it can
/// be shown in a selection prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderChoice {
	/// Catalog key, e.g. `walletconnect`.
	pub key: String,
	/// Human readable label.
	pub label: String,
}

impl ProviderChoice {
	pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			label: label.into(),
		}
	}
}

impl std::fmt::Display for ProviderChoice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({})", self.label, self.key)
	}
}
