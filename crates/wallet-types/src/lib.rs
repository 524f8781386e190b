//! Common types module for the wallet session workspace.
//!
//! This module defines the core data types and structures shared by the
//! provider backends, the session core and the demo binary. It provides a
//! centralized location for the view model, provider events, the error
//! taxonomy and configuration validation.

/// Error taxonomy surfaced by the session core.
pub mod error;
/// Lifecycle events emitted by wallet providers.
pub mod events;
/// Catalog entries describing selectable wallet backends.
pub mod provider;
/// Registry trait for self-describing implementations.
pub mod registry;
/// Observable session state and its derived records.
pub mod session;
/// Address parsing and amount formatting helpers.
pub mod utils;
/// Configuration validation framework.
pub mod validation;

pub use error::{Result, WalletError};
pub use events::ProviderEvent;
pub use provider::ProviderChoice;
pub use registry::ImplementationRegistry;
pub use session::{BalanceSnapshot, NetworkInfo, SessionStatus, ViewSnapshot};
pub use utils::{
	format_token_amount, parse_address, short_address, without_0x_prefix, NATIVE_DECIMALS,
};
pub use validation::{non_empty_string, ConfigSchema, Field, FieldType, Schema, ValidationError};
