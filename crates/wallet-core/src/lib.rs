//! Wallet session core.
//!
//! Wires a catalog of wallet backends to a single [`SessionManager`] that
//! owns the connected provider, keeps [`ViewState`] in sync with provider
//! events and resolves the account's native and token balances.
//!
//! ```text
//! ProviderCatalog -> SessionManager -> ChainClient -> BalanceResolver
//!                          |
//!                          v
//!                      ViewState (watch channel read by presentation code)
//! ```

pub mod cache;
pub mod catalog;
pub mod chain;
pub mod resolver;
pub mod selector;
pub mod session;
pub mod view;

pub use cache::{CacheError, FileProviderCache, MemoryProviderCache, ProviderCache};
pub use catalog::{ProviderCatalog, ProviderOption};
pub use chain::ChainClient;
pub use resolver::{BalanceResolver, TokenBinding};
pub use selector::{FixedSelector, ProviderSelector};
pub use session::{SessionManager, SessionSettings};
pub use view::ViewState;
