//! Error types for the wallet session core.
//!
//! Connection errors terminate a connect attempt and never touch the active
//! session. Read errors (`RpcError`, `InvalidAddress`, `BalanceFetchFailed`)
//! only abort the balance snapshot being computed.

use thiserror::Error;

/// Convenience Result type alias using the local error type.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Errors produced by the session lifecycle and balance resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
	/// The user dismissed provider selection or rejected the handshake.
	#[error("Connection aborted: {0}")]
	ConnectionAborted(String),
	/// Transport or provider-internal failure while connecting.
	#[error("Connection failed: {0}")]
	ConnectionFailed(String),
	/// The handshake did not finish within the configured bound.
	#[error("Connection timed out after {0} seconds")]
	ConnectionTimedOut(u64),
	/// Another connect attempt is still running.
	#[error("A connection attempt is already in progress")]
	ConnectionInProgress,
	/// The node or provider could not serve a read.
	#[error("RPC error: {0}")]
	RpcError(String),
	/// An account identifier could not be parsed.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// The balance snapshot could not be assembled.
	#[error("Balance fetch failed: {0}")]
	BalanceFetchFailed(String),
	/// An operation that needs an active session ran without one.
	#[error("No active session")]
	NotConnected,
	/// Invalid or incomplete configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl WalletError {
	/// Returns true for errors that end a connect attempt.
	pub fn is_connection_error(&self) -> bool {
		matches!(
			self,
			WalletError::ConnectionAborted(_)
				| WalletError::ConnectionFailed(_)
				| WalletError::ConnectionTimedOut(_)
				| WalletError::ConnectionInProgress
		)
	}

	/// Returns true for errors a user can recover from by refreshing balances.
	pub fn is_recoverable(&self) -> bool {
		matches!(
			self,
			WalletError::RpcError(_)
				| WalletError::InvalidAddress(_)
				| WalletError::BalanceFetchFailed(_)
		)
	}
}
