//! Conversions from user supplied strings to chain types.

use crate::WalletError;
use alloy_primitives::Address;

/// Parses an account identifier, accepting input with or without `0x`.
///
/// Checksummed and lowercase forms are both accepted; mixed case that fails
/// the checksum is accepted as well since wallets do not agree on casing.
pub fn parse_address(input: &str) -> Result<Address, WalletError> {
	let trimmed = input.trim();
	let hex = super::without_0x_prefix(trimmed);
	if hex.len() != 40 {
		return Err(WalletError::InvalidAddress(format!(
			"expected 20 bytes, got '{}'",
			trimmed
		)));
	}
	format!("0x{}", hex)
		.parse::<Address>()
		.map_err(|e| WalletError::InvalidAddress(format!("'{}': {}", trimmed, e)))
}
