//! String formatting utilities.
//!
//! Compact address display and smallest-unit amounts rendered in whole
//! units.

/// Decimals of the chain's native coin.
pub const NATIVE_DECIMALS: u8 = 18;

/// Removes "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Abbreviates an address as its first 7 characters, an ellipsis and its
/// last 4 characters. Short inputs are returned unchanged.
pub fn short_address(address: &str) -> String {
	if address.len() <= 11 || !address.is_ascii() {
		return address.to_string();
	}
	format!("{}...{}", &address[..7], &address[address.len() - 4..])
}

/// Formats a raw on-chain amount with the given number of decimals.
///
/// Trailing zeros of the fractional part are dropped, so `1500000` with 6
/// decimals reads `1.5` and `1000000` reads `1`.
pub fn format_token_amount(amount: &str, decimals: u8) -> String {
	let amount = amount.trim_start_matches('0');
	let amount = if amount.is_empty() { "0" } else { amount };
	if decimals == 0 {
		return amount.to_string();
	}

	let decimal_places = decimals as usize;

	let (integer_part, decimal_part) = if amount.len() <= decimal_places {
		let decimal_str = format!("{:0>width$}", amount, width = decimal_places);
		("0".to_string(), decimal_str)
	} else {
		let split_pos = amount.len() - decimal_places;
		(
			amount[..split_pos].to_string(),
			amount[split_pos..].to_string(),
		)
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');

	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}
