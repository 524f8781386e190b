//! Utility functions for address handling and amount formatting.

pub mod conversion;
pub mod formatting;

pub use conversion::parse_address;
pub use formatting::{format_token_amount, short_address, without_0x_prefix, NATIVE_DECIMALS};
