//! Terminal output.
//!
//! Renders the session view the way the web page showed it: the shortened
//! address linking to the block explorer, the network identifiers and both
//! balances in whole units.

use colored::Colorize;
use wallet_config::Config;
use wallet_types::{format_token_amount, ProviderChoice, ViewSnapshot, NATIVE_DECIMALS};

pub struct Display;

impl Display {
	pub fn header(text: &str) {
		println!("\n{}", text.bold().cyan());
		println!("{}", "─".repeat(text.chars().count()).cyan());
	}

	pub fn success(message: &str) {
		println!("{} {}", "✓".green().bold(), message);
	}

	pub fn error(message: &str) {
		eprintln!("{} {}", "✗".red().bold(), message.red());
	}

	pub fn warning(message: &str) {
		println!("{} {}", "⚠".yellow().bold(), message.yellow());
	}

	pub fn info(message: &str) {
		println!("{} {}", "ℹ".blue().bold(), message);
	}

	pub fn kv(key: &str, value: &str) {
		println!("  {} {}", format!("{}:", key).bold(), value);
	}
}

/// Balance lines as `(label, amount)` in whole units.
pub fn balance_lines(view: &ViewSnapshot, config: &Config) -> Vec<(String, String)> {
	vec![
		(
			"ETH".to_string(),
			format_token_amount(&view.balances.native, NATIVE_DECIMALS),
		),
		(
			config.token.symbol.clone(),
			format_token_amount(&view.balances.token, config.token.decimals),
		),
	]
}

pub fn print_view(view: &ViewSnapshot, config: &Config) {
	if !view.is_connected() {
		Display::info("Not connected");
		return;
	}

	Display::header("Wallet");
	Display::kv("Address", &view.short_address());
	if let Some(url) = view.explorer_url(&config.explorer.address_url) {
		Display::kv("Explorer", &url);
	}
	if let Some(provider) = &view.provider {
		Display::kv("Provider", provider);
	}
	if view.network.is_set() {
		Display::kv("Chain ID", view.network.chain_id());
		Display::kv("Network ID", view.network.network_id());
	}
	for (label, amount) in balance_lines(view, config) {
		Display::kv(&label, &amount);
	}
}

pub fn print_choices(choices: &[ProviderChoice]) {
	for (index, choice) in choices.iter().enumerate() {
		println!("  {}. {}", index + 1, choice);
	}
}
