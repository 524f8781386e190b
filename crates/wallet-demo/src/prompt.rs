//! Interactive provider selection on the terminal.

use crate::output::print_choices;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use wallet_core::ProviderSelector;
use wallet_types::{ProviderChoice, WalletError};

/// Asks on stdin which provider to use. An empty answer picks `default`
/// when it is offered; `q` cancels.
pub struct PromptSelector {
	default: Option<String>,
}

impl PromptSelector {
	pub fn new(default: Option<String>) -> Self {
		Self { default }
	}
}

/// Interprets one line of input against the offered choices. Accepts a
/// 1-based index or a catalog key.
pub fn parse_selection(
	input: &str,
	choices: &[ProviderChoice],
	default: Option<&str>,
) -> Result<Option<String>, String> {
	let input = input.trim();
	if input.eq_ignore_ascii_case("q") {
		return Ok(None);
	}
	if input.is_empty() {
		return match default.filter(|key| choices.iter().any(|c| c.key == *key)) {
			Some(key) => Ok(Some(key.to_string())),
			None => Err("Please choose a provider".to_string()),
		};
	}
	if let Ok(index) = input.parse::<usize>() {
		return index
			.checked_sub(1)
			.and_then(|i| choices.get(i))
			.map(|choice| Some(choice.key.clone()))
			.ok_or_else(|| format!("No provider number {}", index));
	}
	choices
		.iter()
		.find(|choice| choice.key.eq_ignore_ascii_case(input))
		.map(|choice| Some(choice.key.clone()))
		.ok_or_else(|| format!("Unknown provider '{}'", input))
}

#[async_trait]
impl ProviderSelector for PromptSelector {
	async fn select(&self, choices: &[ProviderChoice]) -> Result<Option<String>, WalletError> {
		let choices = choices.to_vec();
		let default = self.default.clone();

		tokio::task::spawn_blocking(move || -> Result<Option<String>, WalletError> {
			println!("Select a wallet provider:");
			print_choices(&choices);

			let stdin = std::io::stdin();
			loop {
				match &default {
					Some(key) => print!("Provider [{}, q to cancel]: ", key),
					None => print!("Provider [q to cancel]: "),
				}
				let _ = std::io::stdout().flush();

				let mut line = String::new();
				let read = stdin
					.lock()
					.read_line(&mut line)
					.map_err(|e| WalletError::ConnectionFailed(format!("stdin: {}", e)))?;
				if read == 0 {
					// EOF behaves like dismissing the dialog.
					return Ok(None);
				}
				match parse_selection(&line, &choices, default.as_deref()) {
					Ok(selection) => return Ok(selection),
					Err(message) => println!("{}", message),
				}
			}
		})
		.await
		.map_err(|e| WalletError::ConnectionFailed(format!("selection prompt: {}", e)))?
	}
}
