//! Command line front end for the wallet session core.
//!
//! ```bash
//! export INFURA_KEY=...
//! wallet-demo connect                      # choose a provider interactively
//! wallet-demo connect --provider coinbasewallet --watch --refresh 30
//! wallet-demo providers
//! ```

mod output;
mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{print_choices, print_view, Display};
use prompt::PromptSelector;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wallet_config::Config;
use wallet_core::{
	FileProviderCache, FixedSelector, ProviderCache, ProviderCatalog, ProviderSelector,
	SessionManager,
};
use wallet_types::WalletError;

#[derive(Parser, Debug)]
#[command(name = "wallet-demo")]
#[command(about = "Connect a wallet and show its balances")]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Command,

	/// Configuration file; the bundled configuration is used when omitted
	#[arg(global = true, short, long, env = "WALLET_CONFIG")]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(global = true, short, long, default_value = "warn")]
	log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Connect a wallet and print address, network and balances
	Connect {
		/// Skip the selection prompt and use this provider
		#[arg(short, long)]
		provider: Option<String>,

		/// Keep the session open and print every change until Ctrl-C
		#[arg(short, long)]
		watch: bool,

		/// While watching, re-read balances every SECS seconds
		#[arg(long, value_name = "SECS", requires = "watch")]
		refresh: Option<u64>,

		/// Print the view as JSON
		#[arg(long)]
		json: bool,
	},

	/// List the configured wallet providers
	Providers,

	/// Show the effective configuration
	Config,
}

fn init_logging(level: &str) {
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();
}

async fn load_config(path: Option<&PathBuf>) -> Result<Config> {
	match path {
		Some(path) => Config::from_file(path)
			.await
			.with_context(|| format!("Failed to load configuration from {}", path.display())),
		None => Config::bundled().context("Failed to load bundled configuration"),
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(&cli.log_level);

	let config = load_config(cli.config.as_ref()).await?;

	let result = match cli.command {
		Command::Connect {
			provider,
			watch,
			refresh,
			json,
		} => connect(&config, provider, watch, refresh, json).await,
		Command::Providers => list_providers(&config),
		Command::Config => {
			show_config(&config);
			Ok(())
		},
	};

	if let Err(e) = result {
		Display::error(&format!("{:#}", e));
		if e
			.downcast_ref::<WalletError>()
			.is_some_and(WalletError::is_connection_error)
		{
			Display::info("No session was opened; run connect again to retry");
		}
		std::process::exit(1);
	}
	Ok(())
}

async fn connect(
	config: &Config,
	provider: Option<String>,
	watch: bool,
	refresh: Option<u64>,
	json: bool,
) -> Result<()> {
	// The remembered provider only pre-fills the prompt; connect clears it.
	let remembered = remembered_provider(config).await;
	let selector: Arc<dyn ProviderSelector> = match provider {
		Some(key) => Arc::new(FixedSelector::new(key)),
		None => Arc::new(PromptSelector::new(remembered)),
	};
	let manager = Arc::new(SessionManager::from_config(config, selector)?);

	let view = manager.connect().await.context("Wallet connection failed")?;
	if json {
		println!("{}", serde_json::to_string_pretty(&view)?);
	} else {
		Display::success("Wallet connected");
		print_view(&view, config);
	}

	if watch {
		let mut changes = manager.subscribe();
		let period = Duration::from_secs(refresh.unwrap_or(1).max(1));
		let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
		Display::info("Watching for account and network changes, Ctrl-C to disconnect");
		loop {
			tokio::select! {
				_ = tokio::signal::ctrl_c() => break,
				_ = ticker.tick(), if refresh.is_some() => {
					match manager.refresh_balances().await {
						Ok(_) => {},
						Err(e) if e.is_recoverable() => {
							Display::warning(&format!("Balance refresh failed: {}", e));
						},
						Err(WalletError::NotConnected) => break,
						Err(e) => return Err(e.into()),
					}
				},
				changed = changes.changed() => {
					if changed.is_err() {
						break;
					}
					let view = changes.borrow_and_update().clone();
					if json {
						println!("{}", serde_json::to_string(&view)?);
					} else {
						print_view(&view, config);
					}
					if !view.is_active {
						Display::warning("Wallet closed the session");
						return Ok(());
					}
				}
			}
		}
	}

	manager.disconnect().await;
	if !json {
		Display::success("Disconnected");
	}
	Ok(())
}

async fn remembered_provider(config: &Config) -> Option<String> {
	if !config.app.cache_provider {
		return None;
	}
	let path = config.session.cache_path.as_ref()?;
	match FileProviderCache::new(path).get().await {
		Ok(key) => key,
		Err(e) => {
			tracing::warn!(error = %e, "Ignoring unreadable provider cache");
			None
		},
	}
}

fn list_providers(config: &Config) -> Result<()> {
	let catalog = ProviderCatalog::from_config(config)?;
	Display::header("Wallet providers");
	print_choices(&catalog.choices());
	Ok(())
}

fn show_config(config: &Config) {
	Display::header("Configuration");
	Display::kv("Application", &config.app.name);
	Display::kv("Network", &config.app.network);
	Display::kv(
		"Handshake timeout",
		&format!("{}s", config.session.handshake_timeout_seconds),
	);
	let cache = match (&config.session.cache_path, config.app.cache_provider) {
		(_, false) => "disabled".to_string(),
		(Some(path), true) => path.display().to_string(),
		(None, true) => "in memory".to_string(),
	};
	Display::kv("Provider cache", &cache);
	Display::kv(
		"Token",
		&format!(
			"{} {} (chain {}, {} decimals)",
			config.token.symbol, config.token.address, config.token.home_chain_id, config.token.decimals
		),
	);
	Display::kv("Explorer", &config.explorer.address_url);
	Display::kv(
		"Providers",
		&config.providers.keys().cloned().collect::<Vec<_>>().join(", "),
	);
}
