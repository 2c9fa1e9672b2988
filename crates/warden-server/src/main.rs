//! warden-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `WARDEN_*`
//! environment overrides, opens the SQLite search log and serves the Warden
//! API and dashboard over HTTP.
//!
//! # Checking a rule file
//!
//! ```
//! cargo run -p warden-server -- --check-rules
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use warden_core::rules::read_rules;
use warden_server::{ServerConfig, app, build_state, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Warden content-screening server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Parse the configured rule file, print its keywords and exit.
  #[arg(long)]
  check_rules: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to read configuration from {:?}", cli.config))?;

  if cli.check_rules {
    return check_rules(&server_cfg);
  }

  let state = build_state(&server_cfg).await?;
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(state)).await.context("server error")?;

  Ok(())
}

/// Print the rule set the server would start with. Unlike startup, an
/// unreadable rule file is an error here.
fn check_rules(config: &ServerConfig) -> anyhow::Result<()> {
  let Some(path) = &config.rules_path else {
    let rules = warden_server::load_rules_for(config);
    println!("no rules_path configured; {} built-in keywords:", rules.len());
    for k in rules.keywords() {
      println!("  {k}");
    }
    return Ok(());
  };

  let path = expand_tilde(path);
  let rules = read_rules(&path)?;
  if rules.is_empty() {
    bail!("{} contains no (unsafe \"...\") records", path.display());
  }
  println!("{}: {} keywords", path.display(), rules.len());
  for k in rules.keywords() {
    println!("  {k}");
  }
  Ok(())
}
