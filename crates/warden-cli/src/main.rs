//! `warden` — command-line client for the Warden server.
//!
//! # Usage
//!
//! ```
//! warden --session kim.toml ask "tell me about octopuses"
//! warden --session pat.toml alerts
//! warden --url http://warden.local:8080 --session pat.toml clear-alerts
//! ```
//!
//! The session file describes who is acting:
//!
//! ```toml
//! id   = "6f1c0b1e-8a53-4e0c-9a47-8f5f4d3b2a10"
//! name = "Kim"
//! role = "child"
//! linked_guardian = "0d3f7e2c-5b1a-4c8e-b0e4-2f9a6c7d8e11"
//! ```

mod client;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use warden_core::{
  present::{NO_ALERTS, NO_SEARCHES},
  reply::ChatStatus,
  session::Actor,
};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "warden", about = "Command-line client for the Warden server")]
struct Args {
  /// Base URL of the Warden server.
  #[arg(long, env = "WARDEN_URL", default_value = "http://localhost:8080")]
  url: String,

  /// TOML file describing the acting user.
  #[arg(short, long, env = "WARDEN_SESSION", value_name = "FILE")]
  session: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Screen a search query.
  Ask {
    query: Vec<String>,
  },
  /// Screen a prompt and, unless blocked, ask the chat service.
  Chat {
    prompt: Vec<String>,
  },
  /// Show search history, newest first.
  History {
    /// Only flagged searches.
    #[arg(long)]
    alerts_only: bool,
    #[arg(short = 'n', long)]
    limit:       Option<usize>,
  },
  /// Show current alerts (guardians only).
  Alerts {
    #[arg(short = 'n', long)]
    limit: Option<usize>,
  },
  /// Clear all current alerts (guardians only).
  ClearAlerts,
  /// Fetch the guardian dashboard HTML.
  Dashboard {
    /// Write to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    out: Option<PathBuf>,
  },
}

// ─── Session file ─────────────────────────────────────────────────────────────

fn read_session(path: &Path) -> Result<Actor> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading session file {}", path.display()))?;
  let actor: Actor = toml::from_str(&raw).context("parsing session file")?;
  actor.validate()?;
  Ok(actor)
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let actor = read_session(&args.session)?;
  let client = ApiClient::new(ApiConfig {
    base_url: args.url,
    actor,
  })?;

  match args.command {
    Command::Ask { query } => {
      let sub = client.search(&query.join(" ")).await?;
      println!("{}", render::submission(&sub));
    }
    Command::Chat { prompt } => {
      let reply = client.chat(&prompt.join(" ")).await?;
      println!("{}", render::chat_reply(&reply));
      if reply.status == ChatStatus::RelayFailed {
        bail!("chat service unavailable");
      }
    }
    Command::History { alerts_only, limit } => {
      let records = client.history(alerts_only, limit).await?;
      let empty = if alerts_only { NO_ALERTS } else { NO_SEARCHES };
      println!("{}", render::records(&records, empty));
    }
    Command::Alerts { limit } => {
      let records = client.alerts(limit).await?;
      println!("{}", render::records(&records, NO_ALERTS));
    }
    Command::ClearAlerts => {
      let clearance = client.clear_alerts().await?;
      println!("{}", render::clearance(&clearance));
    }
    Command::Dashboard { out } => {
      let html = client.dashboard().await?;
      match out {
        Some(path) => std::fs::write(&path, html)
          .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{html}"),
      }
    }
  }

  Ok(())
}
