//! Bootstrap for the Warden server.
//!
//! Turns a [`ServerConfig`] into a running application: loads the rule set,
//! opens the SQLite search log, optionally connects the chat relay, and wraps
//! the `warden-api` router in request tracing.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;
use warden_api::{
  AppState,
  relay::{ChatRelay, RelayConfig},
};
use warden_core::{
  log::DEFAULT_RETENTION,
  rules::{RuleFallback, RuleSet, load_rules},
  screen::Screener,
};
use warden_store_sqlite::SqliteLog;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("warden.db") }

fn default_retention() -> usize { DEFAULT_RETENTION }

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `WARDEN_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:           String,
  #[serde(default = "default_port")]
  pub port:           u16,
  /// `~` is expanded at startup.
  #[serde(default = "default_store_path")]
  pub store_path:     PathBuf,
  /// Unset means the built-in keyword list.
  #[serde(default)]
  pub rules_path:     Option<PathBuf>,
  #[serde(default)]
  pub rules_fallback: RuleFallback,
  #[serde(default = "default_retention")]
  pub retention:      usize,
  /// Upstream chat service. `/api/chat` answers 503 without it.
  #[serde(default)]
  pub relay:          Option<RelayConfig>,
}

impl ServerConfig {
  /// Read `path` (optional) and `WARDEN_*` variables, e.g. `WARDEN_PORT` or
  /// `WARDEN_RELAY__BASE_URL` for nested keys.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("WARDEN")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

/// The rule set for `config`: the built-in list when no file is configured,
/// otherwise the file with the configured fallback.
pub fn load_rules_for(config: &ServerConfig) -> RuleSet {
  match &config.rules_path {
    Some(path) => load_rules(&expand_tilde(path), config.rules_fallback),
    None => {
      info!("no rules_path configured, using built-in keywords");
      RuleSet::builtin()
    }
  }
}

/// Open the store and assemble the shared handler state.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState<SqliteLog>> {
  let rules = load_rules_for(config);

  let store_path = expand_tilde(&config.store_path);
  let log = SqliteLog::open(&store_path)
    .await
    .with_context(|| format!("failed to open search log at {store_path:?}"))?
    .with_retention(config.retention)
    .context("invalid retention")?;

  let relay = config
    .relay
    .clone()
    .map(ChatRelay::new)
    .transpose()
    .context("failed to set up chat relay")?;
  if relay.is_none() {
    info!("no [relay] configured, chat is disabled");
  }

  Ok(AppState {
    screener: Screener::new(Arc::new(rules), Arc::new(log)),
    relay:    relay.map(Arc::new),
  })
}

/// The full application router with request tracing.
pub fn app(state: AppState<SqliteLog>) -> Router {
  warden_api::router(state).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::fs;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;
  use uuid::Uuid;
  use warden_core::{log::SearchLog as _, session::header};

  use super::*;

  fn config_in(dir: &Path) -> ServerConfig {
    ServerConfig {
      host:           default_host(),
      port:           default_port(),
      store_path:     dir.join("warden.db"),
      rules_path:     None,
      rules_fallback: RuleFallback::Open,
      retention:      DEFAULT_RETENTION,
      relay:          None,
    }
  }

  #[test]
  fn config_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
      &path,
      r#"
port = 9000
rules_fallback = "closed"

[relay]
base_url = "http://localhost:11434/v1"
"#,
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.retention, 200);
    assert_eq!(cfg.rules_fallback, RuleFallback::Closed);
    assert_eq!(cfg.address(), "127.0.0.1:9000");

    let relay = cfg.relay.unwrap();
    assert_eq!(relay.base_url, "http://localhost:11434/v1");
    assert_eq!(relay.timeout_secs, 30);
  }

  #[test]
  fn missing_config_file_is_all_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServerConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.store_path, PathBuf::from("warden.db"));
    assert!(cfg.rules_path.is_none());
    assert!(cfg.relay.is_none());
  }

  #[test]
  fn rules_follow_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config_in(dir.path());
    assert_eq!(load_rules_for(&cfg), RuleSet::builtin());

    let rules = dir.path().join("rules.txt");
    fs::write(&rules, "(unsafe \"dragons\")\n").unwrap();
    cfg.rules_path = Some(rules);
    assert_eq!(load_rules_for(&cfg).keywords(), ["dragons"]);

    cfg.rules_path = Some(dir.path().join("missing.txt"));
    assert!(load_rules_for(&cfg).is_empty());
    cfg.rules_fallback = RuleFallback::Closed;
    assert!(load_rules_for(&cfg).blocks_all());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/warden.db")),
      PathBuf::from(home).join("warden.db")
    );
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
  }

  #[tokio::test]
  async fn zero_retention_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServerConfig {
      retention: 0,
      ..config_in(dir.path())
    };
    assert!(build_state(&cfg).await.is_err());
  }

  #[tokio::test]
  async fn served_app_screens_with_configured_rules() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.txt");
    fs::write(&rules, "(unsafe \"dragons\")\n").unwrap();
    let cfg = ServerConfig {
      rules_path: Some(rules),
      ..config_in(dir.path())
    };

    let state = build_state(&cfg).await.unwrap();
    let log = state.screener.log().clone();

    let req = Request::builder()
      .method("POST")
      .uri("/api/search")
      .header(header::ACTOR_ID, Uuid::new_v4().to_string())
      .header(header::ACTOR_NAME, "Kim")
      .header(header::ACTOR_ROLE, "child")
      .header("content-type", "application/json")
      .body(Body::from(r#"{"query":"Here be DRAGONS"}"#))
      .unwrap();
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["verdict"]["kind"], "blocked");
    assert_eq!(body["verdict"]["matched"], "dragons");
    assert_eq!(log.count().await.unwrap(), 1);
  }
}
