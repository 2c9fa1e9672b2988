//! Async HTTP client wrapping the Warden JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use warden_core::{
  record::{AlertClearance, SearchRecord},
  reply::{ChatReply, SearchReply},
  session::{Actor, header},
};

/// Connection settings for the Warden API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub actor:    Actor,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the Warden REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Attach the session headers.
  fn session(&self, req: RequestBuilder) -> RequestBuilder {
    let actor = &self.config.actor;
    let mut req = req
      .header(header::ACTOR_ID, actor.id.to_string())
      .header(header::ACTOR_NAME, actor.name.as_str())
      .header(header::ACTOR_ROLE, actor.role.to_string());
    if let Some(g) = actor.linked_guardian {
      req = req.header(header::LINKED_GUARDIAN, g.to_string());
    }
    if !actor.linked_children.is_empty() {
      let ids: Vec<String> = actor.linked_children.iter().map(|c| c.to_string()).collect();
      req = req.header(header::LINKED_CHILDREN, ids.join(","));
    }
    req
  }

  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
    debug!(request = what, "sending");
    let resp = self
      .session(req)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    Ok(resp)
  }

  /// Turn a non-success response into an error carrying the server message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = match resp.json::<ErrorBody>().await {
      Ok(body) => body.error,
      Err(_) => status.to_string(),
    };
    Err(anyhow!("{what} → {status}: {message}"))
  }

  // ── Screening ─────────────────────────────────────────────────────────────

  /// `POST /api/search`
  pub async fn search(&self, query: &str) -> Result<SearchReply> {
    let req = self
      .client
      .post(self.url("/api/search"))
      .json(&serde_json::json!({ "query": query }));
    let resp = Self::check(self.send(req, "POST /search").await?, "POST /search").await?;
    resp.json().await.context("deserialising search result")
  }

  /// `POST /api/chat`
  pub async fn chat(&self, prompt: &str) -> Result<ChatReply> {
    let req = self
      .client
      .post(self.url("/api/chat"))
      .json(&serde_json::json!({ "prompt": prompt }));
    let resp = self.send(req, "POST /chat").await?;
    let resp = match resp.status() {
      StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => resp,
      _ => Self::check(resp, "POST /chat").await?,
    };
    resp.json().await.context("deserialising chat reply")
  }

  // ── History ───────────────────────────────────────────────────────────────

  /// `GET /api/history[?alerts_only=true][&limit=N]`
  pub async fn history(&self, alerts_only: bool, limit: Option<usize>) -> Result<Vec<SearchRecord>> {
    let mut query = vec![("alerts_only", alerts_only.to_string())];
    if let Some(n) = limit {
      query.push(("limit", n.to_string()));
    }
    let req = self.client.get(self.url("/api/history")).query(&query);
    let resp = Self::check(self.send(req, "GET /history").await?, "GET /history").await?;
    resp.json().await.context("deserialising history")
  }

  /// `GET /api/alerts`
  pub async fn alerts(&self, limit: Option<usize>) -> Result<Vec<SearchRecord>> {
    let mut req = self.client.get(self.url("/api/alerts"));
    if let Some(n) = limit {
      req = req.query(&[("limit", n.to_string())]);
    }
    let resp = Self::check(self.send(req, "GET /alerts").await?, "GET /alerts").await?;
    resp.json().await.context("deserialising alerts")
  }

  /// `DELETE /api/alerts`
  pub async fn clear_alerts(&self) -> Result<AlertClearance> {
    let req = self.client.delete(self.url("/api/alerts"));
    let resp = Self::check(self.send(req, "DELETE /alerts").await?, "DELETE /alerts").await?;
    resp.json().await.context("deserialising clearance")
  }

  /// `GET /dashboard`
  pub async fn dashboard(&self) -> Result<String> {
    let req = self.client.get(self.url("/dashboard"));
    let resp = Self::check(self.send(req, "GET /dashboard").await?, "GET /dashboard").await?;
    resp.text().await.context("reading dashboard")
  }
}
