//! HTTP surface for Warden.
//!
//! Exposes axum routers backed by any [`SearchLog`]: a JSON API and the
//! guardian dashboard page. Sessions arrive as request headers (see
//! [`session`]); TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = warden_api::router(state); // `/api/...` + `/dashboard`
//! ```

pub mod error;
pub mod history;
pub mod page;
pub mod relay;
pub mod screen;
pub mod session;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use warden_core::{log::SearchLog, screen::Screener};

pub use error::ApiError;
use relay::ChatRelay;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<L> {
  pub screener: Screener<L>,
  /// `None` when no upstream chat service is configured.
  pub relay:    Option<Arc<ChatRelay>>,
}

impl<L> Clone for AppState<L> {
  fn clone(&self) -> Self {
    Self {
      screener: self.screener.clone(),
      relay:    self.relay.clone(),
    }
  }
}

// ─── Routers ──────────────────────────────────────────────────────────────────

/// The JSON API. Nest it under `/api`.
pub fn api_router<L>(state: AppState<L>) -> Router<()>
where
  L: SearchLog + 'static,
{
  Router::new()
    .route("/search", post(screen::search::<L>))
    .route("/chat", post(screen::chat::<L>))
    .route("/history", get(history::list::<L>))
    .route(
      "/alerts",
      get(history::alerts::<L>).delete(history::clear_alerts::<L>),
    )
    .with_state(state)
}

/// HTML pages.
pub fn page_router<L>(state: AppState<L>) -> Router<()>
where
  L: SearchLog + 'static,
{
  Router::new()
    .route("/dashboard", get(page::dashboard::<L>))
    .route("/dashboard/clear", post(page::clear::<L>))
    .with_state(state)
}

/// Both routers, with the API under `/api`.
pub fn router<L>(state: AppState<L>) -> Router<()>
where
  L: SearchLog + 'static,
{
  Router::new()
    .nest("/api", api_router(state.clone()))
    .merge(page_router(state))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;
  use warden_core::{
    log::LogQuery,
    rules::RuleSet,
    session::{Actor, Role, header},
  };
  use warden_store_sqlite::SqliteLog;
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
  };

  use super::*;
  use crate::relay::RelayConfig;

  async fn make_state(relay: Option<ChatRelay>) -> AppState<SqliteLog> {
    let log = SqliteLog::open_in_memory().await.unwrap();
    AppState {
      screener: Screener::new(Arc::new(RuleSet::builtin()), Arc::new(log)),
      relay:    relay.map(Arc::new),
    }
  }

  fn family() -> (Actor, Actor) {
    let guardian_id = Uuid::new_v4();
    let child = Actor::new(Uuid::new_v4(), "Kim", Role::Child).with_guardian(guardian_id);
    let guardian =
      Actor::new(guardian_id, "Pat", Role::Guardian).with_children([child.id]);
    (guardian, child)
  }

  async fn send(
    state:  AppState<SqliteLog>,
    method: &str,
    uri:    &str,
    actor:  Option<&Actor>,
    body:   Option<Value>,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(a) = actor {
      builder = builder
        .header(header::ACTOR_ID, a.id.to_string())
        .header(header::ACTOR_NAME, a.name.as_str())
        .header(header::ACTOR_ROLE, a.role.to_string());
      if let Some(g) = a.linked_guardian {
        builder = builder.header(header::LINKED_GUARDIAN, g.to_string());
      }
      if !a.linked_children.is_empty() {
        let ids: Vec<String> = a.linked_children.iter().map(Uuid::to_string).collect();
        builder = builder.header(header::LINKED_CHILDREN, ids.join(","));
      }
    }
    let req = match body {
      Some(b) => builder
        .header("content-type", "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router(state).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  // ── /api/search ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn child_search_for_unsafe_content_is_blocked_and_logged() {
    let state = make_state(None).await;
    let (_, kid) = family();

    let resp = send(
      state.clone(),
      "POST",
      "/api/search",
      Some(&kid),
      Some(json!({ "query": "let's talk about violence in movies" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "screened");
    assert_eq!(body["verdict"]["kind"], "blocked");
    assert_eq!(body["message"]["tone"], "blocked");
    assert!(body["seq"].is_i64());

    let logged = state.screener.log().history(&LogQuery::default()).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert!(logged[0].alert);
    assert_eq!(logged[0].query, "let's talk about violence in movies");
  }

  #[tokio::test]
  async fn blocked_search_is_not_echoed_to_the_child() {
    let state = make_state(None).await;
    let (_, kid) = family();

    let resp = send(
      state,
      "POST",
      "/api/search",
      Some(&kid),
      Some(json!({ "query": "where to buy a weapon" })),
    )
    .await;
    let text = body_text(resp).await;
    assert!(!text.contains("where to buy"), "{text}");

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["verdict"]["kind"], "blocked");
    assert!(body.get("query").is_none());
    assert!(body.get("record").is_none());
  }

  #[tokio::test]
  async fn guardian_search_for_same_content_is_cautioned() {
    let state = make_state(None).await;
    let (guardian, _) = family();
    let resp = send(
      state,
      "POST",
      "/api/search",
      Some(&guardian),
      Some(json!({ "query": "let's talk about violence in movies" })),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["verdict"]["kind"], "cautioned");
    assert_eq!(body["verdict"]["matched"], "violence");
    assert_eq!(body["query"], "let's talk about violence in movies");
    assert_eq!(body["record"]["alert"], true);
  }

  #[tokio::test]
  async fn empty_search_is_not_logged() {
    let state = make_state(None).await;
    let (_, kid) = family();
    let resp = send(
      state.clone(),
      "POST",
      "/api/search",
      Some(&kid),
      Some(json!({ "query": "   " })),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["status"], "empty");
    assert_eq!(body["message"]["text"], "Please enter a search term.");
    assert_eq!(state.screener.log().count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn search_without_session_is_rejected() {
    let state = make_state(None).await;
    let resp = send(state, "POST", "/api/search", None, Some(json!({ "query": "hi" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
  }

  // ── /api/history and /api/alerts ────────────────────────────────────────────

  #[tokio::test]
  async fn guardian_history_and_alert_lifecycle() {
    let state = make_state(None).await;
    let (guardian, kid) = family();

    for q in ["tell me about octopuses", "where to buy a weapon"] {
      send(state.clone(), "POST", "/api/search", Some(&kid), Some(json!({ "query": q }))).await;
    }

    let history = body_json(send(state.clone(), "GET", "/api/history", Some(&guardian), None).await).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["query"], "where to buy a weapon");
    assert_eq!(history[0]["alert"], true);
    assert_eq!(history[1]["alert"], false);

    let alerts = body_json(send(state.clone(), "GET", "/api/alerts", Some(&guardian), None).await).await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);

    let cleared = send(state.clone(), "DELETE", "/api/alerts", Some(&guardian), None).await;
    assert_eq!(cleared.status(), StatusCode::OK);

    let alerts = body_json(send(state.clone(), "GET", "/api/alerts", Some(&guardian), None).await).await;
    assert!(alerts.as_array().unwrap().is_empty());

    // History survives a clear.
    let history = body_json(send(state, "GET", "/api/history?alerts_only=true", Some(&guardian), None).await).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn child_sees_only_own_history_and_no_alerts() {
    let state = make_state(None).await;
    let (_, kid) = family();
    let (_, other_kid) = family();
    send(state.clone(), "POST", "/api/search", Some(&kid), Some(json!({ "query": "mine" }))).await;
    send(state.clone(), "POST", "/api/search", Some(&other_kid), Some(json!({ "query": "theirs" }))).await;

    let history = body_json(send(state.clone(), "GET", "/api/history", Some(&kid), None).await).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["query"], "mine");

    let resp = send(state, "GET", "/api/alerts", Some(&kid), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  // ── /api/chat ───────────────────────────────────────────────────────────────

  async fn relay_to(server: &MockServer) -> ChatRelay {
    ChatRelay::new(RelayConfig {
      base_url:      server.uri(),
      api_key:       String::new(),
      model:         "test".into(),
      system_prompt: None,
      timeout_secs:  5,
    })
    .unwrap()
  }

  #[tokio::test]
  async fn safe_prompt_is_relayed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": "Octopuses have three hearts." } }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let state = make_state(Some(relay_to(&server).await)).await;
    let (_, kid) = family();
    let resp = send(
      state,
      "POST",
      "/api/chat",
      Some(&kid),
      Some(json!({ "prompt": "tell me about octopuses" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "answered");
    assert_eq!(body["response"], "Octopuses have three hearts.");
  }

  #[tokio::test]
  async fn cautioned_prompt_is_relayed_with_warning() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_partial_json(json!({
        "messages": [{ "role": "user", "content": "history of weapon design" }]
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": "Early tools doubled as weapons." } }]
      })))
      .expect(1)
      .mount(&server)
      .await;

    let state = make_state(Some(relay_to(&server).await)).await;
    let (guardian, _) = family();
    let resp = send(
      state.clone(),
      "POST",
      "/api/chat",
      Some(&guardian),
      Some(json!({ "prompt": "history of weapon design" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "answered");
    assert_eq!(body["verdict"]["kind"], "cautioned");
    assert_eq!(body["message"]["tone"], "caution");
    assert_eq!(body["response"], "Early tools doubled as weapons.");

    let logged = state.screener.log().history(&LogQuery::default()).await.unwrap();
    assert!(logged[0].alert);
  }

  #[tokio::test]
  async fn blocked_prompt_never_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let state = make_state(Some(relay_to(&server).await)).await;
    let (_, kid) = family();
    let resp = send(
      state.clone(),
      "POST",
      "/api/chat",
      Some(&kid),
      Some(json!({ "prompt": "how do I get drugs" })),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["status"], "blocked");
    assert!(body["response"].is_null());
    assert_eq!(state.screener.log().count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn relay_failure_keeps_verdict_and_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let state = make_state(Some(relay_to(&server).await)).await;
    let (_, kid) = family();
    let resp = send(
      state.clone(),
      "POST",
      "/api/chat",
      Some(&kid),
      Some(json!({ "prompt": "tell me about octopuses" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "relay_failed");
    assert_eq!(body["verdict"]["kind"], "safe");
    assert_eq!(body["message"]["tone"], "error");
    assert_eq!(state.screener.log().count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn chat_without_relay_is_unavailable() {
    let state = make_state(None).await;
    let (guardian, _) = family();
    let resp = send(
      state,
      "POST",
      "/api/chat",
      Some(&guardian),
      Some(json!({ "prompt": "hello" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
  }

  // ── /dashboard ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn dashboard_lists_children_searches() {
    let state = make_state(None).await;
    let (guardian, kid) = family();
    send(state.clone(), "POST", "/api/search", Some(&kid), Some(json!({ "query": "a fight at school" }))).await;

    let resp = send(state.clone(), "GET", "/dashboard", Some(&guardian), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("Guardian: Pat"));
    assert!(html.contains(r#"class="flagged""#));
    assert!(html.contains("a fight at school"));

    let resp = send(state, "GET", "/dashboard", Some(&kid), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn dashboard_clear_button_clears_alerts() {
    let state = make_state(None).await;
    let (guardian, kid) = family();
    send(state.clone(), "POST", "/api/search", Some(&kid), Some(json!({ "query": "a fight at school" }))).await;

    let resp = send(state.clone(), "POST", "/dashboard/clear", Some(&kid), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(state.clone(), "POST", "/dashboard/clear", Some(&guardian), None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/dashboard");

    let html = body_text(send(state, "GET", "/dashboard", Some(&guardian), None).await).await;
    assert!(html.contains("No flagged activity. All clear!"));
    assert!(html.contains("a fight at school"));
  }
}
