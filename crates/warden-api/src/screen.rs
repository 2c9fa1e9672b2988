//! Handlers for `POST /search` and `POST /chat`.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::warn;
use warden_core::{
  classify::VerdictKind,
  log::SearchLog,
  present::ChatMessage,
  reply::{ChatReply, ChatStatus, SearchReply},
  screen::Submission,
};

use crate::{AppState, session::Session};

const RELAY_FAILED: &str =
  "The chat service is unavailable right now. Please try again later.";

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchBody {
  #[serde(default)]
  pub query: String,
}

/// `POST /search` with body `{"query":"..."}`.
///
/// Always 200: an empty query yields `{"status":"empty", ...}`, anything else
/// `{"status":"screened", ...}` with the verdict and audit record. Blocked
/// queries come back without their text.
pub async fn search<L>(
  State(state): State<AppState<L>>,
  Session(actor): Session,
  Json(body): Json<SearchBody>,
) -> Json<SearchReply>
where
  L: SearchLog + 'static,
{
  Json(state.screener.submit(&actor, &body.query).await.into())
}

// ─── Chat relay ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatBody {
  #[serde(default)]
  pub prompt: String,
}

/// `POST /chat` with body `{"prompt":"..."}`.
///
/// The prompt is screened and recorded first. Blocked prompts never leave the
/// server. Relay failures answer 502 (503 without a configured relay) but
/// still carry the verdict.
pub async fn chat<L>(
  State(state): State<AppState<L>>,
  Session(actor): Session,
  Json(body): Json<ChatBody>,
) -> (StatusCode, Json<ChatReply>)
where
  L: SearchLog + 'static,
{
  let screened = match state.screener.submit(&actor, &body.prompt).await {
    Submission::Empty { message } => {
      return (
        StatusCode::OK,
        Json(ChatReply {
          status: ChatStatus::Empty,
          message,
          verdict: None,
          response: None,
          relay_error: None,
          log_error: None,
        }),
      );
    }
    Submission::Screened(s) => s,
  };

  if screened.verdict.kind == VerdictKind::Blocked {
    return (
      StatusCode::OK,
      Json(ChatReply {
        status:      ChatStatus::Blocked,
        message:     screened.message,
        verdict:     Some(screened.verdict),
        response:    None,
        relay_error: None,
        log_error:   screened.log_error,
      }),
    );
  }

  let outcome = match &state.relay {
    Some(relay) => relay
      .complete(&screened.query)
      .await
      .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string())),
    None => Err((
      StatusCode::SERVICE_UNAVAILABLE,
      "no chat service is configured".to_string(),
    )),
  };

  match outcome {
    Ok(response) => (
      StatusCode::OK,
      Json(ChatReply {
        status:      ChatStatus::Answered,
        message:     screened.message,
        verdict:     Some(screened.verdict),
        response:    Some(response),
        relay_error: None,
        log_error:   screened.log_error,
      }),
    ),
    Err((status, error)) => {
      warn!(actor = %actor.id, %error, "chat relay failed");
      (
        status,
        Json(ChatReply {
          status:      ChatStatus::RelayFailed,
          message:     ChatMessage::error(RELAY_FAILED),
          verdict:     Some(screened.verdict),
          response:    None,
          relay_error: Some(error),
          log_error:   screened.log_error,
        }),
      )
    }
  }
}
