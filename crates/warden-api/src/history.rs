//! Handlers for `/history` and `/alerts`.
//!
//! | Method   | Path       | Notes |
//! |----------|------------|-------|
//! | `GET`    | `/history` | Guardian: linked children. Others: own records. `?alerts_only&limit` |
//! | `GET`    | `/alerts`  | Guardian only; alerts since the last clearance |
//! | `DELETE` | `/alerts`  | Guardian only; bulk clear |

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use warden_core::{
  log::{LogQuery, SearchLog, guardian_alerts},
  record::{AlertClearance, SearchRecord},
};

use crate::{AppState, error::ApiError, session::Session};

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
  #[serde(default)]
  pub alerts_only: bool,
  pub limit:       Option<usize>,
}

/// `GET /history[?alerts_only=true][&limit=N]`, newest first.
pub async fn list<L>(
  State(state): State<AppState<L>>,
  Session(actor): Session,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SearchRecord>>, ApiError>
where
  L: SearchLog + 'static,
{
  let query = LogQuery {
    alerts_only: params.alerts_only,
    limit: params.limit,
    ..LogQuery::visible_to(&actor)
  };
  let records = state
    .screener
    .log()
    .history(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

#[derive(Debug, Deserialize, Default)]
pub struct AlertParams {
  pub limit: Option<usize>,
}

/// `GET /alerts[?limit=N]`
pub async fn alerts<L>(
  State(state): State<AppState<L>>,
  session: Session,
  Query(params): Query<AlertParams>,
) -> Result<Json<Vec<SearchRecord>>, ApiError>
where
  L: SearchLog + 'static,
{
  let guardian = session.require_guardian()?;
  let records = guardian_alerts(state.screener.log().as_ref(), guardian, params.limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `DELETE /alerts`
pub async fn clear_alerts<L>(
  State(state): State<AppState<L>>,
  session: Session,
) -> Result<Json<AlertClearance>, ApiError>
where
  L: SearchLog + 'static,
{
  let guardian = session.require_guardian()?;
  let clearance = state
    .screener
    .log()
    .clear_alerts(guardian.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(clearance))
}
