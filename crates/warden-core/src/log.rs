//! The `SearchLog` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `warden-store-sqlite`).
//! Higher layers (`warden-api`, `warden-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  record::{AlertClearance, NewSearchRecord, SearchRecord},
  session::Actor,
};

/// Number of records kept when no retention is configured.
pub const DEFAULT_RETENTION: usize = 200;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`SearchLog::history`].
///
/// `actor_ids` and `guardian_id` are OR-combined: a record matches if its
/// actor is listed or it was linked to the guardian. When both are empty the
/// query is unscoped.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
  pub actor_ids:      Vec<Uuid>,
  pub guardian_id:    Option<Uuid>,
  /// Only records with `alert = true`.
  pub alerts_only:    bool,
  /// Only records with `seq` strictly greater than this.
  pub after_seq:      Option<i64>,
  pub recorded_after: Option<DateTime<Utc>>,
  pub limit:          Option<usize>,
}

impl LogQuery {
  /// The history `actor` is allowed to read: a guardian sees their linked
  /// children, everyone else sees their own records.
  pub fn visible_to(actor: &Actor) -> Self {
    if actor.is_guardian() {
      Self {
        actor_ids: actor.linked_children.clone(),
        guardian_id: Some(actor.id),
        ..Self::default()
      }
    } else {
      Self {
        actor_ids: vec![actor.id],
        ..Self::default()
      }
    }
  }

  pub fn is_unscoped(&self) -> bool {
    self.actor_ids.is_empty() && self.guardian_id.is_none()
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the append-only search log.
///
/// Implementations must serialise [`append`](Self::append): the insert and the
/// retention prune happen in one exclusive section so that concurrent
/// submissions never lose records.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SearchLog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append a record, then drop the oldest records beyond the retention
  /// capacity. Returns the persisted record.
  fn append(
    &self,
    input: NewSearchRecord,
  ) -> impl Future<Output = Result<SearchRecord, Self::Error>> + Send + '_;

  /// Records matching `query`, newest first.
  fn history<'a>(
    &'a self,
    query: &'a LogQuery,
  ) -> impl Future<Output = Result<Vec<SearchRecord>, Self::Error>> + Send + 'a;

  /// Mark every alert currently visible to `guardian_id` as cleared.
  fn clear_alerts(
    &self,
    guardian_id: Uuid,
  ) -> impl Future<Output = Result<AlertClearance, Self::Error>> + Send + '_;

  /// The guardian's most recent clearance, if any.
  fn last_clearance(
    &self,
    guardian_id: Uuid,
  ) -> impl Future<Output = Result<Option<AlertClearance>, Self::Error>> + Send + '_;

  /// Number of records currently retained.
  fn count(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

/// The guardian alerts for `guardian`: flagged records of their children
/// since their last clearance, newest first.
pub async fn guardian_alerts<L: SearchLog>(
  log: &L,
  guardian: &Actor,
  limit: Option<usize>,
) -> Result<Vec<SearchRecord>, L::Error> {
  let cleared = log.last_clearance(guardian.id).await?;
  let query = LogQuery {
    alerts_only: true,
    after_seq: cleared.map(|c| c.through_seq),
    limit,
    ..LogQuery::visible_to(guardian)
  };
  log.history(&query).await
}
