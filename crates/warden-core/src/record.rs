//! Search records: the entries of the audit log.
//!
//! Every non-empty submission produces exactly one record. Records are
//! immutable; the log only appends and prunes its oldest entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  classify::{Verdict, VerdictKind},
  session::{Actor, Role},
};

/// Input to [`SearchLog::append`](crate::log::SearchLog::append).
/// The store assigns the sequence number, record id and timestamp.
#[derive(Debug, Clone)]
pub struct NewSearchRecord {
  pub actor_id:    Uuid,
  pub actor_name:  String,
  pub role:        Role,
  pub guardian_id: Option<Uuid>,
  pub query:       String,
  pub verdict:     VerdictKind,
  pub matched:     Option<String>,
}

impl NewSearchRecord {
  pub fn new(actor: &Actor, query: impl Into<String>, verdict: &Verdict) -> Self {
    Self {
      actor_id:    actor.id,
      actor_name:  actor.name.clone(),
      role:        actor.role,
      guardian_id: actor.linked_guardian,
      query:       query.into(),
      verdict:     verdict.kind,
      matched:     verdict.matched.clone(),
    }
  }

  pub fn alert(&self) -> bool { self.verdict.is_flagged() }
}

/// A persisted log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
  /// Store-assigned position in the log; strictly increasing.
  pub seq:         i64,
  pub record_id:   Uuid,
  pub actor_id:    Uuid,
  pub actor_name:  String,
  pub role:        Role,
  /// Guardian linked to the actor at the time of the query.
  pub guardian_id: Option<Uuid>,
  pub query:       String,
  pub verdict:     VerdictKind,
  pub matched:     Option<String>,
  /// `true` for every non-safe verdict.
  pub alert:       bool,
  pub recorded_at: DateTime<Utc>,
}

impl SearchRecord {
  /// Whether `guardian` may see this record.
  pub fn visible_to(&self, guardian: &Actor) -> bool {
    self.guardian_id == Some(guardian.id)
      || guardian.linked_children.contains(&self.actor_id)
  }
}

/// A guardian's bulk "clear alerts" mark. Alerts with `seq <= through_seq`
/// are no longer shown to that guardian; the records themselves stay in the
/// log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertClearance {
  pub guardian_id: Uuid,
  pub through_seq: i64,
  pub cleared_at:  DateTime<Utc>,
}
