//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision so that they sort lexicographically. Enums use their lowercase
//! wire names. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;
use warden_core::{
  classify::VerdictKind,
  record::{AlertClearance, SearchRecord},
  session::Role,
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::UnknownEnum {
    column: "role",
    value:  s.to_owned(),
  })
}

pub fn decode_verdict(s: &str) -> Result<VerdictKind> {
  s.parse().map_err(|_| Error::UnknownEnum {
    column: "verdict",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "seq, record_id, actor_id, actor_name, role, \
                                  guardian_id, query, verdict, matched, alert, recorded_at";

/// Raw values read directly from a `search_records` row.
pub struct RawRecord {
  pub seq:         i64,
  pub record_id:   String,
  pub actor_id:    String,
  pub actor_name:  String,
  pub role:        String,
  pub guardian_id: Option<String>,
  pub query:       String,
  pub verdict:     String,
  pub matched:     Option<String>,
  pub alert:       bool,
  pub recorded_at: String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      seq:         row.get(0)?,
      record_id:   row.get(1)?,
      actor_id:    row.get(2)?,
      actor_name:  row.get(3)?,
      role:        row.get(4)?,
      guardian_id: row.get(5)?,
      query:       row.get(6)?,
      verdict:     row.get(7)?,
      matched:     row.get(8)?,
      alert:       row.get(9)?,
      recorded_at: row.get(10)?,
    })
  }

  pub fn into_record(self) -> Result<SearchRecord> {
    Ok(SearchRecord {
      seq:         self.seq,
      record_id:   decode_uuid(&self.record_id)?,
      actor_id:    decode_uuid(&self.actor_id)?,
      actor_name:  self.actor_name,
      role:        decode_role(&self.role)?,
      guardian_id: self.guardian_id.as_deref().map(decode_uuid).transpose()?,
      query:       self.query,
      verdict:     decode_verdict(&self.verdict)?,
      matched:     self.matched,
      alert:       self.alert,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read from an `alert_clearances` row.
pub struct RawClearance {
  pub guardian_id: String,
  pub through_seq: i64,
  pub cleared_at:  String,
}

impl RawClearance {
  pub fn into_clearance(self) -> Result<AlertClearance> {
    Ok(AlertClearance {
      guardian_id: decode_uuid(&self.guardian_id)?,
      through_seq: self.through_seq,
      cleared_at:  decode_dt(&self.cleared_at)?,
    })
  }
}
