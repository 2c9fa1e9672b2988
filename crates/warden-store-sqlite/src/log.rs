//! [`SqliteLog`] — the SQLite implementation of [`SearchLog`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::debug;
use uuid::Uuid;
use warden_core::{
  log::{DEFAULT_RETENTION, LogQuery, SearchLog},
  record::{AlertClearance, NewSearchRecord, SearchRecord},
};

use crate::{
  Error, Result,
  encode::{RECORD_COLUMNS, RawClearance, RawRecord, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Warden search log backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and every
/// clone funnels into the same connection thread.
#[derive(Clone)]
pub struct SqliteLog {
  conn:      tokio_rusqlite::Connection,
  retention: usize,
}

impl SqliteLog {
  /// Open (or create) a log at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let log = Self {
      conn,
      retention: DEFAULT_RETENTION,
    };
    log.init_schema().await?;
    Ok(log)
  }

  /// Open an in-memory log, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let log = Self {
      conn,
      retention: DEFAULT_RETENTION,
    };
    log.init_schema().await?;
    Ok(log)
  }

  /// Keep at most `retention` records. Takes effect on the next append.
  pub fn with_retention(mut self, retention: usize) -> Result<Self> {
    if retention == 0 {
      return Err(Error::ZeroRetention);
    }
    self.retention = retention;
    Ok(self)
  }

  pub fn retention(&self) -> usize { self.retention }

  #[cfg(test)]
  pub(crate) async fn clearance_rows(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM alert_clearances", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n as usize)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SearchLog impl ──────────────────────────────────────────────────────────

impl SearchLog for SqliteLog {
  type Error = Error;

  async fn append(&self, input: NewSearchRecord) -> Result<SearchRecord> {
    let record_id   = Uuid::new_v4();
    // Match the stored precision so the returned record equals a re-read.
    let recorded_at = Utc::now().trunc_subsecs(6);
    let alert       = input.alert();

    let record_id_str   = encode_uuid(record_id);
    let actor_id_str    = encode_uuid(input.actor_id);
    let guardian_id_str = input.guardian_id.map(encode_uuid);
    let role_str        = input.role.as_ref().to_owned();
    let verdict_str     = input.verdict.as_ref().to_owned();
    let at_str          = encode_dt(recorded_at);
    let actor_name      = input.actor_name.clone();
    let query           = input.query.clone();
    let matched         = input.matched.clone();
    let keep            = self.retention as i64;

    let (seq, pruned) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO search_records (
             record_id, actor_id, actor_name, role, guardian_id,
             query, verdict, matched, alert, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            record_id_str,
            actor_id_str,
            actor_name,
            role_str,
            guardian_id_str,
            query,
            verdict_str,
            matched,
            alert,
            at_str,
          ],
        )?;
        let seq = tx.last_insert_rowid();
        let pruned = tx.execute(
          "DELETE FROM search_records
           WHERE seq NOT IN (
             SELECT seq FROM search_records ORDER BY seq DESC LIMIT ?1
           )",
          rusqlite::params![keep],
        )?;
        tx.commit()?;
        Ok((seq, pruned))
      })
      .await?;

    if pruned > 0 {
      debug!(pruned, retention = self.retention, "pruned search log");
    }

    Ok(SearchRecord {
      seq,
      record_id,
      actor_id: input.actor_id,
      actor_name: input.actor_name,
      role: input.role,
      guardian_id: input.guardian_id,
      query: input.query,
      verdict: input.verdict,
      matched: input.matched,
      alert,
      recorded_at,
    })
  }

  async fn history(&self, query: &LogQuery) -> Result<Vec<SearchRecord>> {
    // Build WHERE clause and positional parameters together.
    let mut conds: Vec<String> = vec![];
    let mut params: Vec<Value> = vec![];

    if !query.is_unscoped() {
      let mut scope: Vec<String> = vec![];
      if !query.actor_ids.is_empty() {
        let marks = vec!["?"; query.actor_ids.len()].join(", ");
        scope.push(format!("actor_id IN ({marks})"));
        params.extend(query.actor_ids.iter().map(|id| Value::Text(encode_uuid(*id))));
      }
      if let Some(g) = query.guardian_id {
        scope.push("guardian_id = ?".into());
        params.push(Value::Text(encode_uuid(g)));
      }
      conds.push(format!("({})", scope.join(" OR ")));
    }
    if query.alerts_only {
      conds.push("alert = 1".into());
    }
    if let Some(seq) = query.after_seq {
      conds.push("seq > ?".into());
      params.push(Value::Integer(seq));
    }
    if let Some(after) = query.recorded_after {
      conds.push("recorded_at > ?".into());
      params.push(Value::Text(encode_dt(after)));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    params.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));

    let sql = format!(
      "SELECT {RECORD_COLUMNS} FROM search_records
       {where_clause}
       ORDER BY seq DESC
       LIMIT ?"
    );

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn clear_alerts(&self, guardian_id: Uuid) -> Result<AlertClearance> {
    let cleared_at = Utc::now().trunc_subsecs(6);
    let id_str     = encode_uuid(guardian_id);
    let at_str     = encode_dt(cleared_at);

    let through_seq: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let through: i64 = tx.query_row(
          "SELECT COALESCE(MAX(seq), 0) FROM search_records",
          [],
          |r| r.get(0),
        )?;
        // Only the newest mark per guardian is ever read.
        tx.execute(
          "DELETE FROM alert_clearances WHERE guardian_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "INSERT INTO alert_clearances (guardian_id, through_seq, cleared_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, through, at_str],
        )?;
        tx.commit()?;
        Ok(through)
      })
      .await?;

    Ok(AlertClearance {
      guardian_id,
      through_seq,
      cleared_at,
    })
  }

  async fn last_clearance(&self, guardian_id: Uuid) -> Result<Option<AlertClearance>> {
    let id_str = encode_uuid(guardian_id);

    let raw: Option<RawClearance> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT guardian_id, through_seq, cleared_at FROM alert_clearances
               WHERE guardian_id = ?1
               ORDER BY clearance_id DESC
               LIMIT 1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawClearance {
                  guardian_id: row.get(0)?,
                  through_seq: row.get(1)?,
                  cleared_at:  row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawClearance::into_clearance).transpose()
  }

  async fn count(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM search_records", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n as usize)
  }
}
