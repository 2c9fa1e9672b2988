//! SQL schema for the Warden SQLite log.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Append-only audit log. Rows are never updated; the only DELETE is the
-- retention prune issued in the same transaction as each INSERT.
CREATE TABLE IF NOT EXISTS search_records (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id    TEXT NOT NULL UNIQUE,
    actor_id     TEXT NOT NULL,
    actor_name   TEXT NOT NULL,
    role         TEXT NOT NULL,   -- 'child' | 'guardian' | 'other'
    guardian_id  TEXT,
    query        TEXT NOT NULL,
    verdict      TEXT NOT NULL,   -- 'safe' | 'blocked' | 'cautioned'
    matched      TEXT,
    alert        INTEGER NOT NULL CHECK (alert IN (0, 1)),
    recorded_at  TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- A guardian's bulk \"clear alerts\" marks; the latest one wins.
CREATE TABLE IF NOT EXISTS alert_clearances (
    clearance_id INTEGER PRIMARY KEY AUTOINCREMENT,
    guardian_id  TEXT NOT NULL,
    through_seq  INTEGER NOT NULL,
    cleared_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS records_actor_idx    ON search_records(actor_id);
CREATE INDEX IF NOT EXISTS records_guardian_idx ON search_records(guardian_id);
CREATE INDEX IF NOT EXISTS clearances_guardian_idx ON alert_clearances(guardian_id);

PRAGMA user_version = 1;
";
