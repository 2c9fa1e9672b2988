//! SQLite backend for the Warden search log.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a single dedicated
//! thread without blocking the async runtime. That thread is the log's one
//! writer: appends and their retention prune never interleave.

mod encode;
mod log;
mod schema;

pub mod error;

pub use error::{Error, Result};
pub use log::SqliteLog;
