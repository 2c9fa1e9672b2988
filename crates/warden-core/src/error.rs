//! Error types for `warden-core`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read rule file {path:?}: {source}")]
  RuleFile {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("invalid session: {0}")]
  InvalidSession(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
