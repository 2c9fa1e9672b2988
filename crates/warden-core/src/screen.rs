//! The screen → record → render pipeline for one submission.

use std::sync::Arc;

use tracing::{error, info};

use crate::{
  classify::{Verdict, classify, normalize_query},
  log::SearchLog,
  present::{ChatMessage, chat_message},
  record::{NewSearchRecord, SearchRecord},
  rules::RuleSet,
  session::{Actor, Role},
};

/// Result of a successful screening.
#[derive(Debug, Clone)]
pub struct Screened {
  pub query:     String,
  pub verdict:   Verdict,
  pub message:   ChatMessage,
  /// The audit record, absent when the log write failed.
  pub record:    Option<SearchRecord>,
  /// Why the audit record could not be written.
  pub log_error: Option<String>,
}

/// What happened to a submission.
///
/// Sent over the wire as a [`SearchReply`](crate::reply::SearchReply).
#[derive(Debug, Clone)]
pub enum Submission {
  /// Nothing to classify; the user is prompted for input. Not logged.
  Empty { message: ChatMessage },
  Screened(Screened),
}

/// Classifies submissions and writes them to the audit log.
///
/// Cheap to clone; the rule set and log are shared.
pub struct Screener<L> {
  rules: Arc<RuleSet>,
  log:   Arc<L>,
}

impl<L> Clone for Screener<L> {
  fn clone(&self) -> Self {
    Self {
      rules: self.rules.clone(),
      log:   self.log.clone(),
    }
  }
}

impl<L: SearchLog> Screener<L> {
  pub fn new(rules: Arc<RuleSet>, log: Arc<L>) -> Self { Self { rules, log } }

  pub fn rules(&self) -> &RuleSet { &self.rules }

  pub fn log(&self) -> &Arc<L> { &self.log }

  /// Screen `raw` on behalf of `actor`.
  ///
  /// Every non-empty query is recorded whatever its verdict. A failed log
  /// write is reported in [`Screened::log_error`] and does not withhold the
  /// verdict.
  pub async fn submit(&self, actor: &Actor, raw: &str) -> Submission {
    let Some(query) = normalize_query(raw) else {
      return Submission::Empty {
        message: ChatMessage::empty_prompt(),
      };
    };

    let verdict = classify(query, &self.rules, actor.role);
    if verdict.is_flagged() {
      // A child's query text stays out of the server log.
      let matched = if actor.role == Role::Child { None } else { verdict.matched.as_deref() };
      info!(actor = %actor.id, verdict = %verdict.kind, ?matched, "query flagged");
    }

    let (record, log_error) =
      match self.log.append(NewSearchRecord::new(actor, query, &verdict)).await {
        Ok(record) => (Some(record), None),
        Err(e) => {
          error!(actor = %actor.id, error = %e, "failed to record search");
          (None, Some(e.to_string()))
        }
      };

    Submission::Screened(Screened {
      query: query.to_owned(),
      message: chat_message(&verdict, actor.role, query),
      verdict,
      record,
      log_error,
    })
  }
}
