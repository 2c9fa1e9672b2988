//! Role-aware presentation: verdicts to chat messages, records to history
//! entries. Formatting only; verdicts are taken as given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  classify::{Verdict, VerdictKind},
  record::SearchRecord,
  session::Role,
};

pub const EMPTY_QUERY_PROMPT: &str = "Please enter a search term.";
pub const NO_ALERTS: &str = "No flagged activity. All clear!";
pub const NO_SEARCHES: &str = "No searches yet.";

/// Visual tone of a chat bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
  Prompt,
  Safe,
  Caution,
  Blocked,
  Error,
}

/// A bot message shown in the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub tone: Tone,
  pub text: String,
}

impl ChatMessage {
  pub fn empty_prompt() -> Self {
    Self {
      tone: Tone::Prompt,
      text: EMPTY_QUERY_PROMPT.into(),
    }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self {
      tone: Tone::Error,
      text: text.into(),
    }
  }
}

/// Render the bot reply for a classified query.
///
/// Blocked replies never repeat the query.
pub fn chat_message(verdict: &Verdict, role: Role, query: &str) -> ChatMessage {
  match verdict.kind {
    VerdictKind::Blocked => {
      let mut text = String::from("Content blocked. This search may be unsafe.");
      if role == Role::Child {
        text.push_str(" Please try a different query.");
      }
      ChatMessage {
        tone: Tone::Blocked,
        text,
      }
    }
    VerdictKind::Cautioned => ChatMessage {
      tone: Tone::Caution,
      text: format!("Caution: {} Showing results for: {query}", verdict.explanation),
    },
    VerdictKind::Safe => ChatMessage {
      tone: Tone::Safe,
      text: format!("Safe content found for: {query}"),
    },
  }
}

/// One row of the guardian's history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub seq:         i64,
  pub actor_id:    Uuid,
  pub actor_name:  String,
  pub query:       String,
  pub verdict:     VerdictKind,
  pub flagged:     bool,
  pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
  /// `"<name> searched for: "<query>" at <time>"`
  pub fn summary(&self) -> String {
    format!(
      "{} searched for: \"{}\" at {}",
      self.actor_name,
      self.query,
      self.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
  }
}

impl From<&SearchRecord> for HistoryEntry {
  fn from(r: &SearchRecord) -> Self {
    Self {
      seq:         r.seq,
      actor_id:    r.actor_id,
      actor_name:  r.actor_name.clone(),
      query:       r.query.clone(),
      verdict:     r.verdict,
      flagged:     r.alert,
      recorded_at: r.recorded_at,
    }
  }
}

/// Order records newest-first for display.
pub fn history_view(records: &[SearchRecord]) -> Vec<HistoryEntry> {
  let mut entries: Vec<HistoryEntry> = records.iter().map(HistoryEntry::from).collect();
  entries.sort_by(|a, b| b.seq.cmp(&a.seq));
  entries
}
