//! Reply bodies sent back to the submitter.
//!
//! These are the wire shapes of `POST /api/search` and `POST /api/chat`,
//! shared by the server and the `warden` client. A blocked submission is
//! never echoed: its query text and record body stay on the server.

use serde::{Deserialize, Serialize};

use crate::{
  classify::{Verdict, VerdictKind},
  present::ChatMessage,
  record::SearchRecord,
  screen::{Screened, Submission},
};

/// Reply of `POST /api/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchReply {
  Empty { message: ChatMessage },
  Screened(ScreenedReply),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenedReply {
  pub verdict:   Verdict,
  pub message:   ChatMessage,
  /// Withheld when blocked.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub query:     Option<String>,
  /// Withheld when blocked.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub record:    Option<SearchRecord>,
  /// Log position of the audit record, when it was written.
  pub seq:       Option<i64>,
  pub log_error: Option<String>,
}

impl From<Screened> for ScreenedReply {
  fn from(s: Screened) -> Self {
    let seq = s.record.as_ref().map(|r| r.seq);
    let (query, record) = if s.verdict.kind == VerdictKind::Blocked {
      (None, None)
    } else {
      (Some(s.query), s.record)
    };
    Self {
      verdict: s.verdict,
      message: s.message,
      query,
      record,
      seq,
      log_error: s.log_error,
    }
  }
}

impl From<Submission> for SearchReply {
  fn from(sub: Submission) -> Self {
    match sub {
      Submission::Empty { message } => Self::Empty { message },
      Submission::Screened(s) => Self::Screened(s.into()),
    }
  }
}

/// Outcome of `POST /api/chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatStatus {
  Empty,
  Blocked,
  Answered,
  RelayFailed,
}

/// Reply of `POST /api/chat`. Also the body of its 502 and 503 answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
  pub status:      ChatStatus,
  pub message:     ChatMessage,
  pub verdict:     Option<Verdict>,
  /// The upstream assistant's answer.
  pub response:    Option<String>,
  pub relay_error: Option<String>,
  pub log_error:   Option<String>,
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::{
    classify::classify,
    present::chat_message,
    rules::RuleSet,
    session::Role,
  };

  fn screened(query: &str, role: Role) -> Screened {
    let verdict = classify(query, &RuleSet::builtin(), role);
    Screened {
      query: query.into(),
      message: chat_message(&verdict, role, query),
      record: Some(SearchRecord {
        seq: 7,
        record_id: Uuid::new_v4(),
        actor_id: Uuid::new_v4(),
        actor_name: "Kim".into(),
        role,
        guardian_id: None,
        query: query.into(),
        verdict: verdict.kind,
        matched: verdict.matched.clone(),
        alert: verdict.is_flagged(),
        recorded_at: Utc::now(),
      }),
      verdict,
      log_error: None,
    }
  }

  #[test]
  fn blocked_reply_does_not_echo_the_query() {
    let reply = SearchReply::from(Submission::Screened(screened(
      "where to buy a weapon",
      Role::Child,
    )));
    let json = serde_json::to_string(&reply).unwrap();
    assert!(!json.contains("where to buy"), "{json}");
    assert!(json.contains(r#""seq":7"#));
    assert!(json.contains(r#""status":"screened""#));
  }

  #[test]
  fn cautioned_reply_keeps_query_and_record() {
    let reply = ScreenedReply::from(screened("where to buy a weapon", Role::Guardian));
    assert_eq!(reply.verdict.kind, VerdictKind::Cautioned);
    assert_eq!(reply.query.as_deref(), Some("where to buy a weapon"));
    assert!(reply.record.unwrap().alert);
    assert_eq!(reply.seq, Some(7));
  }

  #[test]
  fn reply_deserialises_without_withheld_fields() {
    let json = r#"{
      "status": "screened",
      "verdict": { "kind": "blocked", "matched": "weapon", "explanation": "blocked" },
      "message": { "tone": "blocked", "text": "Content blocked." },
      "seq": 3,
      "log_error": null
    }"#;
    let SearchReply::Screened(r) = serde_json::from_str(json).unwrap() else {
      panic!("expected screened");
    };
    assert!(r.query.is_none());
    assert!(r.record.is_none());
    assert_eq!(r.seq, Some(3));
  }
}
