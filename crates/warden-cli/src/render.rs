//! Plain-text rendering of API results for the terminal.

use warden_core::{
  present::history_view,
  record::{AlertClearance, SearchRecord},
  reply::{ChatReply, SearchReply},
};

pub fn submission(reply: &SearchReply) -> String {
  match reply {
    SearchReply::Empty { message } => message.text.clone(),
    SearchReply::Screened(s) => match &s.log_error {
      Some(e) => format!("{}\n(warning: this search was not recorded: {e})", s.message.text),
      None => s.message.text.clone(),
    },
  }
}

pub fn chat_reply(reply: &ChatReply) -> String {
  let mut out = reply.message.text.clone();
  if let Some(response) = &reply.response {
    out.push_str("\n\n");
    out.push_str(response);
  }
  if let Some(e) = &reply.relay_error {
    out.push_str(&format!("\n({e})"));
  }
  if let Some(e) = &reply.log_error {
    out.push_str(&format!("\n(warning: this prompt was not recorded: {e})"));
  }
  out
}

/// One line per record, newest first; flagged lines start with `!`.
pub fn records(records: &[SearchRecord], empty: &str) -> String {
  if records.is_empty() {
    return empty.to_string();
  }
  history_view(records)
    .iter()
    .map(|e| {
      let mark = if e.flagged { '!' } else { ' ' };
      format!("{mark} {}", e.summary())
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn clearance(c: &AlertClearance) -> String {
  format!(
    "Alerts cleared through #{} at {}",
    c.through_seq,
    c.cleared_at.format("%Y-%m-%d %H:%M:%S UTC")
  )
}
