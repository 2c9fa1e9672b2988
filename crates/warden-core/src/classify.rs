//! Keyword classifier and role gating.
//!
//! Classification is case-insensitive substring containment against a
//! [`RuleSet`]. There is no scoring: the first keyword in rule-set order that
//! appears in the query is the one reported.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{rules::RuleSet, session::Role};

/// Outcome category of a classification.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerdictKind {
  Safe,
  /// Flagged content submitted by a child; refused outright.
  Blocked,
  /// Flagged content submitted by anyone else; shown with a warning.
  Cautioned,
}

impl VerdictKind {
  pub fn is_flagged(self) -> bool { self != Self::Safe }
}

/// The result of classifying one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
  pub kind:        VerdictKind,
  /// The keyword that triggered the flag, if a keyword did.
  pub matched:     Option<String>,
  pub explanation: String,
}

impl Verdict {
  pub fn is_flagged(&self) -> bool { self.kind.is_flagged() }
}

/// Trim raw input. `None` means there is nothing to classify.
pub fn normalize_query(raw: &str) -> Option<&str> {
  let q = raw.trim();
  (!q.is_empty()).then_some(q)
}

/// Classify `query` for an actor in `role`.
///
/// Pure and deterministic. `query` is expected to be trimmed and non-empty;
/// see [`normalize_query`].
pub fn classify(query: &str, rules: &RuleSet, role: Role) -> Verdict {
  let lowered = query.to_lowercase();

  let matched = if rules.blocks_all() {
    None
  } else {
    match rules.first_match(&lowered) {
      Some(k) => Some(k.to_owned()),
      None => {
        return Verdict {
          kind:        VerdictKind::Safe,
          matched:     None,
          explanation: "No unsafe content was detected.".into(),
        };
      }
    }
  };

  match role {
    Role::Child => Verdict {
      kind:        VerdictKind::Blocked,
      explanation: if matched.is_some() {
        "This search was blocked because it may contain unsafe content.".into()
      } else {
        "This search was blocked because the safety rules are unavailable."
          .into()
      },
      matched,
    },
    Role::Guardian | Role::Other => Verdict {
      kind:        VerdictKind::Cautioned,
      explanation: match &matched {
        Some(k) => format!("This search mentions {k:?}, which may be unsafe."),
        None => "The safety rules are unavailable; treat this search with care."
          .into(),
      },
      matched,
    },
  }
}
