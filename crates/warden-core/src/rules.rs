//! Unsafe-keyword rule source.
//!
//! Rules come either from the built-in list or from a rule file made of
//! records like:
//!
//! ```text
//! (unsafe "violence")
//! (unsafe "weapon")
//! ```
//!
//! Parsing is line-oriented. Lines that are not a single well-formed record
//! (comments, blank lines, stray text, embedded quotes) are skipped.

use std::{collections::HashSet, path::Path};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Keywords used when no rule file is configured.
pub const BUILTIN_KEYWORDS: &[&str] = &[
  "violence", "fight", "kill", "blood", "sex", "drugs", "hate", "weapon",
];

/// What to do when the rule file is unreadable or has no valid records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFallback {
  /// Continue with an empty rule set: nothing is flagged.
  #[default]
  Open,
  /// Flag every query until a rule file can be loaded.
  Closed,
}

impl RuleFallback {
  /// The rule set to run with when no usable rule file is available.
  pub fn rules(self) -> RuleSet {
    match self {
      Self::Open => RuleSet::default(),
      Self::Closed => RuleSet::block_all(),
    }
  }
}

/// An ordered, deduplicated set of lowercase keywords.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
  keywords:  Vec<String>,
  block_all: bool,
}

impl RuleSet {
  /// The built-in keyword list.
  pub fn builtin() -> Self { Self::from_keywords(BUILTIN_KEYWORDS.iter().copied()) }

  /// A set that flags every query. Produced by [`RuleFallback::Closed`].
  pub fn block_all() -> Self {
    Self {
      keywords:  Vec::new(),
      block_all: true,
    }
  }

  /// Build a set from arbitrary keywords: trimmed, lowercased, empty entries
  /// dropped, first occurrence kept on duplicates.
  pub fn from_keywords<I, S>(keywords: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    Self::collect(keywords.into_iter().map(|k| k.as_ref().trim().to_lowercase()))
  }

  /// Lowercased, deduplicated, blank entries dropped. Surrounding spaces are
  /// kept: `" sex "` only matches the word on its own.
  fn collect(keywords: impl Iterator<Item = String>) -> Self {
    let mut seen = HashSet::new();
    let keywords = keywords
      .filter(|k| !k.trim().is_empty())
      .filter(|k| seen.insert(k.clone()))
      .collect();
    Self {
      keywords,
      block_all: false,
    }
  }

  pub fn keywords(&self) -> &[String] { &self.keywords }

  pub fn blocks_all(&self) -> bool { self.block_all }

  pub fn len(&self) -> usize { self.keywords.len() }

  pub fn is_empty(&self) -> bool { self.keywords.is_empty() && !self.block_all }

  /// First keyword, in set order, contained in `lowered`.
  ///
  /// `lowered` must already be lowercase.
  pub fn first_match(&self, lowered: &str) -> Option<&str> {
    self
      .keywords
      .iter()
      .find(|k| lowered.contains(k.as_str()))
      .map(String::as_str)
  }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse rule-file text. Never fails; malformed lines are skipped.
///
/// Keyword text is taken verbatim apart from lowercasing.
pub fn parse_rules(text: &str) -> RuleSet {
  RuleSet::collect(
    text
      .lines()
      .filter_map(parse_rule_line)
      .map(str::to_lowercase),
  )
}

/// Parse one `(unsafe "<text>")` record. Returns the raw keyword text.
fn parse_rule_line(line: &str) -> Option<&str> {
  let body = line
    .trim()
    .strip_prefix('(')?
    .strip_suffix(')')?
    .trim();
  let rest = body.strip_prefix("unsafe")?;
  // Require a separator so `(unsafeword "x")` does not parse.
  if !rest.starts_with(char::is_whitespace) {
    return None;
  }
  let quoted = rest.trim();
  let text = quoted.strip_prefix('"')?.strip_suffix('"')?;
  if text.contains('"') {
    return None;
  }
  Some(text)
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Read and parse a rule file, surfacing I/O failures.
pub fn read_rules(path: &Path) -> Result<RuleSet> {
  let text = std::fs::read_to_string(path).map_err(|source| Error::RuleFile {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(parse_rules(&text))
}

/// Load a rule file, degrading according to `fallback` when it is missing,
/// unreadable, or holds no valid records.
pub fn load_rules(path: &Path, fallback: RuleFallback) -> RuleSet {
  match read_rules(path) {
    Ok(rules) if !rules.is_empty() => {
      info!(path = %path.display(), count = rules.len(), "loaded rule file");
      rules
    }
    Ok(_) => {
      warn!(path = %path.display(), ?fallback, "rule file contains no unsafe records");
      fallback.rules()
    }
    Err(e) => {
      warn!(error = %e, ?fallback, "rule file unavailable");
      fallback.rules()
    }
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;
  use crate::{
    classify::{VerdictKind, classify},
    session::Role,
  };

  #[test]
  fn parses_records_and_skips_noise() {
    let text = r#"
; unsafe keyword list
(unsafe "Violence")
  ( unsafe   "weapon" )
(unsafe weapon)
(unsafe "a"b")
(safe "puppies")
(unsafeword "x")
(unsafe "")
random text
(unsafe "violence")
"#;
    let rules = parse_rules(text);
    assert_eq!(rules.keywords(), &["violence", "weapon"]);
  }

  #[test]
  fn multi_word_keywords_are_kept_whole() {
    let rules = parse_rules("(unsafe \"self harm\")");
    assert_eq!(rules.keywords(), &["self harm"]);
  }

  #[test]
  fn builtin_list_is_normalised() {
    let rules = RuleSet::builtin();
    assert_eq!(rules.len(), BUILTIN_KEYWORDS.len());
    assert!(rules.keywords().iter().all(|k| k == &k.to_lowercase()));
  }

  #[test]
  fn from_keywords_dedups_in_order() {
    let rules = RuleSet::from_keywords(["Kill", " blood ", "kill", "", "BLOOD"]);
    assert_eq!(rules.keywords(), &["kill", "blood"]);
  }

  #[test]
  fn loading_twice_yields_equal_sets() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "(unsafe \"drugs\")\n(unsafe \"hate\")").unwrap();

    let a = load_rules(file.path(), RuleFallback::Open);
    let b = load_rules(file.path(), RuleFallback::Open);
    assert_eq!(a, b);
    assert_eq!(a.keywords(), &["drugs", "hate"]);
  }

  #[test]
  fn missing_file_fails_open_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let rules = load_rules(&dir.path().join("absent.metta"), RuleFallback::default());
    assert!(rules.is_empty());
    assert!(!rules.blocks_all());
  }

  #[test]
  fn missing_file_can_fail_closed() {
    let dir = tempfile::tempdir().unwrap();
    let rules = load_rules(&dir.path().join("absent.metta"), RuleFallback::Closed);
    assert!(rules.blocks_all());
    assert!(!rules.is_empty());
  }

  #[test]
  fn malformed_file_follows_fallback() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "unsafe violence\n(unsafe 'weapon')").unwrap();

    let open = load_rules(file.path(), RuleFallback::Open);
    assert!(open.is_empty());

    let closed = load_rules(file.path(), RuleFallback::Closed);
    assert!(closed.blocks_all());
    let verdict = classify("violence and weapons", &closed, Role::Child);
    assert_eq!(verdict.kind, VerdictKind::Blocked);
  }

  #[test]
  fn padded_keywords_keep_their_spaces() {
    let rules = parse_rules("(unsafe \" Sex \")\n(unsafe \"   \")\n(unsafe \" sex \")");
    assert_eq!(rules.keywords(), &[" sex "]);
    assert_eq!(rules.first_match("history of sussex county"), None);
    assert_eq!(rules.first_match("what is sex ed"), Some(" sex "));
  }

  #[test]
  fn unreadable_file_is_an_error_for_read_rules() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_rules(&dir.path().join("absent.metta")).unwrap_err();
    assert!(matches!(err, Error::RuleFile { .. }));
  }

  #[test]
  fn first_match_follows_set_order() {
    let rules = RuleSet::from_keywords(["blood", "fight"]);
    assert_eq!(rules.first_match("a fight with blood"), Some("blood"));
    assert_eq!(rules.first_match("octopuses"), None);
  }
}
