//! Session context — who is acting and in which role.
//!
//! A session is an explicit value handed to every screening, recording and
//! rendering call. Nothing in the workspace keeps an ambient "current user".

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Request header names carrying a session over HTTP.
pub mod header {
  pub const ACTOR_ID: &str = "x-actor-id";
  pub const ACTOR_NAME: &str = "x-actor-name";
  pub const ACTOR_ROLE: &str = "x-actor-role";
  pub const LINKED_GUARDIAN: &str = "x-linked-guardian";
  /// Comma-separated UUIDs.
  pub const LINKED_CHILDREN: &str = "x-linked-children";
}

/// The role an actor plays. Decides whether flagged content is blocked or
/// merely cautioned, and who may read the search history.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Role {
  #[strum(to_string = "child")]
  Child,
  /// A parent or other supervising adult.
  #[serde(alias = "parent")]
  #[strum(to_string = "guardian", serialize = "parent")]
  Guardian,
  /// Any other account, e.g. a personal adult account.
  #[serde(alias = "personal")]
  #[strum(to_string = "other", serialize = "personal")]
  Other,
}

impl Role {
  /// Parse a role from its wire name, accepting the `parent` and `personal`
  /// aliases.
  pub fn parse(s: &str) -> Result<Self> {
    s.trim()
      .parse()
      .map_err(|_| Error::UnknownRole(s.to_owned()))
  }
}

/// The acting user for the duration of one client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:              Uuid,
  pub name:            String,
  pub role:            Role,
  /// For a child: the guardian who receives their alerts.
  #[serde(default)]
  pub linked_guardian: Option<Uuid>,
  /// For a guardian: the children whose history they may read.
  #[serde(default)]
  pub linked_children: Vec<Uuid>,
}

impl Actor {
  pub fn new(id: Uuid, name: impl Into<String>, role: Role) -> Self {
    Self {
      id,
      name: name.into(),
      role,
      linked_guardian: None,
      linked_children: Vec::new(),
    }
  }

  pub fn with_guardian(mut self, guardian: Uuid) -> Self {
    self.linked_guardian = Some(guardian);
    self
  }

  pub fn with_children(mut self, children: impl IntoIterator<Item = Uuid>) -> Self {
    self.linked_children.extend(children);
    self
  }

  pub fn is_guardian(&self) -> bool { self.role == Role::Guardian }

  /// Reject sessions that cannot be acted on.
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::InvalidSession("actor name is empty".into()));
    }
    if self.linked_children.contains(&self.id) {
      return Err(Error::InvalidSession(
        "an actor cannot supervise itself".into(),
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_aliases_parse() {
    assert_eq!(Role::parse("child").unwrap(), Role::Child);
    assert_eq!(Role::parse("Parent").unwrap(), Role::Guardian);
    assert_eq!(Role::parse(" guardian ").unwrap(), Role::Guardian);
    assert_eq!(Role::parse("personal").unwrap(), Role::Other);
    assert!(matches!(Role::parse("admin"), Err(Error::UnknownRole(_))));
  }

  #[test]
  fn role_display_uses_canonical_name() {
    assert_eq!(Role::Guardian.to_string(), "guardian");
    assert_eq!(Role::Other.as_ref(), "other");
  }

  #[test]
  fn role_serde_accepts_original_names() {
    let r: Role = serde_json::from_str("\"parent\"").unwrap();
    assert_eq!(r, Role::Guardian);
    let r: Role = serde_json::from_str("\"personal\"").unwrap();
    assert_eq!(r, Role::Other);
    assert_eq!(serde_json::to_string(&Role::Child).unwrap(), "\"child\"");
  }

  #[test]
  fn self_supervision_is_invalid() {
    let id = Uuid::new_v4();
    let actor = Actor::new(id, "Sam", Role::Guardian).with_children([id]);
    assert!(matches!(actor.validate(), Err(Error::InvalidSession(_))));
  }

  #[test]
  fn blank_name_is_invalid() {
    let actor = Actor::new(Uuid::new_v4(), "  ", Role::Child);
    assert!(actor.validate().is_err());
  }
}
