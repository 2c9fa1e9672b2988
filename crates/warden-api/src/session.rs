//! Session extractor: reads the acting [`Actor`] from request headers.
//!
//! Warden does not authenticate. The caller (a front end or the `warden`
//! CLI) supplies the session on every request and the handlers take it at
//! face value.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use uuid::Uuid;
use warden_core::session::{Actor, Role, header};

use crate::error::ApiError;

/// The validated session of the current request.
#[derive(Debug, Clone)]
pub struct Session(pub Actor);

impl Session {
  /// Reject the request unless the actor is a guardian.
  pub fn require_guardian(&self) -> Result<&Actor, ApiError> {
    if self.0.is_guardian() {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden(format!(
        "only guardians may do this, not role {}",
        self.0.role
      )))
    }
  }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
  headers
    .get(name)
    .map(|v| {
      v.to_str()
        .map(str::trim)
        .map_err(|_| ApiError::BadRequest(format!("header {name} is not valid text")))
    })
    .transpose()
}

fn required<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
  header_str(headers, name)?
    .filter(|v| !v.is_empty())
    .ok_or_else(|| ApiError::BadRequest(format!("missing session header {name}")))
}

fn parse_uuid(name: &str, value: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(value.trim())
    .map_err(|_| ApiError::BadRequest(format!("header {name} is not a UUID: {value:?}")))
}

/// Build an [`Actor`] from session headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let id = parse_uuid(header::ACTOR_ID, required(headers, header::ACTOR_ID)?)?;
  let name = required(headers, header::ACTOR_NAME)?;
  let role = Role::parse(required(headers, header::ACTOR_ROLE)?)?;

  let linked_guardian = header_str(headers, header::LINKED_GUARDIAN)?
    .filter(|v| !v.is_empty())
    .map(|v| parse_uuid(header::LINKED_GUARDIAN, v))
    .transpose()?;

  let linked_children = header_str(headers, header::LINKED_CHILDREN)?
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(|v| parse_uuid(header::LINKED_CHILDREN, v))
    .collect::<Result<Vec<_>, _>>()?;

  let actor = Actor {
    id,
    name: name.to_owned(),
    role,
    linked_guardian,
    linked_children,
  };
  actor.validate()?;
  Ok(actor)
}

impl<S> FromRequestParts<S> for Session
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers).map(Session)
  }
}
