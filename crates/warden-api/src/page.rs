//! Guardian dashboard: a server-rendered XHTML page.
//!
//! Uses `quick-xml`'s writer API, which escapes all text content, so child
//! queries are safe to embed verbatim.

use std::io::{self, Cursor};

use axum::{
  extract::State,
  response::{Html, Redirect},
};
use quick_xml::{
  Writer,
  events::{BytesEnd, BytesStart, BytesText, Event},
};
use warden_core::{
  log::{LogQuery, SearchLog, guardian_alerts},
  present::{HistoryEntry, NO_ALERTS, NO_SEARCHES, history_view},
  session::Actor,
};

use crate::{AppState, error::ApiError, session::Session};

type Xml = Writer<Cursor<Vec<u8>>>;

/// `GET /dashboard`, guardian only.
pub async fn dashboard<L>(
  State(state): State<AppState<L>>,
  session: Session,
) -> Result<Html<String>, ApiError>
where
  L: SearchLog + 'static,
{
  let guardian = session.require_guardian()?;
  let log = state.screener.log();

  let history = log
    .history(&LogQuery::visible_to(guardian))
    .await
    .map_err(ApiError::store)?;
  let alerts = guardian_alerts(log.as_ref(), guardian, None)
    .await
    .map_err(ApiError::store)?;

  let page = render_dashboard(guardian, &history_view(&history), &history_view(&alerts))?;
  Ok(Html(page))
}

/// `POST /dashboard/clear`, guardian only: the dashboard's "clear alerts"
/// button. Redirects back to the page.
pub async fn clear<L>(
  State(state): State<AppState<L>>,
  session: Session,
) -> Result<Redirect, ApiError>
where
  L: SearchLog + 'static,
{
  let guardian = session.require_guardian()?;
  state
    .screener
    .log()
    .clear_alerts(guardian.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Redirect::to("/dashboard"))
}

/// Render the dashboard for `guardian`. Both lists are expected newest-first.
pub fn render_dashboard(
  guardian: &Actor,
  history: &[HistoryEntry],
  alerts: &[HistoryEntry],
) -> io::Result<String> {
  let mut w = Writer::new(Cursor::new(Vec::new()));

  w.write_event(Event::DocType(BytesText::from_escaped("html")))?;
  let mut html = BytesStart::new("html");
  html.push_attribute(("xmlns", "http://www.w3.org/1999/xhtml"));
  w.write_event(Event::Start(html))?;

  write_start(&mut w, "head")?;
  let mut meta = BytesStart::new("meta");
  meta.push_attribute(("charset", "utf-8"));
  w.write_event(Event::Empty(meta))?;
  write_text_elem(&mut w, "title", &format!("Warden: {}", guardian.name))?;
  write_end(&mut w, "head")?;

  write_start(&mut w, "body")?;
  write_text_elem(&mut w, "h1", &format!("Guardian: {}", guardian.name))?;

  // Alerts
  write_section(&mut w, "alerts", "Alerts")?;
  if alerts.is_empty() {
    write_text_elem(&mut w, "p", NO_ALERTS)?;
  } else {
    write_start(&mut w, "ul")?;
    for a in alerts {
      write_start_class(&mut w, "li", "alert")?;
      write_text_elem(&mut w, "strong", &a.actor_name)?;
      write_text(&mut w, " searched for ")?;
      write_text_elem(&mut w, "em", &a.query)?;
      write_text(&mut w, " ")?;
      write_text_elem(&mut w, "small", &timestamp(a))?;
      write_end(&mut w, "li")?;
    }
    write_end(&mut w, "ul")?;
    write_clear_form(&mut w)?;
  }
  write_end(&mut w, "section")?;

  // History
  write_section(&mut w, "history", "Search history")?;
  if history.is_empty() {
    write_text_elem(&mut w, "p", NO_SEARCHES)?;
  } else {
    write_start(&mut w, "ul")?;
    for e in history {
      let class = if e.flagged { "flagged" } else { "safe" };
      write_start_class(&mut w, "li", class)?;
      write_text(&mut w, &e.summary())?;
      write_end(&mut w, "li")?;
    }
    write_end(&mut w, "ul")?;
  }
  write_end(&mut w, "section")?;

  write_end(&mut w, "body")?;
  w.write_event(Event::End(BytesEnd::new("html")))?;

  String::from_utf8(w.into_inner().into_inner())
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_clear_form(w: &mut Xml) -> io::Result<()> {
  let mut form = BytesStart::new("form");
  form.push_attribute(("method", "post"));
  form.push_attribute(("action", "/dashboard/clear"));
  w.write_event(Event::Start(form))?;
  let mut button = BytesStart::new("button");
  button.push_attribute(("type", "submit"));
  w.write_event(Event::Start(button))?;
  write_text(w, "Clear alerts")?;
  write_end(w, "button")?;
  write_end(w, "form")
}

fn timestamp(e: &HistoryEntry) -> String {
  e.recorded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

// ─── XHTML writer helpers
// ─────────────────────────────────────────────────────

fn write_start(w: &mut Xml, tag: &str) -> io::Result<()> {
  w.write_event(Event::Start(BytesStart::new(tag)))
}

fn write_start_class(w: &mut Xml, tag: &str, class: &str) -> io::Result<()> {
  let mut start = BytesStart::new(tag);
  start.push_attribute(("class", class));
  w.write_event(Event::Start(start))
}

fn write_section(w: &mut Xml, id: &str, heading: &str) -> io::Result<()> {
  let mut start = BytesStart::new("section");
  start.push_attribute(("id", id));
  w.write_event(Event::Start(start))?;
  write_text_elem(w, "h2", heading)
}

fn write_end(w: &mut Xml, tag: &str) -> io::Result<()> {
  w.write_event(Event::End(BytesEnd::new(tag)))
}

fn write_text(w: &mut Xml, text: &str) -> io::Result<()> {
  w.write_event(Event::Text(BytesText::new(text)))
}

fn write_text_elem(w: &mut Xml, tag: &str, text: &str) -> io::Result<()> {
  write_start(w, tag)?;
  write_text(w, text)?;
  write_end(w, tag)
}
