//! Core types and screening logic for the Warden guardian chat service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store, API and binaries depend on it; it depends on nothing of theirs.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod classify;
pub mod error;
pub mod log;
pub mod present;
pub mod record;
pub mod reply;
pub mod rules;
pub mod screen;
pub mod session;

pub use error::{Error, Result};
