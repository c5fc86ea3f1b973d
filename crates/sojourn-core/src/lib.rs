//! Core types and trait definitions for the sojourn travel tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod country;
pub mod error;
pub mod member;
pub mod resolver;
pub mod session;
pub mod store;

pub use error::Error;
pub use session::{HomeView, Session};
