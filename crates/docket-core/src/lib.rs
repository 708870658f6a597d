//! Core types and the in-memory engine for the Docket case-file register.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the data model, the [`RecordStore`](record::RecordStore), the query/report
//! engine, and the snapshot formats. Persistence tiers are abstracted behind
//! the traits in [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod duration;
pub mod error;
pub mod file;
pub mod profile;
pub mod query;
pub mod queue;
pub mod record;
pub mod report_csv;
pub mod snapshot;
pub mod store;
pub mod user;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
