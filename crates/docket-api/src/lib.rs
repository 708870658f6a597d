//! JSON REST API for Docket.
//!
//! Exposes an axum [`Router`] over a shared [`Docket`] session. Every route
//! requires HTTP Basic auth; routes that change custody or delete profiles
//! also require the operator PIN in the `x-docket-pin` header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", docket_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod files;
pub mod profiles;
pub mod reports;
pub mod snapshots;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use docket_mirror::{Backend, Docket};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub use auth::AuthConfig;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers. Mutations are serialised by
/// the session lock.
pub struct AppState<B: Backend> {
  pub docket: Arc<Mutex<Docket<B>>>,
  pub auth:   Arc<AuthConfig>,
}

impl<B: Backend> Clone for AppState<B> {
  fn clone(&self) -> Self { Self { docket: self.docket.clone(), auth: self.auth.clone() } }
}

impl<B: Backend> AppState<B> {
  pub fn new(docket: Docket<B>, auth: AuthConfig) -> Self {
    Self { docket: Arc::new(Mutex::new(docket)), auth: Arc::new(auth) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn api_router<B: Backend>(state: AppState<B>) -> Router<()> {
  Router::new()
    // Operator
    .route("/setup", post(snapshots::setup::<B>))
    .route("/pin", post(snapshots::change_pin::<B>))
    // Files
    .route("/files", get(files::list::<B>).post(files::create::<B>))
    .route("/files/{cms_no}/return", post(files::return_one::<B>))
    // Reports
    .route("/reports/{facet}", get(reports::facet::<B>))
    .route("/reports/{facet}/csv", get(reports::facet_csv::<B>))
    .route("/search", get(reports::search::<B>))
    .route("/stats", get(reports::stats::<B>))
    // Profiles
    .route("/profiles", get(profiles::list::<B>).put(profiles::save::<B>))
    .route("/profiles/suggest", get(profiles::suggest::<B>))
    .route("/profiles/{kind}/{name}", axum::routing::delete(profiles::delete_one::<B>))
    // Snapshots and backup drive
    .route("/export", get(snapshots::export::<B>))
    .route("/import", post(snapshots::import::<B>))
    .route("/reconcile", post(snapshots::reconcile::<B>))
    .route("/backups", get(snapshots::list_backups::<B>).post(snapshots::backup::<B>))
    .route("/backups/sync", post(snapshots::sync::<B>))
    .route("/backups/{id}/restore", post(snapshots::restore::<B>))
    .route("/backups/{id}/share", post(snapshots::share::<B>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
