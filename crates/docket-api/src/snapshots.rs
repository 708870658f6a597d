//! Handlers for operator setup, snapshot export/import and the backup drive.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/setup` | Body: user profile; first run only |
//! | `POST` | `/pin` | Body: `{"identity", "newPin"}`; identity is the CNIC or email |
//! | `GET`  | `/export` | Snapshot document; CNIC masked, PIN omitted |
//! | `POST` | `/import` | Body: snapshot document; replaces the register |
//! | `POST` | `/reconcile` | Overwrite the register from the replica |
//! | `GET`  | `/backups` | Snapshots on the drive |
//! | `POST` | `/backups` | Upload now, or queue while the drive is away |
//! | `POST` | `/backups/sync` | Drain the offline queue |
//! | `POST` | `/backups/:id/restore` | Replace the register with a drive snapshot |
//! | `POST` | `/backups/:id/share` | Body: `{"principal"}` |

use axum::{
  Json,
  extract::{Path, State},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use docket_core::{store::SnapshotEntry, user::UserProfile};
use docket_mirror::{Backend, BackupOutcome, DrainReport};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Operator ────────────────────────────────────────────────────────────────

/// `POST /setup`
pub async fn setup<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Json(user): Json<UserProfile>,
) -> Result<impl IntoResponse, ApiError> {
  state.docket.lock().await.register_user(user)?;
  Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePin {
  pub identity: String,
  pub new_pin:  String,
}

/// `POST /pin`
pub async fn change_pin<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Json(body): Json<ChangePin>,
) -> Result<impl IntoResponse, ApiError> {
  if body.new_pin.trim().is_empty() {
    return Err(ApiError::BadRequest("newPin must not be blank".into()));
  }
  state.docket.lock().await.change_pin(&body.identity, body.new_pin.trim())?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Export / import ─────────────────────────────────────────────────────────

/// `GET /export`
pub async fn export<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<Response, ApiError> {
  let json = state.docket.lock().await.export_json()?;
  Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

/// `POST /import`
pub async fn import<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  body: String,
) -> Result<impl IntoResponse, ApiError> {
  state.docket.lock().await.import_json(&body)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct Reconciled {
  pub restored: usize,
}

/// `POST /reconcile`
pub async fn reconcile<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<Json<Reconciled>, ApiError> {
  let restored = state.docket.lock().await.reconcile().await?;
  Ok(Json(Reconciled { restored }))
}

// ─── Backup drive ────────────────────────────────────────────────────────────

/// `GET /backups`
pub async fn list_backups<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<Json<Vec<SnapshotEntry>>, ApiError> {
  Ok(Json(state.docket.lock().await.list_backups().await?))
}

/// `POST /backups`
pub async fn backup<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = state.docket.lock().await.backup(Utc::now()).await?;
  let status = match outcome {
    BackupOutcome::Uploaded { .. } => StatusCode::CREATED,
    BackupOutcome::Queued { .. } => StatusCode::ACCEPTED,
  };
  Ok((status, Json(outcome)))
}

/// `POST /backups/sync`
pub async fn sync<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<Json<DrainReport>, ApiError> {
  Ok(Json(state.docket.lock().await.drain_offline_queue().await?))
}

/// `POST /backups/:id/restore`
pub async fn restore<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
  state.docket.lock().await.restore(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct Share {
  pub principal: String,
}

/// `POST /backups/:id/share`
pub async fn share<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Path(id): Path<String>,
  Json(body): Json<Share>,
) -> Result<impl IntoResponse, ApiError> {
  if body.principal.trim().is_empty() {
    return Err(ApiError::BadRequest("principal must not be blank".into()));
  }
  state.docket.lock().await.share_backup(&id, body.principal.trim()).await?;
  Ok(StatusCode::NO_CONTENT)
}
