//! Handlers for `/files` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/files` | Every record in insertion order, with durations |
//! | `POST` | `/files` | Body: [`NewFile`]; PIN required; returns 201 + stored record |
//! | `POST` | `/files/:cms_no/return` | PIN required; `{"file": null}` when nothing was out |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use chrono::Utc;
use docket_core::{
  file::{FileRecord, NewFile},
  query::ReportRow,
};
use docket_mirror::Backend;
use serde::Serialize;

use crate::{
  AppState,
  auth::{Authenticated, Pin},
  error::ApiError,
};

/// `GET /files`
pub async fn list<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<Response, ApiError> {
  let docket = state.docket.lock().await;
  let now = Utc::now();
  let rows: Vec<ReportRow<'_>> =
    docket.store().files().iter().map(|f| ReportRow::new(f, now)).collect();
  Ok(Json(rows).into_response())
}

/// `POST /files`
pub async fn create<B: Backend>(
  _auth: Authenticated,
  Pin(pin): Pin,
  State(state): State<AppState<B>>,
  Json(form): Json<NewFile>,
) -> Result<impl IntoResponse, ApiError> {
  let record = state.docket.lock().await.enter_file(&pin, form, Utc::now())?;
  Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Serialize)]
pub struct ReturnResponse {
  pub file: Option<FileRecord>,
}

/// `POST /files/:cms_no/return`
pub async fn return_one<B: Backend>(
  _auth: Authenticated,
  Pin(pin): Pin,
  State(state): State<AppState<B>>,
  Path(cms_no): Path<String>,
) -> Result<Json<ReturnResponse>, ApiError> {
  let file = state.docket.lock().await.return_file(&pin, &cms_no, Utc::now())?;
  Ok(Json(ReturnResponse { file }))
}
