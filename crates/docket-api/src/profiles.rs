//! Handlers for `/profiles` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/profiles` | All profiles in stored order |
//! | `PUT`    | `/profiles` | Body: [`Profile`]; insert or replace by `(name, type)` |
//! | `GET`    | `/profiles/suggest?q=` | Fuzzy name suggestions |
//! | `DELETE` | `/profiles/:kind/:name` | PIN required; files are left untouched |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use docket_core::{
  profile::{Profile, ProfileType, suggest as fuzzy_suggest},
  record::Upsert,
};
use docket_mirror::Backend;
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{Authenticated, Pin},
  error::ApiError,
};

/// `GET /profiles`
pub async fn list<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<Json<Vec<Profile>>, ApiError> {
  Ok(Json(state.docket.lock().await.store().profiles().to_vec()))
}

/// `PUT /profiles`
pub async fn save<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Json(profile): Json<Profile>,
) -> Result<impl IntoResponse, ApiError> {
  let upsert = state.docket.lock().await.save_profile(profile.clone())?;
  let status = match upsert {
    Upsert::Inserted => StatusCode::CREATED,
    Upsert::Replaced => StatusCode::OK,
  };
  Ok((status, Json(profile)))
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
  #[serde(default)]
  pub q:     String,
  pub limit: Option<usize>,
}

/// `GET /profiles/suggest?q=<partial name>[&limit=n]`
pub async fn suggest<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Query(params): Query<SuggestParams>,
) -> Result<Json<Vec<Profile>>, ApiError> {
  let docket = state.docket.lock().await;
  let limit = params.limit.unwrap_or(10);
  let hits = fuzzy_suggest(docket.store().profiles(), &params.q)
    .into_iter()
    .take(limit)
    .cloned()
    .collect();
  Ok(Json(hits))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
  pub removed: usize,
}

/// `DELETE /profiles/:kind/:name`
pub async fn delete_one<B: Backend>(
  _auth: Authenticated,
  Pin(pin): Pin,
  State(state): State<AppState<B>>,
  Path((kind, name)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
  let kind: ProfileType = kind
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("unknown profile type: {kind:?}")))?;
  let removed = state.docket.lock().await.delete_profile(&pin, &name, kind)?;
  if removed == 0 {
    return Err(ApiError::NotFound(format!("no {kind} profile named {name:?}")));
  }
  Ok(Json(DeleteResponse { removed }))
}
