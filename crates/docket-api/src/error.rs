//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use docket_core::Error as CoreError;
use docket_mirror::Error as DocketError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or wrong login; answered with a Basic challenge for `realm`.
  #[error("unauthorized")]
  Unauthorized { realm: String },

  /// A PIN-gated route was called without the `x-docket-pin` header.
  #[error("missing PIN")]
  MissingPin,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Docket(#[from] DocketError),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self { Self::Docket(e.into()) }
}

fn core_status(e: &CoreError) -> StatusCode {
  match e {
    CoreError::MissingField(_)
    | CoreError::Invalid(_)
    | CoreError::Format(_) => StatusCode::BAD_REQUEST,
    CoreError::UnknownProfile { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    CoreError::IncorrectPin | CoreError::IdentityMismatch => StatusCode::FORBIDDEN,
    CoreError::NoUserProfile | CoreError::AlreadyRegistered => StatusCode::CONFLICT,
    CoreError::Serialization(_) | CoreError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
      ApiError::MissingPin => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Docket(e) => match e {
        DocketError::Core(core) => core_status(core),
        DocketError::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
        DocketError::SnapshotNotFound(_) => StatusCode::NOT_FOUND,
        DocketError::Drive(_) => StatusCode::BAD_GATEWAY,
        DocketError::ReplicaUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        DocketError::Io(_) | DocketError::Json(_) | DocketError::Replica(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if let ApiError::Unauthorized { realm } = &self {
      let challenge = format!("Basic realm=\"{}\", charset=\"UTF-8\"", realm.replace('"', "'"));
      match HeaderValue::from_str(&challenge) {
        Ok(value) => {
          res.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        Err(e) => tracing::warn!(%realm, error = %e, "realm is not a valid header value"),
      }
    }
    res
  }
}
