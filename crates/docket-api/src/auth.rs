//! Request guards: the clerk's Basic-auth login and the operator PIN.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use docket_mirror::Backend;

use crate::{AppState, error::ApiError};

/// Header carrying the operator PIN on gated routes.
pub const PIN_HEADER: &str = "x-docket-pin";

/// Realm announced in the 401 challenge when none is configured.
pub const DEFAULT_REALM: &str = "docket";

/// The one login this server accepts.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// argon2 PHC string, as printed by `docket hash-password`.
  pub password_hash: String,
  pub realm:         String,
}

impl AuthConfig {
  pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
    Self {
      username:      username.into(),
      password_hash: password_hash.into(),
      realm:         DEFAULT_REALM.to_owned(),
    }
  }

  pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
    self.realm = realm.into();
    self
  }

  /// The rejection for a missing or wrong login, naming this server's realm.
  pub fn challenge(&self) -> ApiError { ApiError::Unauthorized { realm: self.realm.clone() } }

  /// Accept the request only if it logs in as the configured clerk.
  pub fn verify(&self, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(login) = Login::from_headers(headers) else {
      return Err(self.challenge());
    };
    if login.username != self.username || !self.password_matches(&login.password) {
      tracing::debug!(username = %login.username, realm = %self.realm, "login refused");
      return Err(self.challenge());
    }
    Ok(())
  }

  fn password_matches(&self, password: &str) -> bool {
    // An unparsable hash refuses every password.
    PasswordHash::new(&self.password_hash)
      .is_ok_and(|hash| Argon2::default().verify_password(password.as_bytes(), &hash).is_ok())
  }
}

/// A username and password decoded from `Authorization: Basic …`.
struct Login {
  username: String,
  password: String,
}

impl Login {
  fn from_headers(headers: &HeaderMap) -> Option<Self> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
      return None;
    }
    let decoded = String::from_utf8(B64.decode(encoded.trim()).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Self { username: username.to_owned(), password: password.to_owned() })
  }
}

/// Marker extractor: the request carried the clerk's login.
pub struct Authenticated;

impl<B: Backend> FromRequestParts<AppState<B>> for Authenticated {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<B>,
  ) -> Result<Self, Self::Rejection> {
    state.auth.verify(&parts.headers)?;
    Ok(Authenticated)
  }
}

/// The operator PIN supplied with the request. Checked by the session, not
/// here.
pub struct Pin(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Pin {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(PIN_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(|pin| Pin(pin.trim().to_owned()))
      .filter(|Pin(pin)| !pin.is_empty())
      .ok_or(ApiError::MissingPin)
  }
}
