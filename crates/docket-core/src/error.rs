//! Error types for `docket-core`.

use thiserror::Error;

use crate::profile::ProfileType;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("invalid value: {0}")]
  Invalid(String),

  #[error("no {kind} profile named {name:?}; create the profile first")]
  UnknownProfile { name: String, kind: ProfileType },

  #[error("no user profile has been set up")]
  NoUserProfile,

  #[error("a user profile is already set up")]
  AlreadyRegistered,

  #[error("incorrect PIN")]
  IncorrectPin,

  #[error("neither the CNIC nor the email matches the user profile")]
  IdentityMismatch,

  /// The document handed to import/restore is not a snapshot.
  #[error("invalid snapshot format: {0}")]
  Format(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
