//! Error type for `docket-mirror`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] docket_core::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The primary store would grow past its byte quota.
  #[error("storage quota exceeded: {needed} bytes needed, quota is {quota}")]
  QuotaExceeded { needed: u64, quota: u64 },

  #[error("replica error: {0}")]
  Replica(String),

  /// The replica tier was never opened for this session.
  #[error("replica store is unavailable")]
  ReplicaUnavailable,

  #[error("backup drive error: {0}")]
  Drive(String),

  #[error("snapshot not found on drive: {0}")]
  SnapshotNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
