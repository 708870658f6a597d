//! Layered configuration: built-in defaults, then the TOML file, then
//! `DOCKET_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use docket_mirror::kv::DEFAULT_QUOTA_BYTES;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Directory holding the synchronous store's JSON documents.
  pub data_dir:          PathBuf,
  /// SQLite replica file. Defaults to `replica.db` inside `data_dir`.
  pub replica_path:      Option<PathBuf>,
  /// Local backup drive. Backups are refused when unset.
  pub drive_dir:         Option<PathBuf>,
  pub quota_bytes:       u64,
  pub host:              String,
  pub port:              u16,
  pub api_username:      String,
  /// argon2 PHC string; `docket hash-password` prints one.
  pub api_password_hash: String,
  /// Realm named in the API's login challenge.
  pub api_realm:         String,
}

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("data_dir", "~/.local/share/docket")?
      .set_default("quota_bytes", DEFAULT_QUOTA_BYTES)?
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("api_username", "clerk")?
      .set_default("api_password_hash", "")?
      .set_default("api_realm", docket_api::auth::DEFAULT_REALM)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("DOCKET"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise Settings")?;

    settings.data_dir = expand_tilde(&settings.data_dir);
    settings.replica_path = settings.replica_path.as_deref().map(expand_tilde);
    settings.drive_dir = settings.drive_dir.as_deref().map(expand_tilde);
    Ok(settings)
  }

  pub fn replica_path(&self) -> PathBuf {
    self
      .replica_path
      .clone()
      .unwrap_or_else(|| self.data_dir.join("replica.db"))
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
