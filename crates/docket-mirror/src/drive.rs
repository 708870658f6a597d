//! [`LocalDrive`]: a backup drive that is just a directory.
//!
//! Snapshots are written as `docket-<timestamp>-<sha256 prefix>.json`; the
//! file name doubles as the snapshot id. Shares are recorded in a
//! `shares.json` sidecar mapping snapshot ids to principals.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use bytes::Bytes;
use chrono::Utc;
use docket_core::store::{BackupDrive, SnapshotEntry};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{Error, Result};

const PREFIX: &str = "docket-";
const SHARES: &str = "shares.json";

#[derive(Debug, Clone)]
pub struct LocalDrive {
  root:      PathBuf,
  read_only: bool,
}

impl LocalDrive {
  /// A drive rooted at `root`. The directory is not created: a missing
  /// directory reads as offline, like an unplugged disk.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into(), read_only: false } }

  /// Refuse uploads and shares, as for a drive the operator has not signed
  /// in to.
  pub fn read_only(mut self) -> Self {
    self.read_only = true;
    self
  }

  pub fn root(&self) -> &Path { &self.root }

  /// Resolve an id to a path inside the drive, rejecting anything that could
  /// escape it.
  fn snapshot_path(&self, id: &str) -> Result<PathBuf> {
    let valid = id.starts_with(PREFIX)
      && id.ends_with(".json")
      && !id.contains(['/', '\\'])
      && !id.contains("..");
    if !valid {
      return Err(Error::SnapshotNotFound(id.to_owned()));
    }
    Ok(self.root.join(id))
  }

  async fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
    let tmp = self.root.join(format!(".{name}-{}.tmp", Uuid::new_v4()));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, self.root.join(name)).await?;
    Ok(())
  }

  async fn load_shares(&self) -> Result<BTreeMap<String, Vec<String>>> {
    match tokio::fs::read(self.root.join(SHARES)).await {
      Ok(raw) => Ok(serde_json::from_slice(&raw)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
      Err(e) => Err(e.into()),
    }
  }

  /// Principals `id` has been shared with.
  pub async fn shared_with(&self, id: &str) -> Result<Vec<String>> {
    Ok(self.load_shares().await?.remove(id).unwrap_or_default())
  }

  fn ensure_writable(&self) -> Result<()> {
    if self.read_only {
      return Err(Error::Drive("drive is not authorised for writing".into()));
    }
    Ok(())
  }
}

/// `docket-20240101T090000Z-1a2b3c4d5e6f.json`
fn snapshot_name(bytes: &[u8]) -> String {
  let digest = hex::encode(Sha256::digest(bytes));
  format!("{PREFIX}{}-{}.json", Utc::now().format("%Y%m%dT%H%M%SZ"), &digest[..12])
}

impl BackupDrive for LocalDrive {
  type Error = Error;

  async fn is_online(&self) -> bool {
    tokio::fs::metadata(&self.root)
      .await
      .is_ok_and(|m| m.is_dir())
  }

  async fn is_authorized(&self) -> bool {
    if self.read_only {
      return false;
    }
    tokio::fs::metadata(&self.root)
      .await
      .is_ok_and(|m| !m.permissions().readonly())
  }

  async fn upload_snapshot(&self, bytes: Bytes) -> Result<String> {
    self.ensure_writable()?;
    let name = snapshot_name(&bytes);
    self.write_atomic(&name, &bytes).await?;
    tracing::debug!(snapshot = %name, bytes = bytes.len(), "snapshot written to local drive");
    Ok(name)
  }

  async fn list_snapshots(&self) -> Result<Vec<SnapshotEntry>> {
    let mut dir = tokio::fs::read_dir(&self.root).await?;
    let mut entries = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
      let Ok(name) = entry.file_name().into_string() else {
        continue;
      };
      if name.starts_with(PREFIX) && name.ends_with(".json") {
        entries.push(SnapshotEntry { id: name.clone(), name });
      }
    }
    // Timestamped names sort chronologically.
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
  }

  async fn download_snapshot(&self, id: &str) -> Result<Bytes> {
    let path = self.snapshot_path(id)?;
    match tokio::fs::read(&path).await {
      Ok(raw) => Ok(Bytes::from(raw)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        Err(Error::SnapshotNotFound(id.to_owned()))
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn grant_access(&self, id: &str, principal: &str) -> Result<()> {
    self.ensure_writable()?;
    let path = self.snapshot_path(id)?;
    if !tokio::fs::try_exists(&path).await? {
      return Err(Error::SnapshotNotFound(id.to_owned()));
    }

    let mut shares = self.load_shares().await?;
    let principals = shares.entry(id.to_owned()).or_default();
    if !principals.iter().any(|p| p == principal) {
      principals.push(principal.to_owned());
    }
    self.write_atomic(SHARES, &serde_json::to_vec_pretty(&shares)?).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn missing_directory_is_offline() {
    let dir = tempfile::tempdir().unwrap();
    let drive = LocalDrive::new(dir.path().join("absent"));
    assert!(!drive.is_online().await);
    assert!(!drive.is_authorized().await);
  }

  #[tokio::test]
  async fn upload_list_download() {
    let dir = tempfile::tempdir().unwrap();
    let drive = LocalDrive::new(dir.path());

    let id = drive.upload_snapshot(Bytes::from_static(b"{\"files\":[]}")).await.unwrap();
    assert!(id.starts_with("docket-"));

    let listed = drive.list_snapshots().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);

    let bytes = drive.download_snapshot(&id).await.unwrap();
    assert_eq!(&bytes[..], b"{\"files\":[]}");
  }

  #[tokio::test]
  async fn ids_cannot_escape_the_drive() {
    let dir = tempfile::tempdir().unwrap();
    let drive = LocalDrive::new(dir.path());
    assert!(matches!(
      drive.download_snapshot("../docket-x.json").await,
      Err(Error::SnapshotNotFound(_))
    ));
  }

  #[tokio::test]
  async fn grant_access_records_principal_once() {
    let dir = tempfile::tempdir().unwrap();
    let drive = LocalDrive::new(dir.path());
    let id = drive.upload_snapshot(Bytes::from_static(b"{}")).await.unwrap();

    drive.grant_access(&id, "judge@example.pk").await.unwrap();
    drive.grant_access(&id, "judge@example.pk").await.unwrap();
    assert_eq!(drive.shared_with(&id).await.unwrap(), ["judge@example.pk"]);

    assert!(matches!(
      drive.grant_access("docket-missing.json", "x").await,
      Err(Error::SnapshotNotFound(_))
    ));
  }

  #[tokio::test]
  async fn read_only_drive_refuses_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let drive = LocalDrive::new(dir.path()).read_only();
    assert!(drive.is_online().await);
    assert!(!drive.is_authorized().await);
    assert!(drive.upload_snapshot(Bytes::new()).await.is_err());
  }
}
