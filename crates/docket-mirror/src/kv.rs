//! Primary-tier key-value stores.
//!
//! [`DirKv`] keeps one `<key>.json` document per aggregate in a directory and
//! enforces a total byte quota, the way a browser's local storage would.
//! [`MemoryKv`] is the same contract held in memory.

use std::{
  collections::HashMap,
  fs,
  path::{Path, PathBuf},
};

use docket_core::store::{AggregateKey, KvStore};
use uuid::Uuid;

use crate::{Error, Result};

/// Quota applied when none is configured.
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

// ─── Directory store ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DirKv {
  root:  PathBuf,
  quota: u64,
}

impl DirKv {
  /// Open (creating if needed) the store rooted at `root`.
  pub fn open(root: impl Into<PathBuf>, quota: u64) -> Result<Self> {
    let root = root.into();
    fs::create_dir_all(&root)?;
    Ok(Self { root, quota })
  }

  pub fn root(&self) -> &Path { &self.root }

  pub fn quota(&self) -> u64 { self.quota }

  fn path_for(&self, key: AggregateKey) -> PathBuf {
    self.root.join(format!("{}.json", key.as_str()))
  }

  fn size_of(&self, key: AggregateKey) -> Result<u64> {
    match fs::metadata(self.path_for(key)) {
      Ok(meta) => Ok(meta.len()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
      Err(e) => Err(e.into()),
    }
  }

  /// Bytes used by all aggregates.
  pub fn used(&self) -> Result<u64> {
    AggregateKey::all().map(|k| self.size_of(k)).sum()
  }

  /// Bytes used by every aggregate not in `skip`.
  fn used_except(&self, skip: &[AggregateKey]) -> Result<u64> {
    AggregateKey::all()
      .filter(|k| !skip.contains(k))
      .map(|k| self.size_of(k))
      .sum()
  }

  fn check_quota(&self, entries: &[(AggregateKey, String)]) -> Result<()> {
    let keys: Vec<_> = entries.iter().map(|(k, _)| *k).collect();
    let incoming: u64 = entries.iter().map(|(_, v)| v.len() as u64).sum();
    let needed = self.used_except(&keys)? + incoming;
    if needed > self.quota {
      return Err(Error::QuotaExceeded { needed, quota: self.quota });
    }
    Ok(())
  }

  fn tmp_path_for(&self, key: AggregateKey) -> PathBuf {
    self.root.join(format!(".{}-{}.tmp", key.as_str(), Uuid::new_v4()))
  }
}

fn remove_all(paths: &[PathBuf]) {
  for path in paths {
    if let Err(e) = fs::remove_file(path) {
      tracing::debug!(path = %path.display(), error = %e, "could not remove temp file");
    }
  }
}

impl KvStore for DirKv {
  type Error = Error;

  fn get(&self, key: AggregateKey) -> Result<Option<String>> {
    match fs::read_to_string(self.path_for(key)) {
      Ok(raw) => Ok(Some(raw)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn set(&mut self, key: AggregateKey, value: &str) -> Result<()> {
    self.set_all(&[(key, value.to_owned())])
  }

  /// Every value is staged in a temp file before any of them is renamed
  /// into place, so a refused quota or a failed write leaves the store as it
  /// was.
  fn set_all(&mut self, entries: &[(AggregateKey, String)]) -> Result<()> {
    self.check_quota(entries)?;

    let mut staged = Vec::with_capacity(entries.len());
    for (key, value) in entries {
      let tmp = self.tmp_path_for(*key);
      if let Err(e) = fs::write(&tmp, value) {
        staged.push(tmp);
        remove_all(&staged);
        return Err(e.into());
      }
      staged.push(tmp);
    }

    for (i, ((key, _), tmp)) in entries.iter().zip(&staged).enumerate() {
      if let Err(e) = fs::rename(tmp, self.path_for(*key)) {
        remove_all(&staged[i..]);
        return Err(e.into());
      }
    }
    Ok(())
  }
}

// ─── In-memory store ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
  entries: HashMap<AggregateKey, String>,
  quota:   Option<u64>,
}

impl MemoryKv {
  pub fn new() -> Self { Self::default() }

  pub fn with_quota(quota: u64) -> Self { Self { quota: Some(quota), ..Self::default() } }
}

impl KvStore for MemoryKv {
  type Error = Error;

  fn get(&self, key: AggregateKey) -> Result<Option<String>> { Ok(self.entries.get(&key).cloned()) }

  fn set(&mut self, key: AggregateKey, value: &str) -> Result<()> {
    self.set_all(&[(key, value.to_owned())])
  }

  fn set_all(&mut self, entries: &[(AggregateKey, String)]) -> Result<()> {
    if let Some(quota) = self.quota {
      let others: usize = self
        .entries
        .iter()
        .filter(|(k, _)| !entries.iter().any(|(key, _)| key == *k))
        .map(|(_, v)| v.len())
        .sum();
      let incoming: usize = entries.iter().map(|(_, v)| v.len()).sum();
      let needed = (others + incoming) as u64;
      if needed > quota {
        return Err(Error::QuotaExceeded { needed, quota });
      }
    }
    for (key, value) in entries {
      self.entries.insert(*key, value.clone());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dir_kv_round_trips_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
      let mut kv = DirKv::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
      assert!(kv.get(AggregateKey::Files).unwrap().is_none());
      kv.set(AggregateKey::Files, "[]").unwrap();
    }
    let kv = DirKv::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
    assert_eq!(kv.get(AggregateKey::Files).unwrap().as_deref(), Some("[]"));
    assert!(dir.path().join("files.json").exists());
  }

  #[test]
  fn dir_kv_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut kv = DirKv::open(dir.path(), DEFAULT_QUOTA_BYTES).unwrap();
    kv.set(AggregateKey::Analytics, "{}").unwrap();
    kv.set(AggregateKey::Analytics, "{\"filesEntered\":1}").unwrap();

    let names: Vec<_> = fs::read_dir(dir.path())
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .collect();
    assert_eq!(names, ["analytics.json"]);
  }

  #[test]
  fn dir_kv_refuses_writes_past_quota() {
    let dir = tempfile::tempdir().unwrap();
    let mut kv = DirKv::open(dir.path(), 10).unwrap();
    kv.set(AggregateKey::Files, "12345678").unwrap();

    let err = kv.set(AggregateKey::Profiles, "123").unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { needed: 11, quota: 10 }));

    // Overwriting the same key only counts the new value.
    kv.set(AggregateKey::Files, "1234567890").unwrap();
    assert_eq!(kv.used().unwrap(), 10);
  }

  #[test]
  fn dir_kv_batch_is_refused_as_a_whole() {
    let dir = tempfile::tempdir().unwrap();
    let mut kv = DirKv::open(dir.path(), 20).unwrap();
    kv.set_all(&[(AggregateKey::Files, "[1]".into()), (AggregateKey::Profiles, "[]".into())])
      .unwrap();

    let err = kv
      .set_all(&[
        (AggregateKey::Files, "[1,2,3,4]".into()),
        (AggregateKey::Profiles, "[\"a very long profile\"]".into()),
      ])
      .unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }));
    assert_eq!(kv.get(AggregateKey::Files).unwrap().as_deref(), Some("[1]"));
    assert_eq!(kv.get(AggregateKey::Profiles).unwrap().as_deref(), Some("[]"));

    let names: Vec<_> = fs::read_dir(dir.path())
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .filter(|n| n.ends_with(".tmp"))
      .collect();
    assert!(names.is_empty());
  }

  #[test]
  fn memory_kv_enforces_quota() {
    let mut kv = MemoryKv::with_quota(4);
    kv.set(AggregateKey::Files, "[]").unwrap();
    assert!(kv.set(AggregateKey::Profiles, "[1]").is_err());
    assert!(kv.get(AggregateKey::Profiles).unwrap().is_none());
  }
}
