//! Persistence seams.
//!
//! The register is persisted as five independently serialised aggregates.
//! Two storage tiers hold them:
//!
//! - a [`KvStore`]: small, synchronous, the source of truth;
//! - a [`ReplicaStore`]: larger, asynchronous, a best-effort copy.
//!
//! The backup drive ([`BackupDrive`]) is a third, external collaborator that
//! only ever sees whole [`Snapshot`](crate::snapshot::Snapshot) documents.

use std::{collections::HashMap, future::Future};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};

use crate::{Result, record::RecordStore};

// ─── Aggregate keys ──────────────────────────────────────────────────────────

/// The names under which each aggregate is stored in both tiers.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AggregateKey {
  Files,
  Profiles,
  UserProfile,
  OfflineQueue,
  Analytics,
}

impl AggregateKey {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }
}

/// Serialise every aggregate of `store`, in [`AggregateKey`] order.
pub fn encode_aggregates(store: &RecordStore) -> Result<Vec<(AggregateKey, String)>> {
  Ok(vec![
    (AggregateKey::Files, serde_json::to_string(&store.files)?),
    (AggregateKey::Profiles, serde_json::to_string(&store.profiles)?),
    (AggregateKey::UserProfile, serde_json::to_string(&store.user_profile)?),
    (AggregateKey::OfflineQueue, serde_json::to_string(&store.offline_queue)?),
    (AggregateKey::Analytics, serde_json::to_string(&store.analytics)?),
  ])
}

/// Rebuild a store from stored aggregates. Missing keys start empty.
pub fn decode_aggregates(entries: &HashMap<AggregateKey, String>) -> Result<RecordStore> {
  fn field<T>(entries: &HashMap<AggregateKey, String>, key: AggregateKey) -> Result<T>
  where
    T: serde::de::DeserializeOwned + Default,
  {
    match entries.get(&key) {
      Some(raw) => Ok(serde_json::from_str::<Option<T>>(raw)?.unwrap_or_default()),
      None => Ok(T::default()),
    }
  }

  Ok(RecordStore {
    files:         field(entries, AggregateKey::Files)?,
    profiles:      field(entries, AggregateKey::Profiles)?,
    user_profile:  field(entries, AggregateKey::UserProfile)?,
    offline_queue: field(entries, AggregateKey::OfflineQueue)?,
    analytics:     field(entries, AggregateKey::Analytics)?,
  })
}

// ─── Tiers ───────────────────────────────────────────────────────────────────

/// The synchronous tier: fast, size-limited, read at startup and written
/// after every mutation.
pub trait KvStore {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get(&self, key: AggregateKey) -> Result<Option<String>, Self::Error>;

  fn set(&mut self, key: AggregateKey, value: &str) -> Result<(), Self::Error>;

  /// Write several aggregates as one unit. If the batch is refused, no entry
  /// in it is written.
  fn set_all(&mut self, entries: &[(AggregateKey, String)]) -> Result<(), Self::Error>;

  /// Read every aggregate that is present.
  fn load_all(&self) -> Result<HashMap<AggregateKey, String>, Self::Error> {
    let mut out = HashMap::new();
    for key in AggregateKey::all() {
      if let Some(value) = self.get(key)? {
        out.insert(key, value);
      }
    }
    Ok(out)
  }
}

/// The asynchronous tier: larger and slower. Never read during normal
/// operation; only written to, and read back by an explicit reconcile.
///
/// All methods return `Send` futures so writes can run on a background task.
pub trait ReplicaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Write a batch of aggregates atomically.
  fn put_all(
    &self,
    entries: Vec<(AggregateKey, String)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get(
    &self,
    key: AggregateKey,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;
}

// ─── Backup drive ────────────────────────────────────────────────────────────

/// A snapshot stored on the backup drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
  pub id:   String,
  pub name: String,
}

/// The remote drive snapshots are backed up to.
pub trait BackupDrive: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether the drive can be reached right now.
  fn is_online(&self) -> impl Future<Output = bool> + Send + '_;

  /// Whether this installation may write to the drive.
  fn is_authorized(&self) -> impl Future<Output = bool> + Send + '_;

  /// Store `bytes` as a new snapshot; returns the drive's id for it.
  fn upload_snapshot(
    &self,
    bytes: Bytes,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  fn list_snapshots(
    &self,
  ) -> impl Future<Output = Result<Vec<SnapshotEntry>, Self::Error>> + Send + '_;

  fn download_snapshot<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send + 'a;

  fn grant_access<'a>(
    &'a self,
    id: &'a str,
    principal: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
