//! [`Docket`]: one operator session over the register.
//!
//! Owns the [`RecordStore`] and the [`Mirror`], applies the PIN gate and
//! validation in front of store mutations, counts analytics, and talks to
//! the backup drive (queueing uploads while it is unreachable).

use std::fmt::Display;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use docket_core::{
  Error as CoreError,
  file::{FileRecord, NewFile},
  profile::{Profile, ProfileType},
  query::{Facet, ReportView, SearchFilters, facet_totals},
  queue::{DrainGate, QueuedAction},
  record::{RecordStore, Upsert},
  report_csv,
  snapshot::Snapshot,
  store::{BackupDrive, KvStore, ReplicaStore, SnapshotEntry},
  user::{Analytics, UserProfile},
};
use serde::Serialize;

use crate::{
  Error, Result,
  mirror::{Mirror, Replication},
};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// The concrete storage a [`Docket`] runs on.
pub trait Backend: Send + Sync + 'static {
  type Kv: KvStore<Error = Error> + Send + Sync + 'static;
  type Replica: ReplicaStore + 'static;
  type Drive: BackupDrive<Error = Error> + 'static;
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What happened to a backup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BackupOutcome {
  Uploaded { id: String },
  /// The drive was offline or not authorised; the upload waits in the
  /// offline queue.
  Queued { pending: usize },
}

/// Result of draining the offline queue. Every queued upload is served by
/// the same snapshot, so at most one is written per drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
  /// The snapshot written for this drain, if any.
  pub snapshot:  Option<String>,
  /// Queued actions cleared by that snapshot.
  pub satisfied: usize,
  pub requeued:  usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub files:          usize,
  pub profiles:       usize,
  pub offline_queue:  usize,
  pub analytics:      Analytics,
  pub facets:         Vec<FacetTotal>,
  pub replica_online: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetTotal {
  pub facet: Facet,
  pub rows:  usize,
}

// ─── Session ─────────────────────────────────────────────────────────────────

pub struct Docket<B: Backend> {
  store:       RecordStore,
  mirror:      Mirror<B::Kv, B::Replica>,
  drive:       Option<B::Drive>,
  replication: Option<Replication>,
}

impl<B: Backend> Docket<B> {
  /// Load the register from `kv` and attach the replica (if it opened) and
  /// the drive (if one is configured).
  pub async fn open<E: Display>(
    kv: B::Kv,
    replica: std::result::Result<B::Replica, E>,
    drive: Option<B::Drive>,
  ) -> Result<Self> {
    let (mirror, store) = Mirror::bootstrap(kv, replica).await?;
    Ok(Self { store, mirror, drive, replication: None })
  }

  pub fn store(&self) -> &RecordStore { &self.store }

  pub fn mirror(&self) -> &Mirror<B::Kv, B::Replica> { &self.mirror }

  pub fn drive(&self) -> Option<&B::Drive> { self.drive.as_ref() }

  /// The completion handle of the most recent replica write, if nobody has
  /// taken it yet.
  pub fn take_replication(&mut self) -> Option<Replication> { self.replication.take() }

  fn persist(&mut self) -> Result<()> {
    let replication = self.mirror.write_through(&self.store)?;
    self.replication = Some(replication);
    Ok(())
  }

  fn check_pin(&self, pin: &str) -> Result<()> {
    let user = self.store.user_profile().ok_or(CoreError::NoUserProfile)?;
    Ok(user.verify_pin(pin)?)
  }

  fn require_drive(&self) -> Result<&B::Drive> { self.drive.as_ref().ok_or_else(no_drive) }

  // ── Operator ──────────────────────────────────────────────────────────────

  /// First-run setup of the operator's profile.
  pub fn register_user(&mut self, user: UserProfile) -> Result<()> {
    if self.store.user_profile().is_some() {
      return Err(CoreError::AlreadyRegistered.into());
    }
    user.validate()?;
    tracing::info!(clerk = %user.clerk_name, court = %user.court_name, "user profile registered");
    self.store.set_user_profile(user);
    self.persist()
  }

  /// Set a new PIN, proving identity with the stored CNIC or email.
  pub fn change_pin(&mut self, identity: &str, new_pin: &str) -> Result<()> {
    let user = self.store.user_profile_mut().ok_or(CoreError::NoUserProfile)?;
    user.change_pin(identity, new_pin)?;
    tracing::info!("PIN changed");
    self.persist()
  }

  // ── Files ─────────────────────────────────────────────────────────────────

  /// Record the hand-over of a file.
  pub fn enter_file(&mut self, pin: &str, form: NewFile, now: DateTime<Utc>) -> Result<FileRecord> {
    self.check_pin(pin)?;
    form.validate()?;
    if self.store.find_profile(form.holder_name.trim(), form.holder_type).is_none() {
      return Err(
        CoreError::UnknownProfile { name: form.holder_name.trim().to_owned(), kind: form.holder_type }
          .into(),
      );
    }

    let record = form.into_record(self.store.user_profile(), now);
    let record = self.store.append_file(record).clone();
    self.store.analytics_mut().record_file_entered();
    tracing::info!(cms_no = %record.cms_no, holder = %record.holder_name, "file delivered");
    self.persist()?;
    Ok(record)
  }

  /// Close the oldest open custody cycle for `cms_no`. `None` when nothing
  /// was out; that is not an error.
  pub fn return_file(
    &mut self,
    pin: &str,
    cms_no: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<FileRecord>> {
    self.check_pin(pin)?;
    let Some(record) = self.store.mark_returned(cms_no.trim(), now).cloned() else {
      tracing::debug!(cms_no, "return requested but no open record");
      return Ok(None);
    };
    tracing::info!(cms_no = %record.cms_no, "file returned");
    self.persist()?;
    Ok(Some(record))
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  pub fn save_profile(&mut self, profile: Profile) -> Result<Upsert> {
    profile.validate()?;
    let name = profile.name.clone();
    let upsert = self.store.upsert_profile(profile);
    tracing::info!(%name, ?upsert, "profile saved");
    self.persist()?;
    Ok(upsert)
  }

  pub fn delete_profile(&mut self, pin: &str, name: &str, kind: ProfileType) -> Result<usize> {
    self.check_pin(pin)?;
    let removed = self.store.delete_profile(name, kind);
    if removed > 0 {
      tracing::info!(name, %kind, "profile deleted");
      self.persist()?;
    }
    Ok(removed)
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  /// A view of the facet named `key`. Unknown keys give an empty view.
  pub fn report(&self, key: &str, now: DateTime<Utc>) -> ReportView {
    let mut view = ReportView::new();
    view.select_facet_key(&self.store, key, now);
    view
  }

  /// Run a search and count it.
  pub fn search(&mut self, filters: SearchFilters) -> Result<ReportView> {
    let mut view = ReportView::new();
    view.run_search(&self.store, filters);
    self.store.analytics_mut().record_search();
    self.persist()?;
    Ok(view)
  }

  pub fn export_csv(&self, view: &ReportView, now: DateTime<Utc>) -> Result<String> {
    Ok(report_csv::render(view, &self.store, now)?)
  }

  pub fn stats(&self, now: DateTime<Utc>) -> Stats {
    Stats {
      files:          self.store.files().len(),
      profiles:       self.store.profiles().len(),
      offline_queue:  self.store.offline_queue().len(),
      analytics:      *self.store.analytics(),
      facets:         facet_totals(&self.store, now)
        .into_iter()
        .map(|(facet, rows)| FacetTotal { facet, rows })
        .collect(),
      replica_online: self.mirror.has_replica() && !self.mirror.health().has_reported(),
    }
  }

  // ── Snapshots ─────────────────────────────────────────────────────────────

  pub fn export_json(&self) -> Result<String> { Ok(Snapshot::export(&self.store).to_json()?) }

  /// Replace the register with an exported document. A malformed document
  /// changes nothing.
  pub fn import_json(&mut self, raw: &str) -> Result<()> {
    let snapshot = Snapshot::from_json(raw)?;
    let files = snapshot.files.len();
    self.store.replace_all(snapshot);
    tracing::info!(files, "register imported");
    self.persist()
  }

  // ── Backup drive ──────────────────────────────────────────────────────────

  /// Upload a snapshot now, or queue the upload if the drive cannot take it.
  pub async fn backup(&mut self, now: DateTime<Utc>) -> Result<BackupOutcome> {
    let drive = self.drive.as_ref().ok_or_else(no_drive)?;
    let gate = drain_gate(drive).await;

    if gate.is_open() {
      match upload(&self.store, drive).await {
        Ok(id) => {
          self.store.analytics_mut().record_backup();
          tracing::info!(snapshot = %id, "backup uploaded");
          self.persist()?;
          return Ok(BackupOutcome::Uploaded { id });
        }
        Err(e) => tracing::warn!(error = %e, "backup upload failed; queueing for retry"),
      }
    } else {
      tracing::info!(
        online = gate.online,
        authorized = gate.authorized,
        "drive unavailable; backup queued"
      );
    }

    self.store.offline_queue_mut().push(QueuedAction::backup_upload(now));
    self.persist()?;
    Ok(BackupOutcome::Queued { pending: self.store.offline_queue().len() })
  }

  /// Run queued actions if the drive is online and authorised. One snapshot
  /// of the current register satisfies every queued upload; if it fails, the
  /// whole batch goes back to the head of the queue.
  pub async fn drain_offline_queue(&mut self) -> Result<DrainReport> {
    let drive = self.drive.as_ref().ok_or_else(no_drive)?;
    let gate = drain_gate(drive).await;
    let actions = self.store.offline_queue_mut().drain(gate);
    if actions.is_empty() {
      return Ok(DrainReport::default());
    }

    let report = match upload(&self.store, drive).await {
      Ok(snapshot) => {
        self.store.analytics_mut().record_backup();
        tracing::info!(%snapshot, satisfied = actions.len(), "queued backups uploaded");
        DrainReport { snapshot: Some(snapshot), satisfied: actions.len(), requeued: 0 }
      }
      Err(e) => {
        tracing::warn!(error = %e, pending = actions.len(), "queued backup failed again");
        let requeued = actions.len();
        self.store.offline_queue_mut().requeue(actions);
        DrainReport { snapshot: None, satisfied: 0, requeued }
      }
    };
    self.persist()?;
    Ok(report)
  }

  pub async fn list_backups(&self) -> Result<Vec<SnapshotEntry>> {
    self.require_drive()?.list_snapshots().await
  }

  /// Replace the register with snapshot `id` from the drive.
  pub async fn restore(&mut self, id: &str) -> Result<()> {
    let bytes = self.require_drive()?.download_snapshot(id).await?;
    let raw = std::str::from_utf8(&bytes)
      .map_err(|e| CoreError::Format(format!("snapshot is not UTF-8: {e}")))?;
    self.import_json(raw)?;
    tracing::info!(snapshot = id, "restored from drive");
    Ok(())
  }

  pub async fn share_backup(&self, id: &str, principal: &str) -> Result<()> {
    self.require_drive()?.grant_access(id, principal).await?;
    tracing::info!(snapshot = id, principal, "backup shared");
    Ok(())
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// Overwrite the register from the replica.
  pub async fn reconcile(&mut self) -> Result<usize> {
    self.mirror.reconcile(&mut self.store).await
  }

  /// Flush pending replica writes and stop the worker.
  pub async fn close(self) { self.mirror.shutdown().await; }
}

fn no_drive() -> Error { Error::Drive("no backup drive is configured".into()) }

async fn drain_gate<D: BackupDrive>(drive: &D) -> DrainGate {
  DrainGate { online: drive.is_online().await, authorized: drive.is_authorized().await }
}

async fn upload<D: BackupDrive<Error = Error>>(store: &RecordStore, drive: &D) -> Result<String> {
  let json = Snapshot::export(store).to_json()?;
  drive.upload_snapshot(Bytes::from(json)).await
}
