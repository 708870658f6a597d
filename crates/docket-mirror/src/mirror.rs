//! The persistence mirror.
//!
//! Every mutation of the [`RecordStore`] is written synchronously to the
//! primary [`KvStore`], then handed to a background task that copies the same
//! aggregates into the [`ReplicaStore`]. The primary is the source of truth;
//! the replica is only read back by an explicit [`Mirror::reconcile`].

use std::{
  collections::HashMap,
  fmt::Display,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
};

use docket_core::{
  record::RecordStore,
  store::{AggregateKey, KvStore, ReplicaStore, decode_aggregates, encode_aggregates},
};
use tokio::{
  sync::{mpsc, oneshot},
  task::JoinHandle,
};

use crate::{Error, Result};

// ─── Health ──────────────────────────────────────────────────────────────────

/// Tracks replica failures so the operator hears about an unusable replica
/// once, not on every write.
#[derive(Debug, Default)]
pub struct ReplicaHealth {
  reported: AtomicBool,
  failures: AtomicU64,
}

impl ReplicaHealth {
  pub fn report(&self, error: &dyn Display) {
    self.failures.fetch_add(1, Ordering::Relaxed);
    if !self.reported.swap(true, Ordering::Relaxed) {
      tracing::warn!(%error, "replica store unavailable; continuing with the primary store only");
    } else {
      tracing::debug!(%error, "replica write failed");
    }
  }

  /// Whether the one-time warning has been issued.
  pub fn has_reported(&self) -> bool { self.reported.load(Ordering::Relaxed) }

  pub fn failures(&self) -> u64 { self.failures.load(Ordering::Relaxed) }
}

// ─── Replication handle ──────────────────────────────────────────────────────

/// How a replica write ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationOutcome {
  Replicated,
  Failed(String),
  /// No replica is attached this session.
  Skipped,
}

/// Completion handle for one background replica write. Dropping it does not
/// cancel the write.
#[derive(Debug)]
pub struct Replication {
  rx: Option<oneshot::Receiver<Result<(), String>>>,
}

impl Replication {
  fn skipped() -> Self { Self { rx: None } }

  pub async fn outcome(self) -> ReplicationOutcome {
    let Some(rx) = self.rx else {
      return ReplicationOutcome::Skipped;
    };
    match rx.await {
      Ok(Ok(())) => ReplicationOutcome::Replicated,
      Ok(Err(e)) => ReplicationOutcome::Failed(e),
      Err(_) => ReplicationOutcome::Failed("replica worker stopped".into()),
    }
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

enum Job {
  Put {
    entries: Vec<(AggregateKey, String)>,
    done:    oneshot::Sender<Result<(), String>>,
  },
  /// Answered once every earlier job has finished.
  Flush(oneshot::Sender<()>),
}

struct ReplicaLink<R> {
  store:  Arc<R>,
  jobs:   mpsc::UnboundedSender<Job>,
  worker: JoinHandle<()>,
}

async fn run_worker<R: ReplicaStore>(
  store: Arc<R>,
  mut jobs: mpsc::UnboundedReceiver<Job>,
  health: Arc<ReplicaHealth>,
) {
  while let Some(job) = jobs.recv().await {
    match job {
      Job::Put { entries, done } => {
        let result = store.put_all(entries).await.map_err(|e| e.to_string());
        if let Err(e) = &result {
          health.report(e);
        }
        let _ = done.send(result);
      }
      Job::Flush(done) => {
        let _ = done.send(());
      }
    }
  }
  tracing::debug!("replica worker drained");
}

// ─── Mirror ──────────────────────────────────────────────────────────────────

pub struct Mirror<K, R> {
  primary: K,
  replica: Option<ReplicaLink<R>>,
  health:  Arc<ReplicaHealth>,
}

impl<K, R> Mirror<K, R>
where
  K: KvStore<Error = Error>,
  R: ReplicaStore + 'static,
{
  /// Start a session: load the register from `primary` and, when the replica
  /// opened, push the primary's contents into it as this session's baseline.
  ///
  /// A replica that failed to open is reported once and otherwise ignored.
  pub async fn bootstrap<E: Display>(
    primary: K,
    replica: std::result::Result<R, E>,
  ) -> Result<(Self, RecordStore)> {
    let entries = primary.load_all()?;
    let store = decode_aggregates(&entries)?;
    let health = Arc::new(ReplicaHealth::default());

    let replica = match replica {
      Ok(replica) => {
        let shared = Arc::new(replica);
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(shared.clone(), rx, health.clone()));
        Some(ReplicaLink { store: shared, jobs: tx, worker })
      }
      Err(e) => {
        health.report(&e);
        None
      }
    };

    let mirror = Self { primary, replica, health };
    if !entries.is_empty() {
      let baseline = entries.into_iter().collect::<Vec<_>>();
      let outcome = mirror.enqueue(baseline).outcome().await;
      if outcome == ReplicationOutcome::Replicated {
        tracing::info!("replica baseline established");
      }
    }
    tracing::info!(
      files = store.files().len(),
      profiles = store.profiles().len(),
      replica = mirror.has_replica(),
      "register loaded"
    );
    Ok((mirror, store))
  }

  pub fn has_replica(&self) -> bool { self.replica.is_some() }

  pub fn health(&self) -> &ReplicaHealth { &self.health }

  pub fn primary(&self) -> &K { &self.primary }

  fn enqueue(&self, entries: Vec<(AggregateKey, String)>) -> Replication {
    let Some(link) = &self.replica else {
      return Replication::skipped();
    };
    let (done, rx) = oneshot::channel();
    if link.jobs.send(Job::Put { entries, done }).is_err() {
      self.health.report(&"replica worker stopped");
      return Replication::skipped();
    }
    Replication { rx: Some(rx) }
  }

  /// Persist every aggregate of `store`. The primary write completes before
  /// this returns; the replica write is queued. A refused primary write
  /// changes no key and queues nothing.
  pub fn write_through(&mut self, store: &RecordStore) -> Result<Replication> {
    let entries = encode_aggregates(store)?;
    self.primary.set_all(&entries)?;
    Ok(self.enqueue(entries))
  }

  /// Wait until every queued replica write has finished.
  pub async fn flush(&self) {
    let Some(link) = &self.replica else { return };
    let (tx, rx) = oneshot::channel();
    if link.jobs.send(Job::Flush(tx)).is_ok() {
      let _ = rx.await;
    }
  }

  /// Recovery path: overwrite the primary store and `store` with whatever
  /// the replica holds. Aggregates missing from the replica are left as they
  /// are. Returns the number of aggregates restored.
  pub async fn reconcile(&mut self, store: &mut RecordStore) -> Result<usize> {
    self.flush().await;
    let Some(link) = &self.replica else {
      return Err(Error::ReplicaUnavailable);
    };

    let mut restored = HashMap::new();
    for key in AggregateKey::all() {
      let value = link.store.get(key).await.map_err(|e| Error::Replica(e.to_string()))?;
      if let Some(value) = value {
        restored.insert(key, value);
      }
    }

    let mut merged: HashMap<_, _> = encode_aggregates(store)?.into_iter().collect();
    merged.extend(restored.iter().map(|(k, v)| (*k, v.clone())));
    let rebuilt = decode_aggregates(&merged)?;

    let restored: Vec<_> = restored.into_iter().collect();
    self.primary.set_all(&restored)?;
    *store = rebuilt;

    tracing::info!(aggregates = restored.len(), "reconciled from replica");
    Ok(restored.len())
  }

  /// Finish outstanding replica writes and stop the worker.
  pub async fn shutdown(self) {
    if let Some(link) = self.replica {
      drop(link.jobs);
      if let Err(e) = link.worker.await {
        tracing::warn!(error = %e, "replica worker panicked");
      }
    }
  }
}
