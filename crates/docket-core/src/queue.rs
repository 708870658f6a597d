//! Deferred actions retried once the backup drive is reachable again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An action that could not run when requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueuedAction {
  /// Upload a snapshot of the register to the backup drive.
  #[serde(rename_all = "camelCase")]
  BackupUpload { id: Uuid, queued_at: DateTime<Utc> },
}

impl QueuedAction {
  pub fn backup_upload(now: DateTime<Utc>) -> Self {
    Self::BackupUpload { id: Uuid::new_v4(), queued_at: now }
  }
}

/// Conditions under which the queue may be drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainGate {
  pub online:     bool,
  pub authorized: bool,
}

impl DrainGate {
  pub fn is_open(&self) -> bool { self.online && self.authorized }
}

/// FIFO of [`QueuedAction`]s, persisted under the `offlineQueue` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfflineQueue(Vec<QueuedAction>);

impl OfflineQueue {
  pub fn push(&mut self, action: QueuedAction) { self.0.push(action); }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &QueuedAction> { self.0.iter() }

  /// Take every queued action if `gate` is open; otherwise take nothing.
  pub fn drain(&mut self, gate: DrainGate) -> Vec<QueuedAction> {
    if !gate.is_open() {
      return Vec::new();
    }
    std::mem::take(&mut self.0)
  }

  /// Put actions that failed during a drain back at the head of the queue,
  /// ahead of anything queued since.
  pub fn requeue(&mut self, failed: Vec<QueuedAction>) {
    if failed.is_empty() {
      return;
    }
    let newer = std::mem::replace(&mut self.0, failed);
    self.0.extend(newer);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn closed_gate_takes_nothing() {
    let mut q = OfflineQueue::default();
    q.push(QueuedAction::backup_upload(Utc::now()));

    for gate in [
      DrainGate { online: false, authorized: true },
      DrainGate { online: true, authorized: false },
      DrainGate::default(),
    ] {
      assert!(q.drain(gate).is_empty());
      assert_eq!(q.len(), 1);
    }
  }

  #[test]
  fn open_gate_takes_everything_in_order() {
    let mut q = OfflineQueue::default();
    let a = QueuedAction::backup_upload(Utc::now());
    let b = QueuedAction::backup_upload(Utc::now());
    q.push(a.clone());
    q.push(b.clone());

    let taken = q.drain(DrainGate { online: true, authorized: true });
    assert_eq!(taken, vec![a, b]);
    assert!(q.is_empty());
  }

  #[test]
  fn requeue_goes_ahead_of_newer_actions() {
    let mut q = OfflineQueue::default();
    let old = QueuedAction::backup_upload(Utc::now());
    let new = QueuedAction::backup_upload(Utc::now());
    q.push(new.clone());
    q.requeue(vec![old.clone()]);
    assert_eq!(q.iter().cloned().collect::<Vec<_>>(), vec![old, new]);
  }

  #[test]
  fn serialises_as_tagged_list() {
    let mut q = OfflineQueue::default();
    q.push(QueuedAction::backup_upload(Utc::now()));
    let json = serde_json::to_value(&q).unwrap();
    assert_eq!(json[0]["type"], "backupUpload");
    assert!(json[0]["queuedAt"].is_string());
  }
}
