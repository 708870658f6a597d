//! [`RecordStore`]: the canonical in-memory register.
//!
//! The store performs no I/O and never fails. "Not found" is expressed as a
//! `None`/zero result for the caller to interpret. Persisting after a
//! mutation is the caller's job (see `docket-mirror`).

use chrono::{DateTime, Utc};

use crate::{
  file::FileRecord,
  profile::{Profile, ProfileType},
  queue::OfflineQueue,
  snapshot::Snapshot,
  user::{Analytics, UserProfile},
};

/// Whether [`RecordStore::upsert_profile`] replaced an existing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
  Inserted,
  Replaced,
}

/// Every piece of session state: files, profiles, the operator, the offline
/// queue and the counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
  pub(crate) files:         Vec<FileRecord>,
  pub(crate) profiles:      Vec<Profile>,
  pub(crate) user_profile:  Option<UserProfile>,
  pub(crate) offline_queue: OfflineQueue,
  pub(crate) analytics:     Analytics,
}

impl RecordStore {
  pub fn new() -> Self { Self::default() }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// Files in insertion order.
  pub fn files(&self) -> &[FileRecord] { &self.files }

  pub fn profiles(&self) -> &[Profile] { &self.profiles }

  pub fn user_profile(&self) -> Option<&UserProfile> { self.user_profile.as_ref() }

  pub fn offline_queue(&self) -> &OfflineQueue { &self.offline_queue }

  pub fn analytics(&self) -> &Analytics { &self.analytics }

  /// Resolve a file's holder through the `(name, type)` lookup key.
  pub fn find_profile(&self, name: &str, kind: ProfileType) -> Option<&Profile> {
    self.profiles.iter().find(|p| p.is(name, kind))
  }

  pub fn holder_of(&self, file: &FileRecord) -> Option<&Profile> {
    self.find_profile(&file.holder_name, file.holder_type)
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Append at the end of the file sequence. Duplicate CMS numbers are
  /// allowed: a re-delivered file gets a new record.
  pub fn append_file(&mut self, record: FileRecord) -> &FileRecord {
    self.files.push(record);
    &self.files[self.files.len() - 1]
  }

  /// Close the custody cycle of the first unreturned record for `cms_no`.
  ///
  /// Returns `None` when every record for `cms_no` is already returned or
  /// none exists; the store is then unchanged.
  pub fn mark_returned(&mut self, cms_no: &str, now: DateTime<Utc>) -> Option<&FileRecord> {
    let file = self
      .files
      .iter_mut()
      .find(|f| f.cms_no == cms_no && !f.returned)?;
    file.mark_returned(now);
    Some(&*file)
  }

  /// Replace the profile with the same `(name, type)` in place, or append.
  pub fn upsert_profile(&mut self, profile: Profile) -> Upsert {
    match self.profiles.iter_mut().find(|p| p.is(&profile.name, profile.kind())) {
      Some(existing) => {
        *existing = profile;
        Upsert::Replaced
      }
      None => {
        self.profiles.push(profile);
        Upsert::Inserted
      }
    }
  }

  /// Remove every profile keyed `(name, kind)`. Files referring to it are
  /// left alone. Returns the number removed.
  pub fn delete_profile(&mut self, name: &str, kind: ProfileType) -> usize {
    let before = self.profiles.len();
    self.profiles.retain(|p| !p.is(name, kind));
    before - self.profiles.len()
  }

  pub fn set_user_profile(&mut self, user: UserProfile) { self.user_profile = Some(user); }

  pub fn user_profile_mut(&mut self) -> Option<&mut UserProfile> { self.user_profile.as_mut() }

  pub fn offline_queue_mut(&mut self) -> &mut OfflineQueue { &mut self.offline_queue }

  pub fn analytics_mut(&mut self) -> &mut Analytics { &mut self.analytics }

  /// Wholesale replacement from an imported or restored snapshot.
  ///
  /// Anything the snapshot omits becomes empty, with one exception: a user
  /// profile without a PIN keeps the PIN currently in memory, so restoring
  /// an export (which never carries the PIN) does not lock the operator out.
  /// The offline queue is not part of a snapshot and is kept.
  pub fn replace_all(&mut self, snapshot: Snapshot) {
    let current_pin = self.user_profile.as_ref().and_then(|u| u.pin.clone());

    let user_profile = snapshot.user_profile.map(|mut u| {
      if u.pin.is_none() {
        u.pin = current_pin;
      }
      u
    });

    self.files = snapshot.files;
    self.profiles = snapshot.profiles;
    self.user_profile = user_profile;
    self.analytics = snapshot.analytics;
  }
}
