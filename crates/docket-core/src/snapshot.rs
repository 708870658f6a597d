//! Snapshots: the JSON document used for export, import, backup and
//! restore.
//!
//! The shape is a single object with top-level `files`, `profiles`,
//! `userProfile` and `analytics`. Exports never carry the PIN in the clear
//! and always mask the CNIC.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  file::FileRecord,
  profile::Profile,
  record::RecordStore,
  user::{Analytics, UserProfile},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
  #[serde(default)]
  pub files:        Vec<FileRecord>,
  #[serde(default)]
  pub profiles:     Vec<Profile>,
  #[serde(default)]
  pub user_profile: Option<UserProfile>,
  #[serde(default)]
  pub analytics:    Analytics,
}

impl Snapshot {
  /// A copy of `store` fit to leave the device.
  pub fn export(store: &RecordStore) -> Self {
    Self {
      files:        store.files().to_vec(),
      profiles:     store.profiles().to_vec(),
      user_profile: store.user_profile().map(UserProfile::redacted),
      analytics:    *store.analytics(),
    }
  }

  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string_pretty(self)?) }

  /// Parse an import/restore document.
  ///
  /// Anything that is not a JSON object of the expected shape is rejected as
  /// a whole with [`Error::Format`]; nothing is partially accepted.
  pub fn from_json(raw: &str) -> Result<Self> {
    let value: serde_json::Value =
      serde_json::from_str(raw).map_err(|e| Error::Format(format!("not valid JSON: {e}")))?;
    if !value.is_object() {
      return Err(Error::Format("top-level value must be an object".into()));
    }
    let snapshot: Self =
      serde_json::from_value(value).map_err(|e| Error::Format(e.to_string()))?;
    for file in &snapshot.files {
      file.check_custody()?;
    }
    Ok(snapshot)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_non_object() {
    assert!(matches!(Snapshot::from_json("[1,2,3]"), Err(Error::Format(_))));
    assert!(matches!(Snapshot::from_json("not json"), Err(Error::Format(_))));
  }

  #[test]
  fn rejects_wrong_field_shape() {
    assert!(matches!(Snapshot::from_json(r#"{"files": 3}"#), Err(Error::Format(_))));
    assert!(matches!(
      Snapshot::from_json(r#"{"files": [{"cmsNo": "1"}]}"#),
      Err(Error::Format(_))
    ));
  }

  fn document(returned: bool, returned_at: Option<&str>) -> String {
    let mut file = serde_json::json!({
      "cmsNo": "77", "title": "A vs B", "caseType": "civil",
      "dateType": "hearing", "date": "2024-01-05",
      "deliveredToName": "Ali Khan", "deliveredToType": "advocate",
      "deliveredAt": "2024-01-02T09:00:00Z",
      "returned": returned,
    });
    if let Some(at) = returned_at {
      file["returnedAt"] = at.into();
    }
    serde_json::json!({ "files": [file] }).to_string()
  }

  #[test]
  fn accepts_consistent_custody() {
    assert!(Snapshot::from_json(&document(false, None)).is_ok());
    assert!(Snapshot::from_json(&document(true, Some("2024-01-02T09:00:00Z"))).is_ok());
    assert!(Snapshot::from_json(&document(true, Some("2024-01-04T10:00:00Z"))).is_ok());
  }

  #[test]
  fn rejects_returned_without_timestamp() {
    assert!(matches!(Snapshot::from_json(&document(true, None)), Err(Error::Format(_))));
  }

  #[test]
  fn rejects_pending_with_timestamp() {
    assert!(matches!(
      Snapshot::from_json(&document(false, Some("2024-01-04T10:00:00Z"))),
      Err(Error::Format(_))
    ));
  }

  #[test]
  fn rejects_return_before_delivery() {
    assert!(matches!(
      Snapshot::from_json(&document(true, Some("2024-01-01T09:00:00Z"))),
      Err(Error::Format(_))
    ));
  }

  #[test]
  fn absent_fields_default_to_empty() {
    let snap = Snapshot::from_json("{}").unwrap();
    assert!(snap.files.is_empty());
    assert!(snap.profiles.is_empty());
    assert!(snap.user_profile.is_none());
    assert_eq!(snap.analytics, Analytics::default());
  }
}
