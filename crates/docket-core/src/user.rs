//! The operator's own identity and the process-wide usage counters.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The single operator of this installation.
///
/// `pin` is a plaintext shared secret that gates file entry, returns and
/// profile deletion. It is never exported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
  pub clerk_name: String,
  pub judge_name: String,
  pub court_name: String,
  pub mobile:     String,
  pub cnic:       String,
  pub pin:        Option<String>,
  pub email:      String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub photo:      Option<String>,
}

impl UserProfile {
  /// Check the fields required at first-run setup.
  pub fn validate(&self) -> Result<()> {
    for (value, field) in [
      (&self.clerk_name, "clerkName"),
      (&self.judge_name, "judgeName"),
      (&self.court_name, "courtName"),
      (&self.mobile, "mobile"),
      (&self.cnic, "cnic"),
    ] {
      if value.trim().is_empty() {
        return Err(Error::MissingField(field));
      }
    }
    if self.pin.as_deref().is_none_or(|p| p.trim().is_empty()) {
      return Err(Error::MissingField("pin"));
    }
    Ok(())
  }

  /// Succeeds iff `pin` equals the stored PIN.
  pub fn verify_pin(&self, pin: &str) -> Result<()> {
    match self.pin.as_deref() {
      Some(stored) if stored == pin => Ok(()),
      _ => Err(Error::IncorrectPin),
    }
  }

  /// Replace the PIN. `identity` must match the stored CNIC or email.
  pub fn change_pin(&mut self, identity: &str, new_pin: &str) -> Result<()> {
    let identity = identity.trim();
    let cnic_ok  = !self.cnic.is_empty() && identity == self.cnic;
    let email_ok = !self.email.is_empty() && identity.eq_ignore_ascii_case(&self.email);
    if !cnic_ok && !email_ok {
      return Err(Error::IdentityMismatch);
    }
    if new_pin.trim().is_empty() {
      return Err(Error::MissingField("pin"));
    }
    self.pin = Some(new_pin.trim().to_owned());
    Ok(())
  }

  /// The copy of this profile that is safe to hand out: PIN nulled, CNIC
  /// masked.
  pub fn redacted(&self) -> Self {
    Self {
      pin: None,
      cnic: mask_cnic(&self.cnic),
      ..self.clone()
    }
  }
}

/// Mask a national identity number.
///
/// For the usual three-part `XXXXX-XXXXXXX-X` shape, the first two
/// characters and the final segment stay readable. Any other shape keeps
/// only its first two characters.
pub fn mask_cnic(cnic: &str) -> String {
  let star = |s: &str| "*".repeat(s.chars().count());
  let parts: Vec<&str> = cnic.split('-').collect();

  if let [first, middle, last] = parts.as_slice() {
    let head: String = first.chars().take(2).collect();
    let rest: String = first.chars().skip(2).collect();
    return format!("{head}{}-{}-{last}", star(&rest), star(middle));
  }

  let head: String = cnic.chars().take(2).collect();
  let rest: String = cnic.chars().skip(2).collect();
  format!("{head}{}", star(&rest))
}

// ─── Analytics ───────────────────────────────────────────────────────────────

/// Monotonic usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
  files_entered:      u64,
  searches_performed: u64,
  backups_created:    u64,
}

impl Analytics {
  pub fn files_entered(&self) -> u64 { self.files_entered }

  pub fn searches_performed(&self) -> u64 { self.searches_performed }

  pub fn backups_created(&self) -> u64 { self.backups_created }

  pub fn record_file_entered(&mut self) { self.files_entered += 1; }

  pub fn record_search(&mut self) { self.searches_performed += 1; }

  pub fn record_backup(&mut self) { self.backups_created += 1; }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> UserProfile {
    UserProfile {
      clerk_name: "Imran".into(),
      judge_name: "Justice Rana".into(),
      court_name: "Civil Court Lahore".into(),
      mobile:     "0300-0000000".into(),
      cnic:       "35202-1234567-1".into(),
      pin:        Some("4321".into()),
      email:      "imran@example.com".into(),
      photo:      None,
    }
  }

  #[test]
  fn masks_three_part_cnic() {
    assert_eq!(mask_cnic("35202-1234567-1"), "35***-*******-1");
  }

  #[test]
  fn masks_unhyphenated_cnic() {
    assert_eq!(mask_cnic("3520212345671"), "35***********");
    assert_eq!(mask_cnic(""), "");
  }

  #[test]
  fn redacted_drops_pin() {
    let r = user().redacted();
    assert_eq!(r.pin, None);
    assert_eq!(r.cnic, "35***-*******-1");
    assert_eq!(r.clerk_name, "Imran");
  }

  #[test]
  fn verify_pin() {
    let u = user();
    assert!(u.verify_pin("4321").is_ok());
    assert!(matches!(u.verify_pin("0000"), Err(Error::IncorrectPin)));
    assert!(matches!(UserProfile::default().verify_pin(""), Err(Error::IncorrectPin)));
  }

  #[test]
  fn change_pin_by_email_or_cnic() {
    let mut u = user();
    u.change_pin("IMRAN@example.com", "1111").unwrap();
    assert_eq!(u.pin.as_deref(), Some("1111"));
    u.change_pin("35202-1234567-1", "2222").unwrap();
    assert_eq!(u.pin.as_deref(), Some("2222"));
    assert!(matches!(u.change_pin("someone@else", "3333"), Err(Error::IdentityMismatch)));
    assert_eq!(u.pin.as_deref(), Some("2222"));
  }

  #[test]
  fn pin_is_serialised_as_null_when_absent() {
    let json = serde_json::to_value(user().redacted()).unwrap();
    assert!(json["pin"].is_null());
    assert!(json.get("pin").is_some());
  }

  #[test]
  fn counters_only_go_up() {
    let mut a = Analytics::default();
    a.record_file_entered();
    a.record_file_entered();
    a.record_search();
    assert_eq!(a.files_entered(), 2);
    assert_eq!(a.searches_performed(), 1);
    assert_eq!(a.backups_created(), 0);
  }
}
