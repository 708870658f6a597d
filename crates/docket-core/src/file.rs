//! File records, one entry per delivery of a physical case file.
//!
//! A record is appended when a file is handed over and is mutated exactly
//! once per custody cycle, when the file comes back. Records are never
//! deleted in normal operation. The same `cms_no` may appear many times: a
//! re-delivered file gets a fresh record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  profile::ProfileType,
  user::UserProfile,
};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CaseType {
  Civil,
  Criminal,
  Other,
}

/// Whether [`FileRecord::date`] is a decision date or the next hearing.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DateType {
  Decision,
  Hearing,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A single custody event for a case file.
///
/// `holder_name`/`holder_type` is a lookup key into the profile list, not an
/// ownership edge: deleting the profile leaves this record untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
  #[serde(deserialize_with = "deserialize_cms_no")]
  pub cms_no:            String,
  pub title:             String,
  pub case_type:         CaseType,
  #[serde(default)]
  pub nature:            String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fir_no:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fir_year:          Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fir_us:            Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub police_station:    Option<String>,

  pub date_type:         DateType,
  pub date:              NaiveDate,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub swal_form_no:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub swal_date:         Option<NaiveDate>,

  #[serde(rename = "deliveredToName")]
  pub holder_name:       String,
  #[serde(rename = "deliveredToType")]
  pub holder_type:       ProfileType,
  pub delivered_at:      DateTime<Utc>,
  #[serde(default)]
  pub returned:          bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub returned_at:       Option<DateTime<Utc>>,

  #[serde(default)]
  pub court_name:        String,
  #[serde(default)]
  pub clerk_name:        String,
}

impl FileRecord {
  pub fn is_pending(&self) -> bool { !self.returned }

  /// The four FIR fields joined in display order; empty for non-criminal
  /// cases.
  pub fn criminal_details(&self) -> String {
    [&self.fir_no, &self.fir_year, &self.fir_us, &self.police_station]
      .into_iter()
      .filter_map(|f| f.as_deref())
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(" / ")
  }

  /// `returnedAt` is present exactly when `returned` is set, and never
  /// precedes `deliveredAt`.
  pub fn check_custody(&self) -> Result<()> {
    match (self.returned, self.returned_at) {
      (true, None) => {
        Err(Error::Format(format!("file {} is returned but has no returnedAt", self.cms_no)))
      }
      (false, Some(_)) => {
        Err(Error::Format(format!("file {} is pending but has a returnedAt", self.cms_no)))
      }
      (true, Some(at)) if at < self.delivered_at => Err(Error::Format(format!(
        "file {} was returned before it was delivered",
        self.cms_no
      ))),
      _ => Ok(()),
    }
  }

  /// Close the custody cycle. Has no effect on an already-returned record.
  pub(crate) fn mark_returned(&mut self, at: DateTime<Utc>) -> bool {
    if self.returned {
      return false;
    }
    self.returned = true;
    self.returned_at = Some(at.max(self.delivered_at));
    true
  }
}

/// Accept the CMS number as either a JSON string or a JSON number; older
/// exports stored it numerically.
fn deserialize_cms_no<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Int(i64),
    Float(f64),
  }

  Ok(match Raw::deserialize(deserializer)? {
    Raw::Text(s) => s,
    Raw::Int(n) => n.to_string(),
    Raw::Float(f) => f.to_string(),
  })
}

// ─── Entry form ──────────────────────────────────────────────────────────────

/// The file-entry form as submitted by the operator.
///
/// Carries the raw petitioner/respondent pair and the copy-agency flag;
/// [`NewFile::into_record`] derives the stored shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
  pub cms_no:          String,
  pub petitioner:      String,
  pub respondent:      String,
  pub case_type:       CaseType,
  #[serde(default)]
  pub nature:          String,
  #[serde(default)]
  pub fir_no:          Option<String>,
  #[serde(default)]
  pub fir_year:        Option<String>,
  #[serde(default)]
  pub fir_us:          Option<String>,
  #[serde(default)]
  pub police_station:  Option<String>,
  pub date_type:       DateType,
  pub date:            NaiveDate,
  /// Set when a copy-agency (SWAL) application accompanies the file.
  #[serde(default)]
  pub copy_agency:     bool,
  #[serde(default)]
  pub swal_form_no:    Option<String>,
  #[serde(default)]
  pub swal_date:       Option<NaiveDate>,
  pub holder_name:     String,
  pub holder_type:     ProfileType,
}

impl NewFile {
  /// Check the type-conditional required fields.
  pub fn validate(&self) -> Result<()> {
    require(&self.cms_no, "cmsNo")?;
    require(&self.petitioner, "petitioner")?;
    require(&self.respondent, "respondent")?;
    require(&self.holder_name, "deliveredToName")?;

    if self.case_type == CaseType::Criminal {
      require_opt(&self.fir_no, "firNo")?;
      require_opt(&self.fir_year, "firYear")?;
      require_opt(&self.fir_us, "firUs")?;
      require_opt(&self.police_station, "policeStation")?;
    }

    if self.copy_agency {
      require_opt(&self.swal_form_no, "swalFormNo")?;
      if self.swal_date.is_none() {
        return Err(Error::MissingField("swalDate"));
      }
    }
    Ok(())
  }

  /// Build the stored record. Criminal-only and copy-agency fields are
  /// dropped unless their condition holds; court and clerk names are copied
  /// from `user` as they stand now.
  pub fn into_record(self, user: Option<&UserProfile>, delivered_at: DateTime<Utc>) -> FileRecord {
    let criminal = self.case_type == CaseType::Criminal;
    let agency   = self.copy_agency;
    let keep = |v: Option<String>, cond: bool| if cond { v.map(|s| s.trim().to_owned()) } else { None };

    FileRecord {
      cms_no:         self.cms_no.trim().to_owned(),
      title:          format!("{} vs {}", self.petitioner.trim(), self.respondent.trim()),
      case_type:      self.case_type,
      nature:         self.nature.trim().to_owned(),
      fir_no:         keep(self.fir_no, criminal),
      fir_year:       keep(self.fir_year, criminal),
      fir_us:         keep(self.fir_us, criminal),
      police_station: keep(self.police_station, criminal),
      date_type:      self.date_type,
      date:           self.date,
      swal_form_no:   keep(self.swal_form_no, agency),
      swal_date:      self.swal_date.filter(|_| agency),
      holder_name:    self.holder_name.trim().to_owned(),
      holder_type:    self.holder_type,
      delivered_at,
      returned:       false,
      returned_at:    None,
      court_name:     user.map(|u| u.court_name.clone()).unwrap_or_default(),
      clerk_name:     user.map(|u| u.clerk_name.clone()).unwrap_or_default(),
    }
  }
}

fn require(value: &str, field: &'static str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::MissingField(field));
  }
  Ok(())
}

fn require_opt(value: &Option<String>, field: &'static str) -> Result<()> {
  require(value.as_deref().unwrap_or_default(), field)
}
