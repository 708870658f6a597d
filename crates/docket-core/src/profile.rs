//! Profiles: the people and offices a file can be handed to.
//!
//! A profile is identified by its `(name, type)` pair. There is no surrogate
//! id; file records point at profiles through the same pair.

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

/// The kind of custody holder.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProfileType {
  Munshi,
  Advocate,
  Colleague,
  Other,
}

/// Type-specific profile fields. The serde tag doubles as the profile's
/// `type` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProfileDetails {
  #[serde(rename_all = "camelCase")]
  Munshi {
    #[serde(default)]
    chamber_no:    String,
    #[serde(default)]
    advocate_name: String,
  },
  #[serde(rename_all = "camelCase")]
  Advocate {
    #[serde(default)]
    chamber_no: String,
  },
  #[serde(rename_all = "camelCase")]
  Colleague {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    posted_at:   Option<String>,
  },
  #[serde(rename_all = "camelCase")]
  Other {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cnic:     Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relation: Option<String>,
  },
}

impl ProfileDetails {
  pub fn kind(&self) -> ProfileType {
    match self {
      Self::Munshi { .. } => ProfileType::Munshi,
      Self::Advocate { .. } => ProfileType::Advocate,
      Self::Colleague { .. } => ProfileType::Colleague,
      Self::Other { .. } => ProfileType::Other,
    }
  }

  pub fn chamber_no(&self) -> Option<&str> {
    match self {
      Self::Munshi { chamber_no, .. } | Self::Advocate { chamber_no } => Some(chamber_no.as_str()),
      _ => None,
    }
  }
}

/// A custody holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub name:    String,
  #[serde(default)]
  pub cell_no: String,
  /// Encoded photo (data URL or path). Optional only for advocates.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub photo:   Option<String>,
  #[serde(flatten)]
  pub details: ProfileDetails,
}

impl Profile {
  pub fn kind(&self) -> ProfileType { self.details.kind() }

  pub fn is(&self, name: &str, kind: ProfileType) -> bool {
    self.name == name && self.kind() == kind
  }

  /// Check the type-conditional required fields.
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::MissingField("name"));
    }
    if self.cell_no.trim().is_empty() {
      return Err(Error::MissingField("cellNo"));
    }
    let has_photo = self.photo.as_deref().is_some_and(|p| !p.trim().is_empty());
    if !has_photo && self.kind() != ProfileType::Advocate {
      return Err(Error::MissingField("photo"));
    }
    match &self.details {
      ProfileDetails::Munshi { chamber_no, advocate_name } => {
        if chamber_no.trim().is_empty() {
          return Err(Error::MissingField("chamberNo"));
        }
        if advocate_name.trim().is_empty() {
          return Err(Error::MissingField("advocateName"));
        }
      }
      ProfileDetails::Advocate { chamber_no } => {
        if chamber_no.trim().is_empty() {
          return Err(Error::MissingField("chamberNo"));
        }
      }
      ProfileDetails::Colleague { .. } | ProfileDetails::Other { .. } => {}
    }
    Ok(())
  }
}

/// Profiles whose name fuzzily matches `query`, best match first.
///
/// Used to assist custody-holder entry; an empty query returns every
/// profile in stored order.
pub fn suggest<'a>(profiles: &'a [Profile], query: &str) -> Vec<&'a Profile> {
  let query = query.trim();
  if query.is_empty() {
    return profiles.iter().collect();
  }
  let matcher = SkimMatcherV2::default().ignore_case();
  let mut scored: Vec<(i64, &Profile)> = profiles
    .iter()
    .filter_map(|p| matcher.fuzzy_match(&p.name, query).map(|score| (score, p)))
    .collect();
  // Stable: equal scores keep stored order.
  scored.sort_by(|a, b| b.0.cmp(&a.0));
  scored.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn advocate(name: &str) -> Profile {
    Profile {
      name:    name.into(),
      cell_no: "0300-1234567".into(),
      photo:   None,
      details: ProfileDetails::Advocate { chamber_no: "12".into() },
    }
  }

  #[test]
  fn type_tag_is_flattened() {
    let json = serde_json::to_value(advocate("Ali Khan")).unwrap();
    assert_eq!(json["type"], "advocate");
    assert_eq!(json["chamberNo"], "12");
    assert_eq!(json["cellNo"], "0300-1234567");
  }

  #[test]
  fn munshi_round_trips_through_json() {
    let p = Profile {
      name:    "Bashir".into(),
      cell_no: "0311".into(),
      photo:   Some("data:image/png;base64,AAAA".into()),
      details: ProfileDetails::Munshi {
        chamber_no:    "4".into(),
        advocate_name: "Ali Khan".into(),
      },
    };
    let json = serde_json::to_string(&p).unwrap();
    let back: Profile = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
    assert_eq!(back.kind(), ProfileType::Munshi);
  }

  #[test]
  fn advocate_photo_is_optional() {
    assert!(advocate("Ali Khan").validate().is_ok());
  }

  #[test]
  fn colleague_photo_is_required() {
    let p = Profile {
      name:    "Sana".into(),
      cell_no: "0322".into(),
      photo:   None,
      details: ProfileDetails::Colleague { designation: None, posted_at: None },
    };
    assert!(matches!(p.validate(), Err(Error::MissingField("photo"))));
  }

  #[test]
  fn munshi_requires_advocate_name() {
    let p = Profile {
      name:    "Bashir".into(),
      cell_no: "0311".into(),
      photo:   Some("photo".into()),
      details: ProfileDetails::Munshi { chamber_no: "4".into(), advocate_name: " ".into() },
    };
    assert!(matches!(p.validate(), Err(Error::MissingField("advocateName"))));
  }

  #[test]
  fn suggest_ranks_fuzzy_matches() {
    let profiles = vec![advocate("Zahid Mehmood"), advocate("Ali Khan"), advocate("Alia Noor")];
    let names: Vec<_> = suggest(&profiles, "ali").into_iter().map(|p| p.name.as_str()).collect();
    assert!(names.contains(&"Ali Khan"));
    assert!(names.contains(&"Alia Noor"));
    assert!(!names.contains(&"Zahid Mehmood"));
  }

  #[test]
  fn parse_profile_type() {
    assert_eq!("Advocate".parse::<ProfileType>().unwrap(), ProfileType::Advocate);
    assert!("judge".parse::<ProfileType>().is_err());
  }
}
