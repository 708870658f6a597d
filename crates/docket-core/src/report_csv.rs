//! CSV export of a report view.
//!
//! One row per file in display order: every visible column, then the
//! derived custody duration, then the holder's profile joined on
//! `(name, type)`. Fields containing the delimiter are double-quoted.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  duration::CustodyDuration,
  file::FileRecord,
  query::{Column, ReportView},
  record::RecordStore,
};

const DERIVED_HEADERS: [&str; 3] = ["Duration", "Holder Cell No", "Holder Chamber No"];

/// Render every row of `view` (all pages) as CSV.
pub fn render(view: &ReportView, store: &RecordStore, now: DateTime<Utc>) -> Result<String> {
  render_rows(view.sorted_rows(), store, now)
}

/// Render `rows` as CSV, in the order given.
pub fn render_rows<'a>(
  rows: impl IntoIterator<Item = &'a FileRecord>,
  store: &RecordStore,
  now: DateTime<Utc>,
) -> Result<String> {
  let mut writer = csv::Writer::from_writer(Vec::new());

  writer.write_record(Column::all().map(Column::header).chain(DERIVED_HEADERS))?;

  for file in rows {
    let holder = store.holder_of(file);
    let mut record: Vec<String> = Column::all().map(|c| c.display(file)).collect();
    record.push(CustodyDuration::of(file, now).to_string());
    record.push(holder.map(|p| p.cell_no.clone()).unwrap_or_default());
    record.push(
      holder
        .and_then(|p| p.details.chamber_no())
        .unwrap_or_default()
        .to_owned(),
    );
    writer.write_record(&record)?;
  }

  let bytes = writer
    .into_inner()
    .map_err(|e| Error::Csv(e.into_error().into()))?;
  String::from_utf8(bytes).map_err(|e| Error::Invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone};

  use super::*;
  use crate::{
    file::{CaseType, DateType},
    profile::{Profile, ProfileDetails, ProfileType},
  };

  fn file(title: &str) -> FileRecord {
    FileRecord {
      cms_no:         "77".into(),
      title:          title.into(),
      case_type:      CaseType::Civil,
      nature:         "Rent".into(),
      fir_no:         None,
      fir_year:       None,
      fir_us:         None,
      police_station: None,
      date_type:      DateType::Hearing,
      date:           NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
      swal_form_no:   None,
      swal_date:      None,
      holder_name:    "Ali Khan".into(),
      holder_type:    ProfileType::Advocate,
      delivered_at:   Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
      returned:       false,
      returned_at:    None,
      court_name:     "Civil Court".into(),
      clerk_name:     "Imran".into(),
    }
  }

  #[test]
  fn quotes_fields_with_commas_and_joins_holder() {
    let mut store = RecordStore::new();
    store.append_file(file("Aslam, Akram vs The State"));
    store.upsert_profile(Profile {
      name:    "Ali Khan".into(),
      cell_no: "0300-1".into(),
      photo:   None,
      details: ProfileDetails::Advocate { chamber_no: "C-12".into() },
    });

    let now = Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap();
    let csv = render_rows(store.files(), &store, now).unwrap();
    let mut lines = csv.lines();

    let header = lines.next().unwrap();
    assert!(header.starts_with("CMS No,Title,"));
    assert!(header.ends_with("Duration,Holder Cell No,Holder Chamber No"));

    let row = lines.next().unwrap();
    assert!(row.contains("\"Aslam, Akram vs The State\""));
    assert!(row.ends_with("1d 01h 00m 00s,0300-1,C-12"));
    assert!(lines.next().is_none());
  }

  #[test]
  fn missing_holder_leaves_join_columns_blank() {
    let mut store = RecordStore::new();
    store.append_file(file("A vs B"));
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap();
    let csv = render_rows(store.files(), &store, now).unwrap();
    assert!(csv.lines().nth(1).unwrap().ends_with("00h 00m 05s,,"));
  }
}
