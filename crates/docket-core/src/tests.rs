//! Engine-level tests over `RecordStore` and the query layer.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};

use crate::{
  file::{CaseType, DateType, FileRecord},
  profile::{Profile, ProfileDetails, ProfileType},
  query::{
    Column, Direction, Facet, PAGE_SIZE, ReportSource, ReportView, SearchFilters, SortState,
    facet_rows, facet_rows_by_key, facet_totals, is_overdue,
  },
  record::{RecordStore, Upsert},
  snapshot::Snapshot,
  user::UserProfile,
};

fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
}

fn file(cms_no: &str, delivered_at: DateTime<Utc>) -> FileRecord {
  FileRecord {
    cms_no: cms_no.into(),
    title: format!("Petitioner {cms_no} vs State"),
    case_type: CaseType::Civil,
    nature: "Recovery".into(),
    fir_no: None,
    fir_year: None,
    fir_us: None,
    police_station: None,
    date_type: DateType::Hearing,
    date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
    swal_form_no: None,
    swal_date: None,
    holder_name: "Ali Khan".into(),
    holder_type: ProfileType::Advocate,
    delivered_at,
    returned: false,
    returned_at: None,
    court_name: "Sessions Court".into(),
    clerk_name: "Imran".into(),
  }
}

fn advocate(name: &str, cell_no: &str) -> Profile {
  Profile {
    name:    name.into(),
    cell_no: cell_no.into(),
    photo:   None,
    details: ProfileDetails::Advocate { chamber_no: "12".into() },
  }
}

fn user() -> UserProfile {
  UserProfile {
    clerk_name: "Imran".into(),
    judge_name: "Justice Rana".into(),
    court_name: "Sessions Court".into(),
    mobile:     "0300-0000000".into(),
    cnic:       "35202-1234567-1".into(),
    pin:        Some("4321".into()),
    email:      "imran@example.pk".into(),
    photo:      None,
  }
}

fn store_with(n: usize) -> RecordStore {
  let mut store = RecordStore::new();
  let t0 = at(2024, 1, 1, 0, 0, 0);
  for i in 1..=n {
    store.append_file(file(&i.to_string(), t0));
  }
  store
}

// ─── Record store ────────────────────────────────────────────────────────────

#[test]
fn append_preserves_fifo_order() {
  let mut store = RecordStore::new();
  let t0 = at(2024, 1, 1, 0, 0, 0);
  for (i, cms) in ["9", "3", "9", "1"].into_iter().enumerate() {
    store.append_file(file(cms, t0));
    assert_eq!(store.files().len(), i + 1);
  }
  let order: Vec<_> = store.files().iter().map(|f| f.cms_no.as_str()).collect();
  assert_eq!(order, ["9", "3", "9", "1"]);
}

#[test]
fn second_return_is_a_no_op() {
  let mut store = store_with(1);
  let first = at(2024, 1, 3, 10, 0, 0);

  let returned = store.mark_returned("1", first).cloned().unwrap();
  assert!(returned.returned);
  assert_eq!(returned.returned_at, Some(first));

  assert!(store.mark_returned("1", at(2024, 1, 4, 0, 0, 0)).is_none());
  assert_eq!(store.files()[0], returned);
}

#[test]
fn return_closes_the_oldest_open_cycle() {
  let mut store = RecordStore::new();
  store.append_file(file("5", at(2024, 1, 1, 0, 0, 0)));
  store.append_file(file("5", at(2024, 1, 2, 0, 0, 0)));

  store.mark_returned("5", at(2024, 1, 3, 0, 0, 0));
  assert!(store.files()[0].returned);
  assert!(!store.files()[1].returned);

  store.mark_returned("5", at(2024, 1, 4, 0, 0, 0));
  assert!(store.files()[1].returned);
}

#[test]
fn return_of_unknown_cms_no_changes_nothing() {
  let mut store = store_with(2);
  let before = store.clone();
  assert!(store.mark_returned("404", at(2024, 1, 2, 0, 0, 0)).is_none());
  assert_eq!(store, before);
}

#[test]
fn upsert_same_key_keeps_one_profile_with_latest_cell_no() {
  let mut store = RecordStore::new();
  assert_eq!(store.upsert_profile(advocate("Ali Khan", "0300-1111111")), Upsert::Inserted);
  assert_eq!(store.upsert_profile(advocate("Ali Khan", "0300-2222222")), Upsert::Replaced);

  assert_eq!(store.profiles().len(), 1);
  assert_eq!(store.profiles()[0].cell_no, "0300-2222222");
}

#[test]
fn same_name_different_type_is_a_different_profile() {
  let mut store = RecordStore::new();
  store.upsert_profile(advocate("Ali Khan", "1"));
  store.upsert_profile(Profile {
    name:    "Ali Khan".into(),
    cell_no: "2".into(),
    photo:   Some("p.png".into()),
    details: ProfileDetails::Colleague { designation: None, posted_at: None },
  });
  assert_eq!(store.profiles().len(), 2);
}

#[test]
fn deleting_a_profile_leaves_files_alone() {
  let mut store = store_with(3);
  store.upsert_profile(advocate("Ali Khan", "1"));

  assert_eq!(store.delete_profile("Ali Khan", ProfileType::Advocate), 1);
  assert!(store.profiles().is_empty());
  assert_eq!(store.files().len(), 3);
  assert!(store.holder_of(&store.files()[0]).is_none());
}

// ─── Facets ──────────────────────────────────────────────────────────────────

#[test]
fn overdue_boundary_is_exclusive() {
  let f = file("1", at(2024, 1, 1, 0, 0, 0));

  assert!(is_overdue(&f, at(2024, 1, 12, 0, 0, 1)));
  assert!(!is_overdue(&f, at(2024, 1, 10, 23, 59, 59)));
  assert!(!is_overdue(&f, at(2024, 1, 11, 0, 0, 0)));
  assert!(is_overdue(&f, at(2024, 1, 11, 0, 0, 1)));
}

#[test]
fn returned_files_are_never_overdue() {
  let mut store = store_with(1);
  store.mark_returned("1", at(2024, 1, 2, 0, 0, 0));
  assert!(facet_rows(&store, Facet::Overdue, at(2024, 3, 1, 0, 0, 0)).is_empty());
}

#[test]
fn today_facets_use_court_calendar_day() {
  let mut store = RecordStore::new();
  // 20:00 UTC on the 1st is already the 2nd in court time.
  store.append_file(file("1", at(2024, 1, 1, 20, 0, 0)));
  store.append_file(file("2", at(2024, 1, 1, 18, 0, 0)));
  store.mark_returned("2", at(2024, 1, 2, 3, 0, 0));

  let now = at(2024, 1, 2, 12, 0, 0);
  let delivered: Vec<_> = facet_rows(&store, Facet::DeliveriesToday, now)
    .into_iter()
    .map(|f| f.cms_no)
    .collect();
  assert_eq!(delivered, ["1"]);

  let returned: Vec<_> = facet_rows(&store, Facet::ReturnsToday, now)
    .into_iter()
    .map(|f| f.cms_no)
    .collect();
  assert_eq!(returned, ["2"]);
}

#[test]
fn tomorrow_hearings_match_next_court_day() {
  let mut store = RecordStore::new();
  let mut hearing = file("1", at(2024, 1, 1, 0, 0, 0));
  hearing.date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
  store.append_file(hearing);
  store.append_file(file("2", at(2024, 1, 1, 0, 0, 0)));

  // 19:30 UTC on the 14th is the 15th in court time.
  let rows = facet_rows(&store, Facet::TomorrowHearings, at(2024, 1, 14, 19, 30, 0));
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].cms_no, "1");
}

#[test]
fn unknown_facet_key_is_empty() {
  let store = store_with(3);
  assert!(facet_rows_by_key(&store, "yesterday", at(2024, 1, 1, 0, 0, 0)).is_empty());
  assert_eq!(facet_rows_by_key(&store, "pending", at(2024, 1, 1, 0, 0, 0)).len(), 3);
}

#[test]
fn totals_cover_every_facet() {
  let store = store_with(4);
  let totals = facet_totals(&store, at(2024, 1, 20, 0, 0, 0));
  assert_eq!(totals.len(), 5);
  assert!(totals.contains(&(Facet::Pending, 4)));
  assert!(totals.contains(&(Facet::Overdue, 4)));
  assert!(totals.contains(&(Facet::DeliveriesToday, 0)));
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[test]
fn search_filters_are_case_insensitive_and_combined() {
  let mut store = RecordStore::new();
  let mut criminal = file("100", at(2024, 1, 1, 0, 0, 0));
  criminal.case_type = CaseType::Criminal;
  criminal.fir_no = Some("55".into());
  criminal.fir_year = Some("2023".into());
  criminal.police_station = Some("Saddar".into());
  store.append_file(criminal);
  store.append_file(file("101", at(2024, 1, 1, 0, 0, 0)));

  let mut view = ReportView::new();
  view.run_search(&store, SearchFilters {
    police_station: Some("sadd".into()),
    ..SearchFilters::default()
  });
  assert_eq!(view.len(), 1);

  view.run_search(&store, SearchFilters {
    police_station: Some("sadd".into()),
    cms_no: Some("101".into()),
    ..SearchFilters::default()
  });
  assert!(view.is_empty());

  view.run_search(&store, SearchFilters { holder: Some("  ALI ".into()), ..Default::default() });
  assert_eq!(view.len(), 2);
}

#[test]
fn blank_search_matches_everything() {
  let store = store_with(3);
  let filters = SearchFilters { title: Some("   ".into()), ..Default::default() };
  assert!(filters.is_empty());

  let mut view = ReportView::new();
  view.run_search(&store, filters);
  assert_eq!(view.len(), 3);
  assert!(matches!(view.source(), ReportSource::Search(_)));
}

// ─── Sorting and pagination ──────────────────────────────────────────────────

#[test]
fn sort_on_equal_values_keeps_insertion_order() {
  let store = store_with(12);
  let mut view = ReportView::new();
  view.select_facet(&store, Facet::Pending, at(2024, 1, 2, 0, 0, 0));

  for direction in [Direction::Asc, Direction::Desc] {
    view.set_sort(SortState::by(Column::CourtName, direction));
    let order: Vec<_> = view.sorted_rows().map(|f| f.cms_no.clone()).collect();
    let expected: Vec<_> = (1..=12).map(|i| i.to_string()).collect();
    assert_eq!(order, expected);
  }
}

#[test]
fn temporal_columns_sort_chronologically() {
  let mut store = RecordStore::new();
  store.append_file(file("a", at(2024, 1, 10, 0, 0, 0)));
  store.append_file(file("b", at(2023, 12, 31, 0, 0, 0)));
  store.append_file(file("c", at(2024, 1, 2, 0, 0, 0)));

  let mut view = ReportView::new();
  view.select_facet(&store, Facet::Pending, at(2024, 1, 11, 0, 0, 0));
  view.toggle_sort(Column::DeliveredAt);
  let order: Vec<_> = view.sorted_rows().map(|f| f.cms_no.as_str()).collect();
  assert_eq!(order, ["b", "c", "a"]);

  view.toggle_sort(Column::DeliveredAt);
  assert_eq!(view.sort().direction, Direction::Desc);
  let order: Vec<_> = view.sorted_rows().map(|f| f.cms_no.as_str()).collect();
  assert_eq!(order, ["a", "c", "b"]);
}

#[test]
fn text_columns_compare_case_sensitively() {
  let mut store = RecordStore::new();
  let mut lower = file("1", at(2024, 1, 1, 0, 0, 0));
  lower.title = "abc".into();
  let mut upper = file("2", at(2024, 1, 1, 0, 0, 0));
  upper.title = "Xyz".into();
  store.append_file(lower);
  store.append_file(upper);

  let mut view = ReportView::new();
  view.select_facet(&store, Facet::Pending, at(2024, 1, 1, 1, 0, 0));
  view.set_sort(SortState::by(Column::Title, Direction::Asc));
  let order: Vec<_> = view.sorted_rows().map(|f| f.title.as_str()).collect();
  assert_eq!(order, ["Xyz", "abc"]);
}

#[test]
fn clicking_another_column_resets_to_ascending() {
  let mut sort = SortState::default();
  sort.toggle(Column::Title);
  sort.toggle(Column::Title);
  assert_eq!(sort, SortState::by(Column::Title, Direction::Desc));
  sort.toggle(Column::CmsNo);
  assert_eq!(sort, SortState::by(Column::CmsNo, Direction::Asc));
}

#[test]
fn twenty_five_rows_paginate_by_ten() {
  let store = store_with(25);
  let mut view = ReportView::new();
  view.select_facet(&store, Facet::Pending, at(2024, 1, 2, 0, 0, 0));

  let cms = |page: usize| -> Vec<String> {
    view.page(page).rows.into_iter().map(|f| f.cms_no.clone()).collect()
  };

  assert_eq!(view.total_pages(), 3);
  assert_eq!(cms(1), (1..=10).map(|i| i.to_string()).collect::<Vec<_>>());
  assert_eq!(cms(3), ["25"]);
  let past_end = view.page(4);
  assert!(past_end.rows.is_empty());
  assert_eq!(past_end.total_rows, 25);
}

#[test]
fn huge_page_numbers_are_empty() {
  let store = store_with(25);
  let mut view = ReportView::new();
  view.select_facet(&store, Facet::Pending, at(2024, 1, 2, 0, 0, 0));

  for number in [usize::MAX, usize::MAX / PAGE_SIZE + 1, 1_844_674_407_370_955_163] {
    let page = view.page(number);
    assert!(page.rows.is_empty(), "page {number} returned rows");
    assert_eq!(page.total_pages, 3);
  }

  view.set_page(usize::MAX);
  assert!(view.current_page().rows.is_empty());
  assert!(!view.has_live_rows());
}

#[test]
fn new_facet_resets_page_but_sort_keeps_it() {
  let store = store_with(25);
  let now = at(2024, 1, 2, 0, 0, 0);
  let mut view = ReportView::new();
  view.select_facet(&store, Facet::Pending, now);
  view.set_page(3);

  view.toggle_sort(Column::CmsNo);
  assert_eq!(view.page_number(), 3);

  view.select_facet(&store, Facet::Overdue, at(2024, 2, 1, 0, 0, 0));
  assert_eq!(view.page_number(), 1);
}

#[test]
fn refresh_picks_up_new_rows_and_clamps_page() {
  let mut store = store_with(11);
  let now = at(2024, 1, 2, 0, 0, 0);
  let mut view = ReportView::new();
  view.select_facet(&store, Facet::Pending, now);
  view.set_page(2);

  store.mark_returned("11", now);
  view.refresh(&store, now);
  assert_eq!(view.len(), 10);
  assert_eq!(view.page_number(), 1);
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[test]
fn export_then_import_round_trips_files_and_profiles() {
  let mut store = store_with(3);
  store.upsert_profile(advocate("Ali Khan", "0300-1"));
  store.set_user_profile(user());
  store.mark_returned("2", at(2024, 1, 5, 0, 0, 0));
  store.analytics_mut().record_file_entered();

  let json = Snapshot::export(&store).to_json().unwrap();
  let value: serde_json::Value = serde_json::from_str(&json).unwrap();
  assert!(value["userProfile"]["pin"].is_null());
  assert_eq!(value["userProfile"]["cnic"], "35***-*******-1");

  let mut fresh = RecordStore::new();
  fresh.replace_all(Snapshot::from_json(&json).unwrap());
  assert_eq!(fresh.files(), store.files());
  assert_eq!(fresh.profiles(), store.profiles());
  assert_eq!(fresh.analytics(), store.analytics());

  // The live store still holds the clear values.
  assert_eq!(store.user_profile().unwrap().cnic, "35202-1234567-1");
  assert_eq!(store.user_profile().unwrap().pin.as_deref(), Some("4321"));
}

#[test]
fn import_keeps_the_pin_already_in_memory() {
  let mut store = RecordStore::new();
  store.set_user_profile(user());
  let json = Snapshot::export(&store).to_json().unwrap();

  store.replace_all(Snapshot::from_json(&json).unwrap());
  let restored = store.user_profile().unwrap();
  assert_eq!(restored.pin.as_deref(), Some("4321"));
  assert!(restored.verify_pin("4321").is_ok());
}

#[test]
fn import_replaces_rather_than_merges() {
  let mut store = store_with(5);
  let mut other = RecordStore::new();
  other.append_file(file("X", at(2024, 2, 1, 0, 0, 0)));
  let json = Snapshot::export(&other).to_json().unwrap();

  store.replace_all(Snapshot::from_json(&json).unwrap());
  assert_eq!(store.files().len(), 1);
  assert_eq!(store.files()[0].cms_no, "X");
}

#[test]
fn durations_tick_from_delivery_to_return() {
  let mut store = store_with(1);
  let now = at(2024, 1, 1, 0, 0, 0) + TimeDelta::hours(50);
  let view_row = crate::query::ReportRow::new(&store.files()[0], now);
  assert_eq!(view_row.duration, "2d 02h 00m 00s");

  store.mark_returned("1", at(2024, 1, 1, 3, 0, 0));
  let row = crate::query::ReportRow::new(&store.files()[0], now);
  assert_eq!(row.duration, "03h 00m 00s");
}
