//! The query/report engine.
//!
//! Derives read-only views over the file sequence: the five dashboard
//! facets, the six-field search, a single-column stable sort, and fixed-size
//! pagination. Nothing here mutates a [`RecordStore`].

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _};

use crate::{
  clock::{court_date, court_tomorrow, format_instant},
  duration::CustodyDuration,
  file::FileRecord,
  record::RecordStore,
};

/// Rows per report page.
pub const PAGE_SIZE: usize = 10;

/// A file is overdue once it has been out for strictly longer than this many
/// days.
pub const OVERDUE_DAYS: i64 = 10;

// ─── Facets ──────────────────────────────────────────────────────────────────

/// The fixed dashboard filters.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Facet {
  DeliveriesToday,
  ReturnsToday,
  Pending,
  TomorrowHearings,
  Overdue,
}

impl Facet {
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  /// Whether `file` belongs to this facet at `now`.
  pub fn matches(self, file: &FileRecord, now: DateTime<Utc>) -> bool {
    match self {
      Self::DeliveriesToday => court_date(file.delivered_at) == court_date(now),
      Self::ReturnsToday => {
        file.returned && file.returned_at.is_some_and(|at| court_date(at) == court_date(now))
      }
      Self::Pending => !file.returned,
      Self::TomorrowHearings => file.date == court_tomorrow(now),
      Self::Overdue => is_overdue(file, now),
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Self::DeliveriesToday => "Deliveries today",
      Self::ReturnsToday => "Returns today",
      Self::Pending => "Pending",
      Self::TomorrowHearings => "Tomorrow's hearings",
      Self::Overdue => "Overdue",
    }
  }
}

/// Unreturned and out for strictly more than [`OVERDUE_DAYS`].
pub fn is_overdue(file: &FileRecord, now: DateTime<Utc>) -> bool {
  !file.returned && now - file.delivered_at > TimeDelta::days(OVERDUE_DAYS)
}

/// Rows of `store` in `facet`, in insertion order.
pub fn facet_rows(store: &RecordStore, facet: Facet, now: DateTime<Utc>) -> Vec<FileRecord> {
  store.files().iter().filter(|f| facet.matches(f, now)).cloned().collect()
}

/// Like [`facet_rows`] for a facet named by string. An unrecognised key
/// yields no rows and is logged.
pub fn facet_rows_by_key(store: &RecordStore, key: &str, now: DateTime<Utc>) -> Vec<FileRecord> {
  match key.parse::<Facet>() {
    Ok(facet) => facet_rows(store, facet, now),
    Err(_) => {
      tracing::warn!(facet = key, "unknown report facet; showing no rows");
      Vec::new()
    }
  }
}

/// Row counts for every facet, in [`Facet`] order.
pub fn facet_totals(store: &RecordStore, now: DateTime<Utc>) -> Vec<(Facet, usize)> {
  Facet::all()
    .map(|facet| (facet, store.files().iter().filter(|f| facet.matches(f, now)).count()))
    .collect()
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// The six independent search filters. Each is a case-insensitive substring
/// match; a missing or blank filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
  pub title:          Option<String>,
  pub cms_no:         Option<String>,
  pub holder:         Option<String>,
  pub fir_no:         Option<String>,
  pub fir_year:       Option<String>,
  pub police_station: Option<String>,
}

impl SearchFilters {
  pub fn matches(&self, file: &FileRecord) -> bool {
    contains(&self.title, Some(&file.title))
      && contains(&self.cms_no, Some(&file.cms_no))
      && contains(&self.holder, Some(&file.holder_name))
      && contains(&self.fir_no, file.fir_no.as_deref())
      && contains(&self.fir_year, file.fir_year.as_deref())
      && contains(&self.police_station, file.police_station.as_deref())
  }

  pub fn is_empty(&self) -> bool {
    [
      &self.title,
      &self.cms_no,
      &self.holder,
      &self.fir_no,
      &self.fir_year,
      &self.police_station,
    ]
    .into_iter()
    .all(|f| blank(f).is_none())
  }
}

fn blank(filter: &Option<String>) -> Option<&str> {
  filter.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains(filter: &Option<String>, value: Option<&str>) -> bool {
  match blank(filter) {
    None => true,
    Some(needle) => value.is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase())),
  }
}

/// Rows of `store` matching every filter, in insertion order.
pub fn search_rows(store: &RecordStore, filters: &SearchFilters) -> Vec<FileRecord> {
  store.files().iter().filter(|f| filters.matches(f)).cloned().collect()
}

// ─── Columns ─────────────────────────────────────────────────────────────────

/// Every column a report shows, in display order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Column {
  CmsNo,
  Title,
  CaseType,
  Nature,
  /// Synthetic: FIR number, year, section and police station together.
  CriminalDetails,
  DateType,
  Date,
  SwalFormNo,
  SwalDate,
  DeliveredTo,
  HolderType,
  DeliveredAt,
  Returned,
  ReturnedAt,
  CourtName,
  ClerkName,
}

/// The value a column sorts on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
  Instant(Option<DateTime<Utc>>),
  Day(Option<NaiveDate>),
  Text(String),
}

impl Column {
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  pub fn header(self) -> &'static str {
    match self {
      Self::CmsNo => "CMS No",
      Self::Title => "Title",
      Self::CaseType => "Case Type",
      Self::Nature => "Nature",
      Self::CriminalDetails => "Criminal Details",
      Self::DateType => "Date Type",
      Self::Date => "Date",
      Self::SwalFormNo => "SWAL Form No",
      Self::SwalDate => "SWAL Date",
      Self::DeliveredTo => "Delivered To",
      Self::HolderType => "Holder Type",
      Self::DeliveredAt => "Delivered At",
      Self::Returned => "Returned",
      Self::ReturnedAt => "Returned At",
      Self::CourtName => "Court",
      Self::ClerkName => "Clerk",
    }
  }

  pub fn is_temporal(self) -> bool {
    matches!(self, Self::Date | Self::SwalDate | Self::DeliveredAt | Self::ReturnedAt)
  }

  /// The cell text for `file`.
  pub fn display(self, file: &FileRecord) -> String {
    match self {
      Self::CmsNo => file.cms_no.clone(),
      Self::Title => file.title.clone(),
      Self::CaseType => file.case_type.to_string(),
      Self::Nature => file.nature.clone(),
      Self::CriminalDetails => file.criminal_details(),
      Self::DateType => file.date_type.to_string(),
      Self::Date => file.date.to_string(),
      Self::SwalFormNo => file.swal_form_no.clone().unwrap_or_default(),
      Self::SwalDate => file.swal_date.map(|d| d.to_string()).unwrap_or_default(),
      Self::DeliveredTo => file.holder_name.clone(),
      Self::HolderType => file.holder_type.to_string(),
      Self::DeliveredAt => format_instant(file.delivered_at),
      Self::Returned => if file.returned { "Yes" } else { "No" }.to_owned(),
      Self::ReturnedAt => file.returned_at.map(format_instant).unwrap_or_default(),
      Self::CourtName => file.court_name.clone(),
      Self::ClerkName => file.clerk_name.clone(),
    }
  }

  fn sort_key(self, file: &FileRecord) -> SortKey {
    match self {
      Self::Date => SortKey::Day(Some(file.date)),
      Self::SwalDate => SortKey::Day(file.swal_date),
      Self::DeliveredAt => SortKey::Instant(Some(file.delivered_at)),
      Self::ReturnedAt => SortKey::Instant(file.returned_at),
      // Concatenation of the raw sub-fields, not the display form.
      Self::CriminalDetails => SortKey::Text(
        [&file.fir_no, &file.fir_year, &file.fir_us, &file.police_station]
          .into_iter()
          .filter_map(|f| f.as_deref())
          .collect(),
      ),
      other => SortKey::Text(other.display(file)),
    }
  }

  /// Case-sensitive for text, chronological for temporal columns. Rows
  /// without a value sort first.
  pub fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
    self.sort_key(a).cmp(&self.sort_key(b))
  }
}

// ─── Sort state ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
  #[default]
  #[strum(serialize = "asc")]
  Asc,
  #[strum(serialize = "desc")]
  Desc,
}

impl Direction {
  pub fn flipped(self) -> Self {
    match self {
      Self::Asc => Self::Desc,
      Self::Desc => Self::Asc,
    }
  }
}

/// At most one active sort column, plus its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
  pub column:    Option<Column>,
  pub direction: Direction,
}

impl SortState {
  pub fn by(column: Column, direction: Direction) -> Self {
    Self { column: Some(column), direction }
  }

  /// A header click: the active column flips direction, any other column
  /// becomes active ascending.
  pub fn toggle(&mut self, column: Column) {
    if self.column == Some(column) {
      self.direction = self.direction.flipped();
    } else {
      *self = Self::by(column, Direction::Asc);
    }
  }
}

/// Row indices of `rows` in sorted order. Stable: ties keep insertion order
/// in either direction.
fn sorted_order(rows: &[FileRecord], sort: SortState) -> Vec<usize> {
  let mut order: Vec<usize> = (0..rows.len()).collect();
  if let Some(column) = sort.column {
    order.sort_by(|&a, &b| {
      let ord = column.compare(&rows[a], &rows[b]);
      match sort.direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
      }
    });
  }
  order
}

// ─── Report view ─────────────────────────────────────────────────────────────

/// Where a view's rows came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReportSource {
  #[default]
  Empty,
  Facet(Facet),
  /// A facet key that did not parse.
  UnknownFacet(String),
  Search(SearchFilters),
}

/// A filtered, sorted, paginated view over a snapshot of the file rows.
///
/// `rows` stays in insertion order; sorting only permutes `order`, so every
/// re-sort starts from insertion order and stays stable.
#[derive(Debug, Clone, Default)]
pub struct ReportView {
  source: ReportSource,
  rows:   Vec<FileRecord>,
  order:  Vec<usize>,
  sort:   SortState,
  page:   usize,
}

/// One page of a [`ReportView`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<'a> {
  /// 1-based.
  pub number:      usize,
  pub total_pages: usize,
  pub total_rows:  usize,
  pub rows:        Vec<&'a FileRecord>,
}

impl ReportView {
  pub fn new() -> Self { Self { page: 1, ..Self::default() } }

  /// Show `facet`. Resets to page 1.
  pub fn select_facet(&mut self, store: &RecordStore, facet: Facet, now: DateTime<Utc>) {
    self.load(ReportSource::Facet(facet), facet_rows(store, facet, now));
  }

  /// Show the facet named `key`; an unknown key shows no rows.
  pub fn select_facet_key(&mut self, store: &RecordStore, key: &str, now: DateTime<Utc>) {
    let source = match key.parse::<Facet>() {
      Ok(facet) => ReportSource::Facet(facet),
      Err(_) => ReportSource::UnknownFacet(key.to_owned()),
    };
    self.load(source, facet_rows_by_key(store, key, now));
  }

  /// Show the rows matching `filters`. Resets to page 1.
  pub fn run_search(&mut self, store: &RecordStore, filters: SearchFilters) {
    let rows = search_rows(store, &filters);
    self.load(ReportSource::Search(filters), rows);
  }

  /// Re-evaluate the current source against fresh data, keeping the sort
  /// and the page (clamped to the new last page).
  pub fn refresh(&mut self, store: &RecordStore, now: DateTime<Utc>) {
    self.rows = match &self.source {
      ReportSource::Empty | ReportSource::UnknownFacet(_) => Vec::new(),
      ReportSource::Facet(facet) => facet_rows(store, *facet, now),
      ReportSource::Search(filters) => search_rows(store, filters),
    };
    self.order = sorted_order(&self.rows, self.sort);
    self.page = self.page.clamp(1, self.total_pages().max(1));
  }

  fn load(&mut self, source: ReportSource, rows: Vec<FileRecord>) {
    self.source = source;
    self.rows = rows;
    self.order = sorted_order(&self.rows, self.sort);
    self.page = 1;
  }

  /// A header click on `column`. Keeps the current page.
  pub fn toggle_sort(&mut self, column: Column) {
    self.sort.toggle(column);
    self.order = sorted_order(&self.rows, self.sort);
  }

  /// Set the sort outright. Keeps the current page.
  pub fn set_sort(&mut self, sort: SortState) {
    self.sort = sort;
    self.order = sorted_order(&self.rows, self.sort);
  }

  pub fn set_page(&mut self, page: usize) { self.page = page.max(1); }

  pub fn source(&self) -> &ReportSource { &self.source }

  pub fn sort(&self) -> SortState { self.sort }

  pub fn page_number(&self) -> usize { self.page }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn total_pages(&self) -> usize { self.rows.len().div_ceil(PAGE_SIZE) }

  /// All rows in display order.
  pub fn sorted_rows(&self) -> impl Iterator<Item = &FileRecord> + '_ {
    self.order.iter().map(|&i| &self.rows[i])
  }

  /// Page `number` (1-based). Past the end yields an empty page.
  pub fn page(&self, number: usize) -> Page<'_> {
    let number = number.max(1);
    let rows = match (number - 1).checked_mul(PAGE_SIZE) {
      Some(offset) => self.sorted_rows().skip(offset).take(PAGE_SIZE).collect(),
      None => Vec::new(),
    };
    Page { number, total_pages: self.total_pages(), total_rows: self.len(), rows }
  }

  pub fn current_page(&self) -> Page<'_> { self.page(self.page) }

  /// Whether any visible row is still out, i.e. its duration is ticking.
  pub fn has_live_rows(&self) -> bool { self.current_page().rows.iter().any(|f| f.is_pending()) }
}

// ─── Presentation rows ───────────────────────────────────────────────────────

/// A file with its derived presentation fields, computed at render time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow<'a> {
  #[serde(flatten)]
  pub file:     &'a FileRecord,
  pub duration: String,
  pub overdue:  bool,
}

impl<'a> ReportRow<'a> {
  pub fn new(file: &'a FileRecord, now: DateTime<Utc>) -> Self {
    Self {
      file,
      duration: CustodyDuration::of(file, now).to_string(),
      overdue: is_overdue(file, now),
    }
  }
}
