//! Plain-text tables for the terminal.

use chrono::{DateTime, Utc};
use docket_core::{
  duration::CustodyDuration,
  profile::{Profile, ProfileDetails},
  query::{Column, Direction, Page, ReportSource, ReportView, is_overdue},
};
use docket_mirror::Stats;

/// Columns shown in terminal tables. The CSV export carries all of them.
pub const TABLE_COLUMNS: [Column; 7] = [
  Column::CmsNo,
  Column::Title,
  Column::DeliveredTo,
  Column::HolderType,
  Column::Date,
  Column::DeliveredAt,
  Column::Returned,
];

const MAX_CELL: usize = 32;

fn clip(cell: String) -> String {
  if cell.chars().count() <= MAX_CELL {
    return cell;
  }
  let mut clipped: String = cell.chars().take(MAX_CELL - 1).collect();
  clipped.push('…');
  clipped
}

/// Lay out `rows` under `headers` with two-space gutters.
pub fn table(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (w, cell) in widths.iter_mut().zip(row) {
      *w = (*w).max(cell.chars().count());
    }
  }

  let line = |cells: &[String]| {
    cells
      .iter()
      .zip(&widths)
      .map(|(c, w)| format!("{c:<w$}"))
      .collect::<Vec<_>>()
      .join("  ")
      .trim_end()
      .to_owned()
  };

  let mut out = Vec::with_capacity(rows.len() + 2);
  out.push(line(headers));
  out.push(widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("  "));
  out.extend(rows.iter().map(|r| line(r.as_slice())));
  out
}

fn title(view: &ReportView) -> String {
  match view.source() {
    ReportSource::Empty => "No report selected".to_owned(),
    ReportSource::Facet(facet) => facet.title().to_owned(),
    ReportSource::UnknownFacet(key) => format!("Unknown report {key:?}"),
    ReportSource::Search(_) => "Search results".to_owned(),
  }
}

fn sort_marker(view: &ReportView, column: Column) -> &'static str {
  let sort = view.sort();
  match (sort.column == Some(column), sort.direction) {
    (false, _) => "",
    (true, Direction::Asc) => " ▲",
    (true, Direction::Desc) => " ▼",
  }
}

/// One page of a report: heading, table, and a page footer.
pub fn report_page(view: &ReportView, page: &Page<'_>, now: DateTime<Utc>) -> Vec<String> {
  let mut headers: Vec<String> = TABLE_COLUMNS
    .iter()
    .map(|c| format!("{}{}", c.header(), sort_marker(view, *c)))
    .collect();
  headers.push("Duration".to_owned());

  let rows: Vec<Vec<String>> = page
    .rows
    .iter()
    .map(|file| {
      let mut cells: Vec<String> = TABLE_COLUMNS.iter().map(|c| clip(c.display(file))).collect();
      let mut duration = CustodyDuration::of(file, now).to_string();
      if is_overdue(file, now) {
        duration.push_str(" !");
      }
      cells.push(duration);
      cells
    })
    .collect();

  let mut out = vec![format!("{} ({} files)", title(view), page.total_rows), String::new()];
  if rows.is_empty() {
    out.push("No files.".to_owned());
  } else {
    out.extend(table(&headers, &rows));
  }
  out.push(String::new());
  out.push(format!("Page {} of {}", page.number, page.total_pages.max(1)));
  out
}

pub fn profiles<'a>(profiles: impl IntoIterator<Item = &'a Profile>) -> Vec<String> {
  let headers = ["Name", "Type", "Cell No", "Details"].map(String::from);
  let rows: Vec<Vec<String>> = profiles
    .into_iter()
    .map(|p| {
      vec![p.name.clone(), p.kind().to_string(), p.cell_no.clone(), clip(details(&p.details))]
    })
    .collect();
  if rows.is_empty() {
    return vec!["No profiles.".to_owned()];
  }
  table(&headers, &rows)
}

fn details(details: &ProfileDetails) -> String {
  match details {
    ProfileDetails::Munshi { chamber_no, advocate_name } => {
      format!("chamber {chamber_no}, for {advocate_name}")
    }
    ProfileDetails::Advocate { chamber_no } => format!("chamber {chamber_no}"),
    ProfileDetails::Colleague { designation, posted_at } => [designation, posted_at]
      .into_iter()
      .flatten()
      .cloned()
      .collect::<Vec<_>>()
      .join(", "),
    ProfileDetails::Other { relation, .. } => relation.clone().unwrap_or_default(),
  }
}

pub fn stats(stats: &Stats) -> Vec<String> {
  let mut out = vec![
    format!("Files:            {}", stats.files),
    format!("Profiles:         {}", stats.profiles),
    format!("Queued backups:   {}", stats.offline_queue),
    format!("Files entered:    {}", stats.analytics.files_entered()),
    format!("Searches:         {}", stats.analytics.searches_performed()),
    format!("Backups created:  {}", stats.analytics.backups_created()),
    format!("Replica:          {}", if stats.replica_online { "online" } else { "unavailable" }),
    String::new(),
  ];
  let headers = ["Report", "Files"].map(String::from);
  let rows: Vec<Vec<String>> = stats
    .facets
    .iter()
    .map(|t| vec![t.facet.title().to_owned(), t.rows.to_string()])
    .collect();
  out.extend(table(&headers, &rows));
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_pads_columns_to_widest_cell() {
    let headers = ["A", "Bee"].map(String::from);
    let rows = vec![vec!["long cell".to_owned(), "x".to_owned()]];
    let lines = table(&headers, &rows);
    assert_eq!(lines[0], "A          Bee");
    assert_eq!(lines[2], "long cell  x");
  }

  #[test]
  fn long_cells_are_clipped() {
    let clipped = clip("x".repeat(40));
    assert_eq!(clipped.chars().count(), MAX_CELL);
    assert!(clipped.ends_with('…'));
  }

  #[test]
  fn empty_report_says_so() {
    let view = ReportView::new();
    let lines = report_page(&view, &view.current_page(), Utc::now());
    assert!(lines.contains(&"No files.".to_owned()));
    assert_eq!(lines.last().unwrap(), "Page 1 of 1");
  }
}
