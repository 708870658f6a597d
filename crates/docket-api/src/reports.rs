//! Handlers for report, search and statistics endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/:facet?sort=&dir=&page=` | One page of a facet; unknown facets are empty |
//! | `GET`  | `/reports/:facet/csv?sort=&dir=` | Every row of the facet as CSV |
//! | `GET`  | `/search?title=&cmsNo=&…` | One page of search results; blank fields match everything |
//! | `GET`  | `/stats` | Totals, analytics and facet counts |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use docket_core::query::{
  Column, Direction, ReportRow, ReportSource, ReportView, SearchFilters, SortState,
};
use docket_mirror::{Backend, Stats};
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Sort and page selection shared by every report endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
  pub sort: Option<Column>,
  #[serde(default)]
  pub dir:  Direction,
  pub page: Option<usize>,
}

impl ViewParams {
  fn apply(&self, view: &mut ReportView) {
    if let Some(column) = self.sort {
      view.set_sort(SortState::by(column, self.dir));
    }
    if let Some(page) = self.page {
      view.set_page(page);
    }
  }
}

/// Search fields plus view selection. Kept flat: query-string decoding does
/// not support flattened numeric fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
  pub title:          Option<String>,
  pub cms_no:         Option<String>,
  pub holder:         Option<String>,
  pub fir_no:         Option<String>,
  pub fir_year:       Option<String>,
  pub police_station: Option<String>,
  pub sort:           Option<Column>,
  #[serde(default)]
  pub dir:            Direction,
  pub page:           Option<usize>,
}

impl SearchParams {
  fn split(self) -> (SearchFilters, ViewParams) {
    let filters = SearchFilters {
      title:          self.title,
      cms_no:         self.cms_no,
      holder:         self.holder,
      fir_no:         self.fir_no,
      fir_year:       self.fir_year,
      police_station: self.police_station,
    };
    (filters, ViewParams { sort: self.sort, dir: self.dir, page: self.page })
  }
}

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage<'a> {
  pub source:      &'a ReportSource,
  pub sort:        SortState,
  pub page:        usize,
  pub total_pages: usize,
  pub total_rows:  usize,
  pub rows:        Vec<ReportRow<'a>>,
}

impl<'a> ReportPage<'a> {
  pub fn of(view: &'a ReportView, now: DateTime<Utc>) -> Self {
    let page = view.current_page();
    Self {
      source:      view.source(),
      sort:        view.sort(),
      page:        page.number,
      total_pages: page.total_pages,
      total_rows:  page.total_rows,
      rows:        page.rows.into_iter().map(|f| ReportRow::new(f, now)).collect(),
    }
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /reports/:facet`
pub async fn facet<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Path(key): Path<String>,
  Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
  let now = Utc::now();
  let mut view = state.docket.lock().await.report(&key, now);
  params.apply(&mut view);
  Ok(Json(ReportPage::of(&view, now)).into_response())
}

/// `GET /reports/:facet/csv`
pub async fn facet_csv<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Path(key): Path<String>,
  Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
  let now = Utc::now();
  let docket = state.docket.lock().await;
  let mut view = docket.report(&key, now);
  params.apply(&mut view);
  let body = docket.export_csv(&view, now)?;
  let disposition = format!("attachment; filename=\"{key}.csv\"");
  Ok(
    (
      [(header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()), (
        header::CONTENT_DISPOSITION,
        disposition,
      )],
      body,
    )
      .into_response(),
  )
}

/// `GET /search`
pub async fn search<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
  Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
  let (filters, view_params) = params.split();
  let mut view = state.docket.lock().await.search(filters)?;
  view_params.apply(&mut view);
  Ok(Json(ReportPage::of(&view, Utc::now())).into_response())
}

/// `GET /stats`
pub async fn stats<B: Backend>(
  _auth: Authenticated,
  State(state): State<AppState<B>>,
) -> Result<Json<Stats>, ApiError> {
  Ok(Json(state.docket.lock().await.stats(Utc::now())))
}
