//! `docket watch`: a live report whose pending durations tick once per
//! second.
//!
//! The ticker belongs to the displayed view. It is started when the page
//! shows a pending file, dropped when it shows none, and replaced whenever a
//! different report is selected.

use std::{
  io::{self, Write},
  time::Duration,
};

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
  cursor::{Hide, MoveTo, Show},
  event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
  execute, queue,
  terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
  },
};
use docket_core::{
  query::{Facet, ReportView, SortState},
  record::RecordStore,
};
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};

use crate::render;

const TICK: Duration = Duration::from_secs(1);
const POLL: Duration = Duration::from_millis(100);

// ─── Ticker ──────────────────────────────────────────────────────────────────

/// A repeating timer that stops when dropped.
pub struct Ticker {
  handle: JoinHandle<()>,
  rx:     mpsc::Receiver<()>,
}

impl Ticker {
  pub fn start(period: Duration) -> Self {
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(async move {
      let mut interval = tokio::time::interval(period);
      interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
      // The first tick completes immediately.
      interval.tick().await;
      loop {
        interval.tick().await;
        if tx.send(()).await.is_err() {
          break;
        }
      }
    });
    Self { handle, rx }
  }

  pub async fn tick(&mut self) -> Option<()> { self.rx.recv().await }

  pub fn is_running(&self) -> bool { !self.handle.is_finished() }
}

impl Drop for Ticker {
  fn drop(&mut self) { self.handle.abort(); }
}

async fn next_tick(ticker: &mut Option<Ticker>) {
  match ticker {
    Some(t) => {
      t.tick().await;
    }
    None => std::future::pending().await,
  }
}

// ─── Screen state ────────────────────────────────────────────────────────────

struct Screen<'a> {
  store:  &'a RecordStore,
  view:   ReportView,
  ticker: Option<Ticker>,
}

enum Action {
  Redraw,
  Ignore,
  Quit,
}

impl<'a> Screen<'a> {
  fn new(store: &'a RecordStore, facet: Facet, sort: SortState) -> Self {
    let mut view = ReportView::new();
    view.set_sort(sort);
    view.select_facet(store, facet, Utc::now());
    let mut screen = Self { store, view, ticker: None };
    screen.sync_ticker();
    screen
  }

  fn sync_ticker(&mut self) {
    match (self.view.has_live_rows(), self.ticker.is_some()) {
      (true, false) => self.ticker = Some(Ticker::start(TICK)),
      (false, true) => self.ticker = None,
      _ => {}
    }
  }

  fn tick(&mut self) {
    self.view.refresh(self.store, Utc::now());
    self.sync_ticker();
  }

  fn select(&mut self, facet: Facet) {
    self.ticker = None;
    self.view.select_facet(self.store, facet, Utc::now());
    self.sync_ticker();
  }

  fn current_facet(&self) -> Option<Facet> {
    match self.view.source() {
      docket_core::query::ReportSource::Facet(f) => Some(*f),
      _ => None,
    }
  }

  fn handle_key(&mut self, key: KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
      return Action::Ignore;
    }
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
      KeyCode::Right | KeyCode::Char('n') => {
        if self.view.page_number() < self.view.total_pages() {
          self.view.set_page(self.view.page_number() + 1);
        }
      }
      KeyCode::Left | KeyCode::Char('p') => {
        self.view.set_page(self.view.page_number().saturating_sub(1));
      }
      KeyCode::Tab => {
        let all: Vec<Facet> = Facet::all().collect();
        let next = self
          .current_facet()
          .and_then(|f| all.iter().position(|x| *x == f))
          .map_or(0, |i| (i + 1) % all.len());
        self.select(all[next]);
        return Action::Redraw;
      }
      KeyCode::Char(d @ '1'..='9') => {
        let index = d as usize - '1' as usize;
        let Some(column) = render::TABLE_COLUMNS.get(index) else {
          return Action::Ignore;
        };
        self.view.toggle_sort(*column);
      }
      _ => return Action::Ignore,
    }
    self.sync_ticker();
    Action::Redraw
  }

  fn draw(&self, out: &mut impl Write) -> io::Result<()> {
    let now = Utc::now();
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    for line in render::report_page(&self.view, &self.view.current_page(), now) {
      write!(out, "{line}\r\n")?;
    }
    write!(out, "\r\n←/→ page   1-7 sort   tab next report   q quit\r\n")?;
    out.flush()
  }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Forward terminal events until the receiver is dropped.
fn spawn_event_reader() -> mpsc::Receiver<Event> {
  let (tx, rx) = mpsc::channel(16);
  tokio::task::spawn_blocking(move || {
    while !tx.is_closed() {
      match event::poll(POLL) {
        Ok(true) => match event::read() {
          Ok(evt) => {
            if tx.blocking_send(evt).is_err() {
              break;
            }
          }
          Err(e) => {
            tracing::debug!(error = %e, "terminal read failed");
            break;
          }
        },
        Ok(false) => {}
        Err(e) => {
          tracing::debug!(error = %e, "terminal poll failed");
          break;
        }
      }
    }
  });
  rx
}

// ─── Entry point ─────────────────────────────────────────────────────────────

pub async fn run(store: &RecordStore, facet: Facet, sort: SortState) -> Result<()> {
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
    disable_raw_mode().ok();
    return Err(e).context("entering alternate screen");
  }

  let result = event_loop(&mut stdout, Screen::new(store, facet, sort)).await;

  // Restore the terminal regardless of result.
  execute!(stdout, Show, LeaveAlternateScreen).ok();
  disable_raw_mode().ok();
  result
}

async fn event_loop(out: &mut impl Write, mut screen: Screen<'_>) -> Result<()> {
  let mut events = spawn_event_reader();
  screen.draw(out).context("drawing frame")?;

  loop {
    tokio::select! {
      () = next_tick(&mut screen.ticker) => {
        screen.tick();
        screen.draw(out).context("drawing frame")?;
      }
      evt = events.recv() => {
        let Some(evt) = evt else { break };
        let action = match evt {
          Event::Key(key) => screen.handle_key(key),
          Event::Resize(_, _) => Action::Redraw,
          _ => Action::Ignore,
        };
        match action {
          Action::Quit => break,
          Action::Redraw => screen.draw(out).context("drawing frame")?,
          Action::Ignore => {}
        }
      }
    }
  }
  Ok(())
}
