//! `docket`: custody register for a court's case files.
//!
//! Reads `docket.toml` (or the path given with `--config`) layered with
//! `DOCKET_*` environment variables, opens the register, and runs one
//! subcommand against it.
//!
//! # Usage
//!
//! ```text
//! docket setup --clerk-name Imran --judge-name "Justice Rana" ...
//! docket profile save --name "Ali Khan" --type advocate --cell-no 0300-1111111 --chamber-no 12
//! docket deliver --pin 1234 --cms-no 1201 --petitioner Aslam --respondent State ...
//! docket report pending --sort delivered-at --desc
//! docket watch pending
//! docket serve
//! ```

mod commands;
mod render;
mod settings;
mod watch;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use docket_core::{
  file::{CaseType, DateType},
  profile::ProfileType,
  query::{Column, Direction, Facet, SortState},
};
use docket_mirror::{DirKv, Docket, LocalBackend, LocalDrive};
use docket_store_sqlite::SqliteReplica;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "docket", version, about = "Court case-file custody register")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "docket.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

/// Operator PIN for gated operations.
#[derive(Args, Debug)]
struct PinArg {
  #[arg(long, env = "DOCKET_PIN", hide_env_values = true)]
  pin: String,
}

/// Sort and page selection for report output.
#[derive(Args, Debug)]
struct ViewArgs {
  /// Column to sort by, e.g. `cms-no`, `delivered-at`, `title`.
  #[arg(long)]
  sort: Option<Column>,

  /// Sort descending.
  #[arg(long, requires = "sort")]
  desc: bool,

  /// 1-based page number.
  #[arg(long, default_value_t = 1)]
  page: usize,
}

impl ViewArgs {
  fn sort_state(&self) -> SortState {
    let direction = if self.desc { Direction::Desc } else { Direction::Asc };
    self.sort.map(|c| SortState::by(c, direction)).unwrap_or_default()
  }
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Register the operator. Only allowed once.
  Setup(commands::SetupArgs),

  /// Replace the PIN after proving identity with the CNIC or email.
  ChangePin {
    /// CNIC or email on record.
    #[arg(long)]
    identity: String,
    #[arg(long)]
    new_pin:  String,
  },

  /// Hand a file to a custody holder.
  Deliver {
    #[command(flatten)]
    pin:  PinArg,
    #[command(flatten)]
    file: DeliverArgs,
  },

  /// Mark the earliest outstanding delivery of a file as returned.
  Return {
    #[command(flatten)]
    pin:    PinArg,
    cms_no: String,
  },

  /// Manage custody-holder profiles.
  #[command(subcommand)]
  Profile(ProfileCommand),

  /// Show one page of a dashboard report.
  Report {
    /// deliveries-today, returns-today, pending, tomorrow-hearings or overdue.
    facet: String,
    #[command(flatten)]
    view:  ViewArgs,
  },

  /// Search files. Blank filters match everything.
  Search {
    #[command(flatten)]
    filters: commands::SearchArgs,
    #[command(flatten)]
    view:    ViewArgs,
  },

  /// Live report with ticking custody durations.
  Watch {
    #[arg(default_value = "pending")]
    facet: Facet,
    #[command(flatten)]
    view:  ViewArgs,
  },

  /// Usage counters and report totals.
  Stats,

  /// Write the register as JSON (CNIC masked, PIN omitted).
  Export {
    /// Output file; stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,
  },

  /// Write every row of a report as CSV.
  ExportCsv {
    facet: String,
    #[arg(long)]
    sort:  Option<Column>,
    #[arg(long, requires = "sort")]
    desc:  bool,
    #[arg(short, long)]
    out:   Option<PathBuf>,
  },

  /// Replace the register with an exported JSON document.
  Import { file: PathBuf },

  /// Upload a snapshot to the backup drive, or queue it while offline.
  Backup,

  /// List snapshots on the backup drive.
  Backups,

  /// Retry queued backups.
  Sync,

  /// Replace the register with a snapshot from the backup drive.
  Restore { id: String },

  /// Grant a principal access to a snapshot.
  Share { id: String, principal: String },

  /// Overwrite the register with the replica's contents.
  Reconcile,

  /// Serve the JSON API.
  Serve,

  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[derive(Args, Debug)]
struct DeliverArgs {
  #[arg(long)]
  cms_no:         String,
  #[arg(long)]
  petitioner:     String,
  #[arg(long)]
  respondent:     String,
  #[arg(long)]
  case_type:      CaseType,
  #[arg(long, default_value = "")]
  nature:         String,
  #[arg(long)]
  fir_no:         Option<String>,
  #[arg(long)]
  fir_year:       Option<String>,
  /// Offence sections.
  #[arg(long)]
  fir_us:         Option<String>,
  #[arg(long)]
  police_station: Option<String>,
  #[arg(long)]
  date_type:      DateType,
  /// Decision or next hearing date, `YYYY-MM-DD`.
  #[arg(long)]
  date:           NaiveDate,
  /// Delivered to the copy agency; requires the SWAL form fields.
  #[arg(long)]
  copy_agency:    bool,
  #[arg(long)]
  swal_form_no:   Option<String>,
  #[arg(long)]
  swal_date:      Option<NaiveDate>,
  /// Custody holder's profile name.
  #[arg(long = "to")]
  holder_name:    String,
  #[arg(long = "to-type")]
  holder_type:    ProfileType,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
  /// Create or replace a profile, keyed by name and type.
  Save(commands::ProfileArgs),

  /// Delete a profile. Files delivered to it are kept.
  Delete {
    #[command(flatten)]
    pin:  PinArg,
    name: String,
    #[arg(long = "type")]
    kind: ProfileType,
  },

  List,

  /// Fuzzy-match profile names.
  Suggest { query: String },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so report output can be piped.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::HashPassword => commands::hash_password(),
    Command::Serve => {
      let settings = Settings::load(&cli.config)?;
      let docket = open_docket(&settings).await?;
      commands::serve(docket, &settings).await
    }
    command => {
      let settings = Settings::load(&cli.config)?;
      let mut docket = open_docket(&settings).await?;
      let result = run(command, &mut docket).await;
      docket.close().await;
      result
    }
  }
}

async fn open_docket(settings: &Settings) -> Result<Docket<LocalBackend>> {
  let kv = DirKv::open(&settings.data_dir, settings.quota_bytes)
    .with_context(|| format!("failed to open data directory {:?}", settings.data_dir))?;

  let replica_path = settings.replica_path();
  // A replica that fails to open is reported and skipped, not fatal.
  let replica = SqliteReplica::open(&replica_path).await;

  let drive = settings.drive_dir.clone().map(LocalDrive::new);
  Docket::open(kv, replica, drive)
    .await
    .context("failed to load the register")
}

async fn run(command: Command, docket: &mut Docket<LocalBackend>) -> Result<()> {
  use commands as c;

  match command {
    Command::Setup(args) => c::setup(docket, args),
    Command::ChangePin { identity, new_pin } => c::change_pin(docket, &identity, &new_pin),
    Command::Deliver { pin, file } => c::deliver(docket, &pin.pin, file.into_form()),
    Command::Return { pin, cms_no } => c::return_file(docket, &pin.pin, &cms_no),
    Command::Profile(ProfileCommand::Save(args)) => c::save_profile(docket, args),
    Command::Profile(ProfileCommand::Delete { pin, name, kind }) => {
      c::delete_profile(docket, &pin.pin, &name, kind)
    }
    Command::Profile(ProfileCommand::List) => c::list_profiles(docket),
    Command::Profile(ProfileCommand::Suggest { query }) => c::suggest_profiles(docket, &query),
    Command::Report { facet, view } => c::report(docket, &facet, view.sort_state(), view.page),
    Command::Search { filters, view } => {
      c::search(docket, filters.into_filters(), view.sort_state(), view.page)
    }
    Command::Watch { facet, view } => watch::run(docket.store(), facet, view.sort_state()).await,
    Command::Stats => c::stats(docket),
    Command::Export { out } => c::export_json(docket, out.as_deref()),
    Command::ExportCsv { facet, sort, desc, out } => {
      let view = ViewArgs { sort, desc, page: 1 };
      c::export_csv(docket, &facet, view.sort_state(), out.as_deref())
    }
    Command::Import { file } => c::import_json(docket, &file),
    Command::Backup => c::backup(docket).await,
    Command::Backups => c::list_backups(docket).await,
    Command::Sync => c::sync(docket).await,
    Command::Restore { id } => c::restore(docket, &id).await,
    Command::Share { id, principal } => c::share(docket, &id, &principal).await,
    Command::Reconcile => c::reconcile(docket).await,
    other @ (Command::Serve | Command::HashPassword) => {
      anyhow::bail!("{other:?} does not run against an open register")
    }
  }
}

impl DeliverArgs {
  fn into_form(self) -> docket_core::file::NewFile {
    docket_core::file::NewFile {
      cms_no:         self.cms_no,
      petitioner:     self.petitioner,
      respondent:     self.respondent,
      case_type:      self.case_type,
      nature:         self.nature,
      fir_no:         self.fir_no,
      fir_year:       self.fir_year,
      fir_us:         self.fir_us,
      police_station: self.police_station,
      date_type:      self.date_type,
      date:           self.date,
      copy_agency:    self.copy_agency,
      swal_form_no:   self.swal_form_no,
      swal_date:      self.swal_date,
      holder_name:    self.holder_name,
      holder_type:    self.holder_type,
    }
  }
}
