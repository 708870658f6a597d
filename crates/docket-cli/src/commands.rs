//! Subcommand implementations. Each runs against an open [`Docket`] and
//! prints a short human-readable result.

use std::{
  io::Write as _,
  path::Path,
  sync::Arc,
};

use anyhow::{Context as _, Result, bail};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::Router;
use chrono::Utc;
use clap::Args;
use docket_api::{AppState, AuthConfig};
use docket_core::{
  duration::CustodyDuration,
  file::NewFile,
  profile::{self, Profile, ProfileDetails, ProfileType},
  query::{ReportView, SearchFilters, SortState},
  record::Upsert,
  user::UserProfile,
};
use docket_mirror::{BackupOutcome, Docket, LocalBackend};
use rand_core::OsRng;
use tokio::net::TcpListener;

use crate::{render, settings::Settings};

fn print_lines(lines: impl IntoIterator<Item = String>) {
  for line in lines {
    println!("{line}");
  }
}

// ─── Operator ────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SetupArgs {
  #[arg(long)]
  clerk_name: String,
  #[arg(long)]
  judge_name: String,
  #[arg(long)]
  court_name: String,
  #[arg(long)]
  mobile:     String,
  #[arg(long)]
  cnic:       String,
  #[arg(long)]
  pin:        String,
  #[arg(long, default_value = "")]
  email:      String,
  #[arg(long)]
  photo:      Option<String>,
}

impl From<SetupArgs> for UserProfile {
  fn from(args: SetupArgs) -> Self {
    UserProfile {
      clerk_name: args.clerk_name,
      judge_name: args.judge_name,
      court_name: args.court_name,
      mobile:     args.mobile,
      cnic:       args.cnic,
      pin:        Some(args.pin),
      email:      args.email,
      photo:      args.photo,
    }
  }
}

pub fn setup(docket: &mut Docket<LocalBackend>, args: SetupArgs) -> Result<()> {
  let user = UserProfile::from(args);
  let court = user.court_name.clone();
  docket.register_user(user)?;
  println!("Registered operator for {court}.");
  Ok(())
}

pub fn change_pin(docket: &mut Docket<LocalBackend>, identity: &str, new_pin: &str) -> Result<()> {
  if new_pin.trim().is_empty() {
    bail!("the new PIN must not be blank");
  }
  docket.change_pin(identity, new_pin.trim())?;
  println!("PIN changed.");
  Ok(())
}

// ─── Files ───────────────────────────────────────────────────────────────────

pub fn deliver(docket: &mut Docket<LocalBackend>, pin: &str, form: NewFile) -> Result<()> {
  let record = docket.enter_file(pin, form, Utc::now())?;
  println!(
    "Delivered CMS {} ({}) to {} [{}].",
    record.cms_no, record.title, record.holder_name, record.holder_type
  );
  Ok(())
}

pub fn return_file(docket: &mut Docket<LocalBackend>, pin: &str, cms_no: &str) -> Result<()> {
  let now = Utc::now();
  match docket.return_file(pin, cms_no, now)? {
    Some(record) => println!(
      "Returned CMS {} from {} after {}.",
      record.cms_no,
      record.holder_name,
      CustodyDuration::of(&record, now)
    ),
    None => println!("CMS {cms_no} has no outstanding delivery."),
  }
  Ok(())
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ProfileArgs {
  #[arg(long)]
  name:          String,
  #[arg(long = "type")]
  kind:          ProfileType,
  #[arg(long)]
  cell_no:       String,
  /// Photo path or data URL. Required except for advocates.
  #[arg(long)]
  photo:         Option<String>,
  /// Advocates and munshis.
  #[arg(long, default_value = "")]
  chamber_no:    String,
  /// Munshis: the advocate they clerk for.
  #[arg(long, default_value = "")]
  advocate_name: String,
  /// Colleagues.
  #[arg(long)]
  designation:   Option<String>,
  /// Colleagues.
  #[arg(long)]
  posted_at:     Option<String>,
  /// Others.
  #[arg(long)]
  cnic:          Option<String>,
  /// Others.
  #[arg(long)]
  relation:      Option<String>,
}

impl From<ProfileArgs> for Profile {
  fn from(args: ProfileArgs) -> Self {
    let details = match args.kind {
      ProfileType::Munshi => ProfileDetails::Munshi {
        chamber_no:    args.chamber_no,
        advocate_name: args.advocate_name,
      },
      ProfileType::Advocate => ProfileDetails::Advocate { chamber_no: args.chamber_no },
      ProfileType::Colleague => {
        ProfileDetails::Colleague { designation: args.designation, posted_at: args.posted_at }
      }
      ProfileType::Other => ProfileDetails::Other { cnic: args.cnic, relation: args.relation },
    };
    Profile { name: args.name, cell_no: args.cell_no, photo: args.photo, details }
  }
}

pub fn save_profile(docket: &mut Docket<LocalBackend>, args: ProfileArgs) -> Result<()> {
  let profile = Profile::from(args);
  let label = format!("{} [{}]", profile.name, profile.kind());
  match docket.save_profile(profile)? {
    Upsert::Inserted => println!("Created {label}."),
    Upsert::Replaced => println!("Updated {label}."),
  }
  Ok(())
}

pub fn delete_profile(
  docket: &mut Docket<LocalBackend>,
  pin: &str,
  name: &str,
  kind: ProfileType,
) -> Result<()> {
  if docket.delete_profile(pin, name, kind)? == 0 {
    bail!("no {kind} profile named {name:?}");
  }
  println!("Deleted {name} [{kind}]. Files delivered to them are kept.");
  Ok(())
}

pub fn list_profiles(docket: &Docket<LocalBackend>) -> Result<()> {
  print_lines(render::profiles(docket.store().profiles()));
  Ok(())
}

pub fn suggest_profiles(docket: &Docket<LocalBackend>, query: &str) -> Result<()> {
  print_lines(render::profiles(profile::suggest(docket.store().profiles(), query)));
  Ok(())
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SearchArgs {
  #[arg(long)]
  title:          Option<String>,
  #[arg(long)]
  cms_no:         Option<String>,
  /// Custody holder name.
  #[arg(long)]
  holder:         Option<String>,
  #[arg(long)]
  fir_no:         Option<String>,
  #[arg(long)]
  fir_year:       Option<String>,
  #[arg(long)]
  police_station: Option<String>,
}

impl SearchArgs {
  pub fn into_filters(self) -> SearchFilters {
    SearchFilters {
      title:          self.title,
      cms_no:         self.cms_no,
      holder:         self.holder,
      fir_no:         self.fir_no,
      fir_year:       self.fir_year,
      police_station: self.police_station,
    }
  }
}

fn print_view(mut view: ReportView, sort: SortState, page: usize) {
  view.set_sort(sort);
  view.set_page(page);
  print_lines(render::report_page(&view, &view.current_page(), Utc::now()));
}

pub fn report(docket: &Docket<LocalBackend>, facet: &str, sort: SortState, page: usize) -> Result<()> {
  print_view(docket.report(facet, Utc::now()), sort, page);
  Ok(())
}

pub fn search(
  docket: &mut Docket<LocalBackend>,
  filters: SearchFilters,
  sort: SortState,
  page: usize,
) -> Result<()> {
  print_view(docket.search(filters)?, sort, page);
  Ok(())
}

pub fn stats(docket: &Docket<LocalBackend>) -> Result<()> {
  print_lines(render::stats(&docket.stats(Utc::now())));
  Ok(())
}

// ─── Export / import ─────────────────────────────────────────────────────────

fn write_output(out: Option<&Path>, body: &str) -> Result<()> {
  match out {
    Some(path) => {
      std::fs::write(path, body).with_context(|| format!("failed to write {path:?}"))?;
      tracing::info!(path = %path.display(), bytes = body.len(), "written");
    }
    None => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(body.as_bytes())?;
      if !body.ends_with('\n') {
        stdout.write_all(b"\n")?;
      }
    }
  }
  Ok(())
}

pub fn export_json(docket: &Docket<LocalBackend>, out: Option<&Path>) -> Result<()> {
  write_output(out, &docket.export_json()?)
}

pub fn export_csv(
  docket: &Docket<LocalBackend>,
  facet: &str,
  sort: SortState,
  out: Option<&Path>,
) -> Result<()> {
  let now = Utc::now();
  let mut view = docket.report(facet, now);
  view.set_sort(sort);
  write_output(out, &docket.export_csv(&view, now)?)
}

pub fn import_json(docket: &mut Docket<LocalBackend>, path: &Path) -> Result<()> {
  let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
  docket
    .import_json(&raw)
    .with_context(|| format!("failed to import {path:?}"))?;
  println!(
    "Imported {} files and {} profiles.",
    docket.store().files().len(),
    docket.store().profiles().len()
  );
  Ok(())
}

// ─── Backup drive ────────────────────────────────────────────────────────────

pub async fn backup(docket: &mut Docket<LocalBackend>) -> Result<()> {
  match docket.backup(Utc::now()).await? {
    BackupOutcome::Uploaded { id } => println!("Backed up as {id}."),
    BackupOutcome::Queued { pending } => {
      println!("Drive unavailable; backup queued ({pending} pending). Run `docket sync` later.")
    }
  }
  Ok(())
}

pub async fn list_backups(docket: &Docket<LocalBackend>) -> Result<()> {
  let entries = docket.list_backups().await?;
  if entries.is_empty() {
    println!("No backups.");
  }
  for entry in entries {
    println!("{}", entry.id);
  }
  Ok(())
}

pub async fn sync(docket: &mut Docket<LocalBackend>) -> Result<()> {
  let report = docket.drain_offline_queue().await?;
  match &report.snapshot {
    Some(id) => println!("Uploaded {id} for {} queued backup(s).", report.satisfied),
    None if report.requeued > 0 => println!("Upload failed; {} still queued.", report.requeued),
    None => println!("Nothing to upload."),
  }
  Ok(())
}

pub async fn restore(docket: &mut Docket<LocalBackend>, id: &str) -> Result<()> {
  docket.restore(id).await?;
  println!("Restored {id} ({} files).", docket.store().files().len());
  Ok(())
}

pub async fn share(docket: &Docket<LocalBackend>, id: &str, principal: &str) -> Result<()> {
  docket.share_backup(id, principal).await?;
  println!("Shared {id} with {principal}.");
  Ok(())
}

pub async fn reconcile(docket: &mut Docket<LocalBackend>) -> Result<()> {
  let restored = docket.reconcile().await?;
  println!("Restored {restored} aggregates from the replica.");
  Ok(())
}

// ─── Server ──────────────────────────────────────────────────────────────────

pub async fn serve(docket: Docket<LocalBackend>, settings: &Settings) -> Result<()> {
  if settings.api_password_hash.is_empty() {
    docket.close().await;
    bail!("api_password_hash is not set; generate one with `docket hash-password`");
  }

  let auth = AuthConfig::new(&settings.api_username, &settings.api_password_hash)
    .with_realm(&settings.api_realm);
  let state = AppState::new(docket, auth);
  let shared = state.docket.clone();
  let app = Router::new().nest("/api", docket_api::api_router(state));

  let address = settings.address();
  tracing::info!("Listening on http://{address}/api");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  match Arc::try_unwrap(shared) {
    Ok(docket) => docket.into_inner().close().await,
    Err(shared) => shared.lock().await.mirror().flush().await,
  }
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

// ─── Password hashing ────────────────────────────────────────────────────────

pub fn hash_password() -> Result<()> {
  let password = read_password()?;
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
    .to_string();
  println!("{hash}");
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> Result<String> {
  use std::io::{self, BufRead};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn profile_args_build_type_specific_details() {
    let args = ProfileArgs {
      name:          "Bashir".into(),
      kind:          ProfileType::Munshi,
      cell_no:       "0301-2222222".into(),
      photo:         Some("bashir.png".into()),
      chamber_no:    "7".into(),
      advocate_name: "Ali Khan".into(),
      designation:   Some("ignored".into()),
      posted_at:     None,
      cnic:          None,
      relation:      None,
    };
    let profile = Profile::from(args);
    assert_eq!(profile.kind(), ProfileType::Munshi);
    assert_eq!(profile.details, ProfileDetails::Munshi {
      chamber_no:    "7".into(),
      advocate_name: "Ali Khan".into(),
    });
    assert!(profile.validate().is_ok());
  }

  #[test]
  fn setup_args_carry_the_pin() {
    let user = UserProfile::from(SetupArgs {
      clerk_name: "Imran".into(),
      judge_name: "Justice Rana".into(),
      court_name: "Sessions Court".into(),
      mobile:     "0300".into(),
      cnic:       "35202-1234567-1".into(),
      pin:        "1234".into(),
      email:      String::new(),
      photo:      None,
    });
    assert!(user.validate().is_ok());
    assert!(user.verify_pin("1234").is_ok());
  }

  #[tokio::test]
  async fn commands_round_trip_through_a_directory_register() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
      data_dir:          dir.path().join("data"),
      replica_path:      None,
      drive_dir:         Some(dir.path().join("drive")),
      quota_bytes:       docket_mirror::kv::DEFAULT_QUOTA_BYTES,
      host:              "127.0.0.1".into(),
      port:              0,
      api_username:      "clerk".into(),
      api_password_hash: String::new(),
      api_realm:         docket_api::auth::DEFAULT_REALM.into(),
    };
    std::fs::create_dir_all(dir.path().join("drive")).unwrap();

    let mut docket = crate::open_docket(&settings).await.unwrap();
    setup(&mut docket, SetupArgs {
      clerk_name: "Imran".into(),
      judge_name: "Justice Rana".into(),
      court_name: "Sessions Court".into(),
      mobile:     "0300".into(),
      cnic:       "35202-1234567-1".into(),
      pin:        "1234".into(),
      email:      String::new(),
      photo:      None,
    })
    .unwrap();
    save_profile(&mut docket, ProfileArgs {
      name:          "Ali Khan".into(),
      kind:          ProfileType::Advocate,
      cell_no:       "0300-1111111".into(),
      photo:         None,
      chamber_no:    "12".into(),
      advocate_name: String::new(),
      designation:   None,
      posted_at:     None,
      cnic:          None,
      relation:      None,
    })
    .unwrap();
    assert!(delete_profile(&mut docket, "1234", "Nobody", ProfileType::Advocate).is_err());

    let export = dir.path().join("export.json");
    export_json(&docket, Some(&export)).unwrap();
    assert!(std::fs::read_to_string(&export).unwrap().contains("Ali Khan"));

    backup(&mut docket).await.unwrap();
    assert_eq!(docket.list_backups().await.unwrap().len(), 1);
    docket.close().await;

    // Settings reopen the same register.
    let docket = crate::open_docket(&settings).await.unwrap();
    assert_eq!(docket.store().profiles().len(), 1);
    docket.close().await;
  }
}
