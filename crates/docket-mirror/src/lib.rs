//! Persistence and session layer for the Docket register.
//!
//! - [`kv`]: the primary, synchronous tier ([`DirKv`], [`MemoryKv`]).
//! - [`mirror`]: write-through to the primary plus best-effort replication
//!   to the [`ReplicaStore`](docket_core::store::ReplicaStore) tier.
//! - [`drive`]: a directory-backed backup drive.
//! - [`session`]: the [`Docket`] façade used by the API and the CLI.

pub mod drive;
pub mod error;
pub mod kv;
pub mod mirror;
pub mod session;

use docket_store_sqlite::SqliteReplica;

pub use drive::LocalDrive;
pub use error::{Error, Result};
pub use kv::{DirKv, MemoryKv};
pub use mirror::{Mirror, Replication, ReplicationOutcome};
pub use session::{Backend, BackupOutcome, Docket, DrainReport, Stats};

/// Directory primary store, SQLite replica, directory drive.
pub struct LocalBackend;

impl Backend for LocalBackend {
  type Drive = LocalDrive;
  type Kv = DirKv;
  type Replica = SqliteReplica;
}
