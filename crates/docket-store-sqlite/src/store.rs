//! [`SqliteReplica`]: the SQLite implementation of [`ReplicaStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use docket_core::store::{AggregateKey, ReplicaStore};

use crate::{
  Error, Result,
  encode::{decode_dt, decode_key, encode_dt, encode_key},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The replica tier backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteReplica {
  conn: tokio_rusqlite::Connection,
}

impl SqliteReplica {
  /// Open (or create) a replica at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_owned();
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite replica");
    Ok(store)
  }

  /// Open an in-memory replica, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Upsert every entry in one transaction, stamped with a single
  /// `written_at`.
  pub async fn put_entries(&self, entries: Vec<(AggregateKey, String)>) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    let rows: Vec<(&'static str, String)> =
      entries.into_iter().map(|(k, v)| (encode_key(k), v)).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO aggregates (key, value, written_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            written_at = excluded.written_at",
          )?;
          for (key, value) in &rows {
            stmt.execute(rusqlite::params![key, value, at_str])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read one aggregate's stored JSON.
  pub async fn get_entry(&self, key: AggregateKey) -> Result<Option<String>> {
    let key_str = encode_key(key);

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn
            .query_row(
              "SELECT value FROM aggregates WHERE key = ?1",
              rusqlite::params![key_str],
              |row| row.get(0),
            )
            .optional()?)
        })
        .await?,
    )
  }

  /// Every stored aggregate.
  pub async fn load_all(&self) -> Result<HashMap<AggregateKey, String>> {
    let raws: Vec<(String, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key, value FROM aggregates ORDER BY key")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(k, v)| Ok((decode_key(&k)?, v)))
      .collect()
  }

  /// When the replica was last written, if ever.
  pub async fn last_written(&self) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT MAX(written_at) FROM aggregates", [], |row| row.get(0))?)
      })
      .await?;

    raw.as_deref().map(decode_dt).transpose()
  }
}

// ─── ReplicaStore impl ───────────────────────────────────────────────────────

impl ReplicaStore for SqliteReplica {
  type Error = Error;

  async fn put_all(&self, entries: Vec<(AggregateKey, String)>) -> Result<()> {
    self.put_entries(entries).await
  }

  async fn get(&self, key: AggregateKey) -> Result<Option<String>> { self.get_entry(key).await }
}
