//! SQL schema for the Docket replica.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per aggregate. The value is the aggregate's JSON document,
-- byte-for-byte as written to the primary tier.
CREATE TABLE IF NOT EXISTS aggregates (
    key         TEXT PRIMARY KEY,  -- 'files' | 'profiles' | 'userProfile' | 'offlineQueue' | 'analytics'
    value       TEXT NOT NULL,
    written_at  TEXT NOT NULL      -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
