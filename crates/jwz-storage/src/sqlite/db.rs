//! Thin driver layer over the embedded SQL engine.
//!
//! Owns connection setup (pragmas), the busy/locked error
//! classification, and the retry policy for transaction boundary
//! statements. Everything else talks to `rusqlite` directly through
//! prepared statements.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// Driver-level errors.
///
/// Busy and locked return codes (including extended codes whose low
/// byte matches) are classified separately because they are transient;
/// every other non-OK code collapses into [`DbError::Engine`].
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The engine reported busy or locked.
    #[error("database busy: {0}")]
    Busy(rusqlite::Error),

    /// Any other engine failure.
    #[error("database error: {0}")]
    Engine(rusqlite::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if is_busy(&e) {
            Self::Busy(e)
        } else {
            Self::Engine(e)
        }
    }
}

/// Returns `true` for SQLITE_BUSY / SQLITE_LOCKED, including extended
/// codes whose low byte matches (e.g. SQLITE_BUSY_SNAPSHOT).
pub(crate) fn is_busy(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            let primary = err.extended_code & 0xff;
            primary == rusqlite::ffi::SQLITE_BUSY || primary == rusqlite::ffi::SQLITE_LOCKED
        }
        _ => false,
    }
}

/// Returns `true` for constraint violations (unique, foreign key).
pub(crate) fn is_constraint(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Connection contract, asserted by tests: WAL journaling, NORMAL
/// syncing, a 300 s engine-side busy timeout, in-memory temp store,
/// and enforced foreign keys.
const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 300000;
PRAGMA temp_store = MEMORY;
PRAGMA foreign_keys = ON;";

/// Opens (or creates) the index database and applies the pragmas.
pub(crate) fn open(path: &Path) -> Result<Connection> {
    debug!(path = %path.display(), "opening index database");
    let conn = Connection::open(path).map_err(DbError::from)?;
    conn.execute_batch(PRAGMAS).map_err(DbError::from)?;
    Ok(conn)
}

/// Retry policy for `BEGIN IMMEDIATE` / `COMMIT`.
///
/// Non-boundary statements inside a transaction surface busy
/// immediately; only the boundaries are worth waiting on, because a
/// conflicting writer holds the database for one short transaction at
/// a time.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before giving up with [`StoreError::DatabaseBusy`].
    pub attempts: u32,
    /// Lower bound of the uniform random back-off.
    pub backoff_min: Duration,
    /// Upper bound of the uniform random back-off.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 50,
            backoff_min: Duration::from_millis(50),
            backoff_max: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Deterministic policy for tests: `attempts` tries, no sleeping.
    pub fn no_backoff(attempts: u32) -> Self {
        Self {
            attempts,
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    fn pause(&self) -> Duration {
        if self.backoff_max <= self.backoff_min {
            return self.backoff_min;
        }
        let span = (self.backoff_max - self.backoff_min).as_millis() as u64;
        self.backoff_min + Duration::from_millis(rand::rng().random_range(0..=span))
    }
}

/// Runs a boundary statement, retrying on busy/locked per the policy.
fn run_boundary(conn: &Connection, sql: &str, policy: &RetryPolicy) -> Result<()> {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        match conn.execute_batch(sql) {
            Ok(()) => return Ok(()),
            Err(e) if is_busy(&e) => {
                if attempt == attempts {
                    warn!(sql, attempts, "retry budget exhausted");
                    return Err(StoreError::DatabaseBusy);
                }
                let pause = policy.pause();
                debug!(sql, attempt, ?pause, "engine busy, backing off");
                std::thread::sleep(pause);
            }
            Err(e) => return Err(DbError::Engine(e).into()),
        }
    }
    Err(StoreError::DatabaseBusy)
}

/// An open immediate transaction.
///
/// Rolls back on drop unless committed, so every early `?` return in
/// a write path leaves the index untouched.
#[derive(Debug)]
pub(crate) struct Txn<'c> {
    conn: &'c Connection,
    open: bool,
}

impl<'c> Txn<'c> {
    /// Begins an immediate transaction, retrying on busy.
    pub(crate) fn begin_immediate(conn: &'c Connection, policy: &RetryPolicy) -> Result<Self> {
        run_boundary(conn, "BEGIN IMMEDIATE", policy)?;
        Ok(Self { conn, open: true })
    }

    /// Commits, retrying on busy. On failure the drop handler rolls
    /// the transaction back.
    pub(crate) fn commit(mut self, policy: &RetryPolicy) -> Result<()> {
        run_boundary(self.conn, "COMMIT", policy)?;
        self.open = false;
        Ok(())
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pragma_i64(conn: &Connection, name: &str) -> i64 {
        conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn pragmas_are_in_effect_after_open() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(&dir.path().join("messages.db")).unwrap();

        let journal: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal, "wal");
        assert_eq!(pragma_i64(&conn, "synchronous"), 1); // NORMAL
        assert_eq!(pragma_i64(&conn, "busy_timeout"), 300_000);
        assert_eq!(pragma_i64(&conn, "temp_store"), 2); // MEMORY
        assert_eq!(pragma_i64(&conn, "foreign_keys"), 1);
    }

    #[test]
    fn txn_rolls_back_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(&dir.path().join("messages.db")).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

        let policy = RetryPolicy::no_backoff(1);
        {
            let _tx = Txn::begin_immediate(&conn, &policy).unwrap();
            conn.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
            // Dropped without commit.
        }
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn txn_commit_persists() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(&dir.path().join("messages.db")).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

        let policy = RetryPolicy::no_backoff(1);
        let tx = Txn::begin_immediate(&conn, &policy).unwrap();
        conn.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();
        tx.commit(&policy).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn contended_begin_immediate_reports_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.db");
        let writer = open(&path).unwrap();
        writer.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

        let policy = RetryPolicy::no_backoff(3);
        let tx = Txn::begin_immediate(&writer, &policy).unwrap();
        writer.execute("INSERT INTO t (x) VALUES (1)", []).unwrap();

        // Second connection must not wait on the engine-side timeout.
        let reader = open(&path).unwrap();
        reader.execute_batch("PRAGMA busy_timeout = 0").unwrap();
        match Txn::begin_immediate(&reader, &policy) {
            Err(StoreError::DatabaseBusy) => {}
            other => panic!("expected DatabaseBusy, got {other:?}"),
        }

        tx.commit(&policy).unwrap();
    }

    #[test]
    fn busy_classification_by_low_byte() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::DatabaseBusy,
                extended_code: rusqlite::ffi::SQLITE_BUSY | (2 << 8), // SQLITE_BUSY_SNAPSHOT
            },
            None,
        );
        assert!(is_busy(&busy));
        assert!(matches!(DbError::from(busy), DbError::Busy(_)));

        let other = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT,
            },
            None,
        );
        assert!(!is_busy(&other));
        assert!(matches!(DbError::from(other), DbError::Engine(_)));
    }
}
