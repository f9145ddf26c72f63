//! SQLite-backed persistent store for LLM usage records.
//!
//! This module provides:
//! - Explicit, idempotent schema initialization when the store is opened
//! - Append-only recording of usage events with store-assigned ids and timestamps
//! - Aggregate and most-recent queries over all stored records
//! - Concurrent access support via a connection mutex and WAL mode

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{UsageRecord, UsageSummary};
use crate::pricing::{CostBreakdown, PriceTable};

/// Number of records returned by [`UsageStore::get_recent`] when the caller gives no limit
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Current on-disk schema version, stored in the `metadata` table
pub const SCHEMA_VERSION: &str = "1";

const IN_MEMORY: &str = ":memory:";
const OPEN_MAX_ATTEMPTS: u64 = 3;
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Where the usage table lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Ephemeral, dropped with the store
    InMemory,
    /// Durable SQLite file
    File(PathBuf),
}

impl FromStr for StorageLocation {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == IN_MEMORY {
            Ok(StorageLocation::InMemory)
        } else {
            Ok(StorageLocation::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::InMemory => f.write_str(IN_MEMORY),
            StorageLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Append-only usage log plus derived read queries.
///
/// All statements go through one connection guarded by a mutex, so the store
/// can be shared between threads (`Arc<UsageStore>`). Ids come from
/// `AUTOINCREMENT` and are never reused.
#[derive(Debug)]
pub struct UsageStore {
    conn: Mutex<Connection>,
    prices: PriceTable,
    location: StorageLocation,
}

impl UsageStore {
    /// Open a store priced with the built-in table
    pub fn open(location: &StorageLocation) -> Result<Self> {
        Self::open_with_prices(location, PriceTable::builtin().clone())
    }

    /// Open an ephemeral store, mostly useful for tests
    pub fn in_memory() -> Result<Self> {
        Self::open(&StorageLocation::InMemory)
    }

    /// Open (creating if needed) the database and initialize its schema
    pub fn open_with_prices(location: &StorageLocation, prices: PriceTable) -> Result<Self> {
        let conn = open_connection(location)?;
        init_schema(&conn)?;
        info!(location = %location, models = prices.entries().len(), "usage store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            prices,
            location: location.clone(),
        })
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Price one call and persist it.
    ///
    /// Nothing is written when the model is unknown.
    pub fn record(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        endpoint: Option<&str>,
    ) -> Result<CostBreakdown> {
        let cost = self
            .prices
            .calculate_cost(model, input_tokens, output_tokens)?;
        let input = to_sql_count("input_tokens", input_tokens)?;
        let output = to_sql_count("output_tokens", output_tokens)?;

        let conn = self.lock()?;
        // Taken under the lock so timestamps never run backwards relative to ids
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        conn.execute(
            "INSERT INTO usage (timestamp, model, input_tokens, output_tokens,
                                input_cost, output_cost, total_cost, endpoint)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                timestamp,
                model,
                input,
                output,
                cost.input_cost,
                cost.output_cost,
                cost.total_cost(),
                endpoint
            ],
        )?;

        debug!(
            id = conn.last_insert_rowid(),
            model,
            input_tokens,
            output_tokens,
            total_cost = cost.total_cost(),
            "recorded usage"
        );
        Ok(cost)
    }

    /// Totals across every stored record.
    ///
    /// Token totals are folded in `u128` rather than with SQL `SUM()`, which
    /// fails on integer overflow. A total beyond `u64` is reported as an error.
    pub fn get_summary(&self) -> Result<UsageSummary> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT model, input_tokens, output_tokens, total_cost FROM usage ORDER BY id",
        )?;
        let mut rows = stmt.query([])?;

        let mut summary = UsageSummary::default();
        let mut input_tokens: u128 = 0;
        let mut output_tokens: u128 = 0;
        while let Some(row) = rows.next()? {
            let model: String = row.get(0)?;
            let cost: f64 = row.get(3)?;
            input_tokens += u128::from(get_count(row, 1)?);
            output_tokens += u128::from(get_count(row, 2)?);
            summary.total_requests += 1;
            summary.total_cost += cost;
            *summary.by_model.entry(model).or_insert(0.0) += cost;
        }
        summary.total_input_tokens = to_total("input_tokens", input_tokens)?;
        summary.total_output_tokens = to_total("output_tokens", output_tokens)?;

        debug!(
            total_requests = summary.total_requests,
            total_cost = summary.total_cost,
            "computed usage summary"
        );
        Ok(summary)
    }

    /// Up to `limit` records, most recently inserted first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, model, input_tokens, output_tokens,
                    input_cost, output_cost, total_cost, endpoint
             FROM usage
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit], |row| {
                Ok(UsageRecord {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    model: row.get(2)?,
                    input_tokens: get_count(row, 3)?,
                    output_tokens: get_count(row, 4)?,
                    input_cost: row.get(5)?,
                    output_cost: row.get(6)?,
                    total_cost: row.get(7)?,
                    endpoint: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(limit, returned = records.len(), "fetched recent usage");
        Ok(records)
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        get_metadata(&conn, "schema_version")
    }

    /// Close the underlying connection, reporting any error
    pub fn close(self) -> Result<()> {
        let location = self.location;
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| Error::UnavailableStorage("connection mutex poisoned".to_string()))?;
        conn.close().map_err(|(_, e)| Error::from(e))?;
        info!(location = %location, "usage store closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::UnavailableStorage("connection mutex poisoned".to_string()))
    }
}

/// Open a connection, retrying briefly while another process holds the lock
fn open_connection(location: &StorageLocation) -> Result<Connection> {
    let path = match location {
        StorageLocation::InMemory => return Ok(Connection::open_in_memory()?),
        StorageLocation::File(path) => path,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }

    let mut attempts = 0;
    loop {
        let opened = Connection::open(path).and_then(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            Ok(conn)
        });
        match opened {
            Ok(conn) => return Ok(conn),
            Err(e) if e.to_string().contains("locked") && attempts < OPEN_MAX_ATTEMPTS => {
                attempts += 1;
                warn!(attempt = attempts, path = %path.display(), "database locked, retrying open");
                thread::sleep(Duration::from_millis(100 * attempts));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Create tables and indexes if they don't exist.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS usage (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            model TEXT NOT NULL,
            input_tokens INTEGER NOT NULL,
            output_tokens INTEGER NOT NULL,
            input_cost REAL NOT NULL,
            output_cost REAL NOT NULL,
            total_cost REAL NOT NULL,
            endpoint TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_usage_model ON usage(model);
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', '1');",
    )?;

    match get_metadata(conn, "schema_version")? {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        other => Err(Error::UnavailableStorage(format!(
            "unsupported schema version {other:?}, expected {SCHEMA_VERSION}"
        ))),
    }
}

fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

fn to_sql_count(field: &str, n: u64) -> Result<i64> {
    i64::try_from(n)
        .map_err(|_| Error::InvalidInput(format!("{field} exceeds the storable maximum of {}", i64::MAX)))
}

fn to_total(field: &str, total: u128) -> Result<u64> {
    u64::try_from(total)
        .map_err(|_| Error::UnavailableStorage(format!("{field} total {total} exceeds {}", u64::MAX)))
}

fn get_count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let v: i64 = row.get(idx)?;
    u64::try_from(v)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}
