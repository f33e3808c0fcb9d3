// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.spendlog", "Spendlog", "spendlog"));

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn default_db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("spendlog.sqlite"))
}

pub fn open_or_init(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    configure(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// Start a write transaction that holds the database write lock from the
/// first statement on, so balance read-modify-writes cannot interleave with
/// another connection's. Dropping it without commit rolls back.
pub(crate) fn begin_write(conn: &Connection) -> rusqlite::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        is_admin INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS currencies(
        code TEXT PRIMARY KEY CHECK(length(code) = 3),
        rate TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    -- one display currency per user, overwritten on change
    CREATE TABLE IF NOT EXISTS default_currencies(
        user_id INTEGER PRIMARY KEY,
        currency TEXT NOT NULL,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY(currency) REFERENCES currencies(code)
    );

    CREATE TABLE IF NOT EXISTS units(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner INTEGER NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('INCOME','EXPENSE','ACCOUNT')),
        currency TEXT NOT NULL,
        balance TEXT NOT NULL DEFAULT '0',
        include_in_total INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(owner, name),
        FOREIGN KEY(owner) REFERENCES users(id),
        FOREIGN KEY(currency) REFERENCES currencies(code)
    );
    CREATE INDEX IF NOT EXISTS idx_units_type ON units(type);

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        owner INTEGER NOT NULL,
        source_unit INTEGER NOT NULL,
        destination_unit INTEGER NOT NULL,
        source_amount TEXT NOT NULL,
        destination_amount TEXT NOT NULL,
        shape TEXT NOT NULL CHECK(shape IN ('income_to_account','account_outflow')),
        FOREIGN KEY(owner) REFERENCES users(id),
        FOREIGN KEY(source_unit) REFERENCES units(id),
        FOREIGN KEY(destination_unit) REFERENCES units(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_owner ON transactions(owner, created_at);
    "#,
    )?;
    Ok(())
}
