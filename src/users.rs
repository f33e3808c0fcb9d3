// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use crate::models::{User, UserId};
use crate::rates::RateTable;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_user(r: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: r.get(0)?,
        name: r.get(1)?,
        is_admin: r.get(2)?,
    })
}

pub fn create_user(conn: &Connection, name: &str, is_admin: bool) -> Result<User> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidName("user name cannot be empty".to_string()));
    }
    conn.query_row(
        "INSERT INTO users(name, is_admin) VALUES (?1, ?2) RETURNING id, name, is_admin",
        params![name, is_admin],
        map_user,
    )
    .map_err(|e| Error::from_insert(e, name))
}

pub fn get_user(conn: &Connection, id: UserId) -> Result<User> {
    conn.query_row(
        "SELECT id, name, is_admin FROM users WHERE id=?1",
        params![id],
        map_user,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("user {}", id)))
}

pub fn user_by_name(conn: &Connection, name: &str) -> Result<User> {
    let name = name.trim();
    conn.query_row(
        "SELECT id, name, is_admin FROM users WHERE name=?1",
        params![name],
        map_user,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("user '{}'", name)))
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, is_admin FROM users ORDER BY name")?;
    let rows = stmt.query_map([], map_user)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Store `code` as the user's display currency, replacing any previous one.
pub fn set_default_currency(conn: &Connection, user: UserId, code: &str) -> Result<String> {
    let currency = RateTable::new(conn).get(code)?;
    get_user(conn, user)?;
    conn.execute(
        "INSERT INTO default_currencies(user_id, currency) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET currency=excluded.currency",
        params![user, currency.code],
    )?;
    Ok(currency.code)
}

pub fn default_currency(conn: &Connection, user: UserId) -> Result<Option<String>> {
    let v = conn
        .query_row(
            "SELECT currency FROM default_currencies WHERE user_id=?1",
            params![user],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}
