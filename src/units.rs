// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The unit ledger: income sources, expense buckets and accounts, each with
//! a running balance.

use crate::convert::convert;
use crate::db::begin_write;
use crate::error::{Error, Result};
use crate::models::{Unit, UnitId, UnitType, UserId};
use crate::rates::{RateLookup, RateTable};
use crate::users::{default_currency, get_user};
use crate::utils::{decimal_at, fits_money_precision, within_money_bounds, MAX_AMOUNT};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

const UNIT_COLUMNS: &str = "id, name, type, currency, balance, include_in_total, owner";

pub(crate) fn map_unit(r: &Row<'_>) -> rusqlite::Result<Unit> {
    Ok(Unit {
        id: r.get(0)?,
        name: r.get(1)?,
        unit_type: r.get(2)?,
        currency: r.get(3)?,
        balance: decimal_at(r, 4)?,
        include_in_total: r.get(5)?,
        owner: r.get(6)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewUnit {
    pub name: String,
    pub unit_type: UnitType,
    pub currency: String,
    pub include_in_total: bool,
    pub opening_balance: Decimal,
    pub owner: UserId,
}

impl NewUnit {
    pub fn new(name: &str, unit_type: UnitType, currency: &str, owner: UserId) -> Self {
        Self {
            name: name.to_string(),
            unit_type,
            currency: currency.to_string(),
            include_in_total: true,
            opening_balance: Decimal::ZERO,
            owner,
        }
    }

    pub fn opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = balance;
        self
    }

    pub fn include_in_total(mut self, include: bool) -> Self {
        self.include_in_total = include;
        self
    }
}

/// Editable unit fields. Balances only move through transactions and the
/// currency is fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct UnitPatch {
    pub name: Option<String>,
    pub unit_type: Option<UnitType>,
    pub include_in_total: Option<bool>,
}

pub fn create_unit(conn: &Connection, new: &NewUnit) -> Result<Unit> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidName("unit name cannot be empty".to_string()));
    }
    if !fits_money_precision(new.opening_balance) {
        return Err(Error::InvalidAmount(format!(
            "opening balance {} has more than two decimal places",
            new.opening_balance
        )));
    }
    if !within_money_bounds(new.opening_balance) {
        return Err(Error::InvalidAmount(format!(
            "opening balance {} exceeds the maximum of {}",
            new.opening_balance, MAX_AMOUNT
        )));
    }
    let currency = RateTable::new(conn).get(&new.currency)?;
    get_user(conn, new.owner)?;

    let unit = conn
        .query_row(
            &format!(
                "INSERT INTO units(name, type, currency, balance, include_in_total, owner)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {UNIT_COLUMNS}"
            ),
            params![
                name,
                new.unit_type,
                currency.code,
                new.opening_balance.to_string(),
                new.include_in_total,
                new.owner
            ],
            map_unit,
        )
        .map_err(|e| Error::from_insert(e, name))?;
    tracing::info!(unit = unit.id, owner = unit.owner, kind = %unit.unit_type, "unit created");
    Ok(unit)
}

pub fn get_unit(conn: &Connection, id: UnitId) -> Result<Unit> {
    conn.query_row(
        &format!("SELECT {UNIT_COLUMNS} FROM units WHERE id=?1"),
        params![id],
        map_unit,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("unit {}", id)))
}

pub fn unit_by_name(conn: &Connection, owner: UserId, name: &str) -> Result<Unit> {
    let name = name.trim();
    conn.query_row(
        &format!("SELECT {UNIT_COLUMNS} FROM units WHERE owner=?1 AND name=?2"),
        params![owner, name],
        map_unit,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("unit '{}'", name)))
}

pub fn list_units(
    conn: &Connection,
    owner: UserId,
    unit_type: Option<UnitType>,
) -> Result<Vec<Unit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {UNIT_COLUMNS} FROM units
         WHERE owner=?1 AND (?2 IS NULL OR type=?2)
         ORDER BY type, name"
    ))?;
    let rows = stmt.query_map(params![owner, unit_type], map_unit)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn update_unit(conn: &Connection, id: UnitId, owner: UserId, patch: &UnitPatch) -> Result<Unit> {
    let current = get_unit(conn, id)?;
    if current.owner != owner {
        return Err(Error::NotFound(format!("unit {}", id)));
    }
    let name = patch
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or(current.name.as_str())
        .to_string();
    if name.is_empty() {
        return Err(Error::InvalidName("unit name cannot be empty".to_string()));
    }
    let unit_type = patch.unit_type.unwrap_or(current.unit_type);
    let include = patch.include_in_total.unwrap_or(current.include_in_total);

    conn.execute(
        "UPDATE units SET name=?1, type=?2, include_in_total=?3 WHERE id=?4",
        params![name, unit_type, include, id],
    )
    .map_err(|e| Error::from_insert(e, &name))?;
    if unit_type != current.unit_type {
        tracing::warn!(
            unit = id,
            from = %current.unit_type,
            to = %unit_type,
            "unit retyped; existing transactions keep their recorded shape"
        );
    }
    get_unit(conn, id)
}

/// Add `delta` to the unit's balance and return the new balance. A result
/// beyond [MAX_AMOUNT] in either direction is rejected with
/// [Error::InvalidAmount].
///
/// Runs inside the caller's transaction when there is one, otherwise in its
/// own write transaction.
pub fn adjust_balance(conn: &Connection, id: UnitId, delta: Decimal) -> Result<Decimal> {
    if !conn.is_autocommit() {
        return apply_delta(conn, id, delta);
    }
    let tx = begin_write(conn)?;
    let balance = apply_delta(&tx, id, delta)?;
    tx.commit()?;
    Ok(balance)
}

fn apply_delta(conn: &Connection, id: UnitId, delta: Decimal) -> Result<Decimal> {
    let current = conn
        .query_row("SELECT balance FROM units WHERE id=?1", params![id], |r| {
            decimal_at(r, 0)
        })
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("unit {}", id)))?;
    let balance = current
        .checked_add(delta)
        .filter(|b| within_money_bounds(*b))
        .ok_or_else(|| {
            Error::InvalidAmount(format!(
                "balance of unit {} would exceed the maximum of {}",
                id, MAX_AMOUNT
            ))
        })?;
    conn.execute(
        "UPDATE units SET balance=?1 WHERE id=?2",
        params![balance.to_string(), id],
    )?;
    Ok(balance)
}

/// Zero the balance of every unit whose type is in `types`, optionally only
/// for one owner. Returns the number of units touched.
pub fn reset(conn: &Connection, types: &[UnitType], owner: Option<UserId>) -> Result<usize> {
    if types.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; types.len()].join(",");
    let mut sql = format!("UPDATE units SET balance='0' WHERE type IN ({placeholders})");
    let mut args: Vec<&dyn rusqlite::ToSql> =
        types.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
    if let Some(owner) = owner.as_ref() {
        sql.push_str(" AND owner=?");
        args.push(owner);
    }

    let tx = begin_write(conn)?;
    let n = tx.execute(&sql, params_from_iter(args))?;
    tx.commit()?;
    Ok(n)
}

/// Sum of the owner's account balances flagged `include_in_total`, in
/// `currency`, the owner's default currency, or the first account's
/// currency, in that order of preference.
pub fn total_balance(
    conn: &Connection,
    rates: &dyn RateLookup,
    owner: UserId,
    currency: Option<&str>,
) -> Result<(String, Decimal)> {
    let accounts: Vec<Unit> = list_units(conn, owner, Some(UnitType::Account))?
        .into_iter()
        .filter(|u| u.include_in_total)
        .collect();
    let target = match currency {
        Some(c) => c.trim().to_ascii_uppercase(),
        None => match default_currency(conn, owner)? {
            Some(c) => c,
            None => match accounts.first() {
                Some(u) => u.currency.clone(),
                None => return Ok((String::new(), Decimal::ZERO)),
            },
        },
    };
    let mut total = Decimal::ZERO;
    for unit in &accounts {
        let converted = convert(rates, unit.balance, &unit.currency, &target)?;
        total = total.checked_add(converted).ok_or_else(|| Error::Conversion {
            from: unit.currency.clone(),
            to: target.clone(),
            reason: "total overflows".to_string(),
        })?;
    }
    Ok((target, total))
}
