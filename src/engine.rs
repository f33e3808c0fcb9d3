// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The transaction engine applies, amends and reverses transfers between two
//! units.
//!
//! Only two shapes of transfer exist:
//!
//! | source  | destination        | source balance | destination balance |
//! |---------|--------------------|----------------|---------------------|
//! | INCOME  | ACCOUNT            | `+ source`     | `+ destination`     |
//! | ACCOUNT | ACCOUNT or EXPENSE | `- source`     | `+ destination`     |
//!
//! Every operation runs in one write transaction: units are read in id
//! order, all validation happens before the first balance changes, and any
//! error drops the transaction, which rolls everything back.

use crate::convert::convert;
use crate::db::begin_write;
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionId, TransferShape, Unit, UnitId, UnitType, User, UserId};
use crate::rates::RateLookup;
use crate::units::{adjust_balance, get_unit};
use crate::utils::{decimal_at, fits_money_precision, within_money_bounds, MAX_AMOUNT};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

impl TransferShape {
    /// Classify a `(source, destination)` type pair, rejecting everything but
    /// the two permitted transfers.
    pub fn classify(source: UnitType, destination: UnitType) -> Result<Self> {
        use UnitType::*;
        match (source, destination) {
            (Income, Account) => Ok(TransferShape::IncomeToAccount),
            (Account, Account | Expense) => Ok(TransferShape::AccountOutflow),
            (Income, Income | Expense) | (Account, Income) | (Expense, _) => {
                Err(Error::InvalidTransferShape(format!(
                    "{} -> {} is not allowed; money moves from INCOME to ACCOUNT \
                     or from ACCOUNT to ACCOUNT or EXPENSE",
                    source, destination
                )))
            }
        }
    }

    /// Signed balance changes `(source, destination)` for applying a transfer
    /// of these amounts.
    pub fn effect(self, source_amount: Decimal, destination_amount: Decimal) -> (Decimal, Decimal) {
        match self {
            TransferShape::IncomeToAccount => (source_amount, destination_amount),
            TransferShape::AccountOutflow => (-source_amount, destination_amount),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub source_unit: UnitId,
    pub destination_unit: UnitId,
    pub source_amount: Option<Decimal>,
    pub destination_amount: Option<Decimal>,
}

/// Fields to change on an existing transaction. `None` keeps the unit; for
/// amounts see [TransactionEngine::update_transaction].
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub source_unit: Option<UnitId>,
    pub destination_unit: Option<UnitId>,
    pub source_amount: Option<Decimal>,
    pub destination_amount: Option<Decimal>,
}

/// A fully resolved transfer, ready to be applied.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Transfer {
    source_unit: UnitId,
    destination_unit: UnitId,
    source_amount: Decimal,
    destination_amount: Decimal,
    shape: TransferShape,
}

impl From<&Transaction> for Transfer {
    fn from(t: &Transaction) -> Self {
        Transfer {
            source_unit: t.source_unit,
            destination_unit: t.destination_unit,
            source_amount: t.source_amount,
            destination_amount: t.destination_amount,
            shape: t.shape,
        }
    }
}

/// Pending balance changes keyed by unit. Iteration is in id order, which is
/// also the order the changes are written.
#[derive(Debug, Default, PartialEq)]
struct Deltas(BTreeMap<UnitId, Decimal>);

impl Deltas {
    fn add(&mut self, unit: UnitId, delta: Decimal) -> Result<()> {
        let entry = self.0.entry(unit).or_insert(Decimal::ZERO);
        *entry = entry.checked_add(delta).ok_or_else(|| {
            Error::InvalidAmount(format!("change to unit {} overflows", unit))
        })?;
        Ok(())
    }

    fn apply(&mut self, t: &Transfer) -> Result<()> {
        let (s, d) = t.shape.effect(t.source_amount, t.destination_amount);
        self.add(t.source_unit, s)?;
        self.add(t.destination_unit, d)
    }

    fn reverse(&mut self, t: &Transfer) -> Result<()> {
        let (s, d) = t.shape.effect(t.source_amount, t.destination_amount);
        self.add(t.source_unit, -s)?;
        self.add(t.destination_unit, -d)
    }

    /// Changes that take balances from `old` applied to `new` applied.
    ///
    /// When the units and shape are unchanged only the difference in amounts
    /// moves the balances. Otherwise `old` is reversed and `new` applied,
    /// which is the same thing for the unchanged case.
    fn amend(old: &Transfer, new: &Transfer) -> Result<Self> {
        let mut deltas = Deltas::default();
        if old.shape == new.shape
            && old.source_unit == new.source_unit
            && old.destination_unit == new.destination_unit
        {
            let source_delta = old.source_amount - new.source_amount;
            let destination_delta = old.destination_amount - new.destination_amount;
            let (s, d) = new.shape.effect(source_delta, destination_delta);
            deltas.add(new.source_unit, -s)?;
            deltas.add(new.destination_unit, -d)?;
        } else {
            deltas.reverse(old)?;
            deltas.apply(new)?;
        }
        Ok(deltas)
    }

    fn write(&self, conn: &Connection) -> Result<()> {
        for (unit, delta) in &self.0 {
            if !delta.is_zero() {
                adjust_balance(conn, *unit, *delta)?;
            }
        }
        Ok(())
    }
}

fn check_amount(label: &str, amount: Decimal) -> Result<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(Error::InvalidAmount(format!(
            "{} {} must not be negative",
            label, amount
        )));
    }
    if !fits_money_precision(amount) {
        return Err(Error::InvalidAmount(format!(
            "{} {} has more than two decimal places",
            label, amount
        )));
    }
    if !within_money_bounds(amount) {
        return Err(Error::InvalidAmount(format!(
            "{} {} exceeds the maximum of {}",
            label, amount, MAX_AMOUNT
        )));
    }
    Ok(amount)
}

/// Fill in whichever amount is missing.
///
/// Given amounts are used as they are. A single missing amount is copied
/// from the other side when both units share a currency and converted from
/// the other side's currency otherwise.
pub fn resolve_amounts(
    rates: &dyn RateLookup,
    source: &Unit,
    destination: &Unit,
    source_amount: Option<Decimal>,
    destination_amount: Option<Decimal>,
) -> Result<(Decimal, Decimal)> {
    let source_amount = source_amount
        .map(|a| check_amount("source amount", a))
        .transpose()?;
    let destination_amount = destination_amount
        .map(|a| check_amount("destination amount", a))
        .transpose()?;

    match (source_amount, destination_amount) {
        (Some(s), Some(d)) => Ok((s, d)),
        (Some(s), None) => {
            let d = convert(rates, s, &source.currency, &destination.currency)?;
            Ok((s, check_amount("destination amount", d)?))
        }
        (None, Some(d)) => {
            let s = convert(rates, d, &destination.currency, &source.currency)?;
            Ok((check_amount("source amount", s)?, d))
        }
        (None, None) => Err(Error::MissingAmount),
    }
}

const TRANSACTION_COLUMNS: &str = "id, created_at, owner, source_unit, destination_unit, \
                                   source_amount, destination_amount, shape";

fn map_transaction(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        created_at: r.get(1)?,
        owner: r.get(2)?,
        source_unit: r.get(3)?,
        destination_unit: r.get(4)?,
        source_amount: decimal_at(r, 5)?,
        destination_amount: decimal_at(r, 6)?,
        shape: r.get(7)?,
    })
}

pub struct TransactionEngine<'c> {
    conn: &'c Connection,
    rates: &'c dyn RateLookup,
}

impl<'c> TransactionEngine<'c> {
    pub fn new(conn: &'c Connection, rates: &'c dyn RateLookup) -> Self {
        Self { conn, rates }
    }

    /// Record a transfer for `requester` and apply it to both units.
    pub fn create_transaction(&self, requester: &User, req: NewTransaction) -> Result<Transaction> {
        let tx = begin_write(self.conn)?;
        let owner = requester.id;
        let (source, destination) =
            load_unit_pair(&tx, req.source_unit, req.destination_unit, owner)?;
        let shape = TransferShape::classify(source.unit_type, destination.unit_type)?;
        let (source_amount, destination_amount) = resolve_amounts(
            self.rates,
            &source,
            &destination,
            req.source_amount,
            req.destination_amount,
        )?;
        let transfer = Transfer {
            source_unit: source.id,
            destination_unit: destination.id,
            source_amount,
            destination_amount,
            shape,
        };

        let mut deltas = Deltas::default();
        deltas.apply(&transfer)?;
        deltas.write(&tx)?;

        let created = tx.query_row(
            &format!(
                "INSERT INTO transactions(created_at, owner, source_unit, destination_unit,
                     source_amount, destination_amount, shape)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {TRANSACTION_COLUMNS}"
            ),
            params![
                Utc::now(),
                owner,
                transfer.source_unit,
                transfer.destination_unit,
                transfer.source_amount.to_string(),
                transfer.destination_amount.to_string(),
                transfer.shape
            ],
            map_transaction,
        )?;
        tx.commit()?;
        tracing::info!(
            transaction = created.id,
            owner,
            shape = created.shape.as_str(),
            source_amount = %created.source_amount,
            destination_amount = %created.destination_amount,
            "transaction applied"
        );
        Ok(created)
    }

    /// Change an existing transaction and move both balances to where they
    /// would be had the new version been recorded instead of the old one.
    ///
    /// Omitted units are kept. Omitted amounts are resolved again: with one
    /// amount given the other is derived from it; with neither given the old
    /// amounts stay when the units are unchanged, otherwise the old source
    /// amount is kept and the destination amount derived.
    pub fn update_transaction(
        &self,
        requester: &User,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Transaction> {
        let tx = begin_write(self.conn)?;
        let old = load_visible(&tx, id, requester)?;
        let source_id = patch.source_unit.unwrap_or(old.source_unit);
        let destination_id = patch.destination_unit.unwrap_or(old.destination_unit);
        let (source, destination) = load_unit_pair(&tx, source_id, destination_id, old.owner)?;
        let shape = TransferShape::classify(source.unit_type, destination.unit_type)?;

        let units_changed = source_id != old.source_unit || destination_id != old.destination_unit;
        let (source_amount, destination_amount) =
            match (patch.source_amount, patch.destination_amount) {
                (None, None) if !units_changed => (old.source_amount, old.destination_amount),
                (None, None) => {
                    resolve_amounts(self.rates, &source, &destination, Some(old.source_amount), None)?
                }
                (s, d) => resolve_amounts(self.rates, &source, &destination, s, d)?,
            };
        let new = Transfer {
            source_unit: source_id,
            destination_unit: destination_id,
            source_amount,
            destination_amount,
            shape,
        };

        Deltas::amend(&Transfer::from(&old), &new)?.write(&tx)?;

        let updated = tx.query_row(
            &format!(
                "UPDATE transactions SET source_unit=?1, destination_unit=?2,
                     source_amount=?3, destination_amount=?4, shape=?5
                 WHERE id=?6 RETURNING {TRANSACTION_COLUMNS}"
            ),
            params![
                new.source_unit,
                new.destination_unit,
                new.source_amount.to_string(),
                new.destination_amount.to_string(),
                new.shape,
                id
            ],
            map_transaction,
        )?;
        tx.commit()?;
        tracing::info!(
            transaction = id,
            by = requester.id,
            source_amount = %updated.source_amount,
            destination_amount = %updated.destination_amount,
            "transaction amended"
        );
        Ok(updated)
    }

    /// Undo a transaction's recorded effect and remove it. Returns the record
    /// as it was before deletion.
    pub fn delete_transaction(&self, requester: &User, id: TransactionId) -> Result<Transaction> {
        let tx = begin_write(self.conn)?;
        let old = load_visible(&tx, id, requester)?;
        let mut deltas = Deltas::default();
        deltas.reverse(&Transfer::from(&old))?;
        deltas.write(&tx)?;
        tx.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
        tx.commit()?;
        tracing::info!(transaction = id, by = requester.id, "transaction reversed");
        Ok(old)
    }

    pub fn get_transaction(&self, requester: &User, id: TransactionId) -> Result<Transaction> {
        load_visible(self.conn, id, requester)
    }

    /// Transactions visible to `requester`, oldest first. Admins see all.
    pub fn list_transactions(&self, requester: &User) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE ?1 OR owner=?2
             ORDER BY created_at, id"
        ))?;
        let rows = stmt.query_map(params![requester.is_admin, requester.id], map_transaction)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Load a transaction owned by `requester`, or any transaction for an admin.
/// Someone else's transaction is reported as not found.
fn load_visible(conn: &Connection, id: TransactionId, requester: &User) -> Result<Transaction> {
    let found = conn
        .query_row(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id=?1"),
            params![id],
            map_transaction,
        )
        .optional()?;
    match found {
        Some(t) if t.owner == requester.id || requester.is_admin => Ok(t),
        _ => Err(Error::NotFound(format!("transaction {}", id))),
    }
}

/// Read both units in ascending id order and check they belong to `owner`.
fn load_unit_pair(
    conn: &Connection,
    source: UnitId,
    destination: UnitId,
    owner: UserId,
) -> Result<(Unit, Unit)> {
    if source == destination {
        return Err(Error::InvalidTransferShape(
            "source and destination must be different units".to_string(),
        ));
    }
    let owned = |id: UnitId| -> Result<Unit> {
        let unit = get_unit(conn, id)?;
        if unit.owner != owner {
            return Err(Error::NotFound(format!("unit {}", id)));
        }
        Ok(unit)
    };
    if source < destination {
        let s = owned(source)?;
        let d = owned(destination)?;
        Ok((s, d))
    } else {
        let d = owned(destination)?;
        let s = owned(source)?;
        Ok((s, d))
    }
}
