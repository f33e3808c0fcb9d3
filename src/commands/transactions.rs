// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::users::requester;
use crate::engine::{NewTransaction, TransactionEngine, TransactionPatch};
use crate::models::{Unit, UnitId, User};
use crate::rates::RateTable;
use crate::units::{get_unit, unit_by_name};
use crate::utils::{maybe_print_json, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let table = RateTable::new(conn);
    let engine = TransactionEngine::new(conn, &table);
    match m.subcommand() {
        Some(("add", sub)) => add(conn, &engine, sub)?,
        Some(("edit", sub)) => edit(conn, &engine, sub)?,
        Some(("rm", sub)) => {
            let user = requester(conn, sub)?;
            let id = *sub.get_one::<i64>("id").unwrap();
            let removed = engine.delete_transaction(&user, id)?;
            println!(
                "Removed transaction #{} ({} -> {})",
                removed.id, removed.source_amount, removed.destination_amount
            );
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn optional_amount(sub: &clap::ArgMatches, name: &str) -> Result<Option<Decimal>> {
    sub.get_one::<String>(name)
        .map(|s| parse_decimal(s))
        .transpose()
}

fn add(conn: &Connection, engine: &TransactionEngine<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = requester(conn, sub)?;
    let from = unit_by_name(conn, user.id, sub.get_one::<String>("from").unwrap())?;
    let to = unit_by_name(conn, user.id, sub.get_one::<String>("to").unwrap())?;
    let created = engine.create_transaction(
        &user,
        NewTransaction {
            source_unit: from.id,
            destination_unit: to.id,
            source_amount: optional_amount(sub, "source-amount")?,
            destination_amount: optional_amount(sub, "destination-amount")?,
        },
    )?;
    println!(
        "Recorded #{}: {} {} from '{}' -> {} {} to '{}'",
        created.id,
        created.source_amount,
        from.currency,
        from.name,
        created.destination_amount,
        to.currency,
        to.name
    );
    Ok(())
}

fn edit(conn: &Connection, engine: &TransactionEngine<'_>, sub: &clap::ArgMatches) -> Result<()> {
    let user = requester(conn, sub)?;
    let id = *sub.get_one::<i64>("id").unwrap();
    // unit names belong to the transaction's owner, which differs from the
    // requester when an admin edits someone else's record
    let owner = engine.get_transaction(&user, id)?.owner;
    let unit_id = |arg: &str| -> Result<Option<i64>> {
        match sub.get_one::<String>(arg) {
            Some(name) => Ok(Some(unit_by_name(conn, owner, name)?.id)),
            None => Ok(None),
        }
    };
    let patch = TransactionPatch {
        source_unit: unit_id("from")?,
        destination_unit: unit_id("to")?,
        source_amount: optional_amount(sub, "source-amount")?,
        destination_amount: optional_amount(sub, "destination-amount")?,
    };
    let updated = engine.update_transaction(&user, id, patch)?;
    println!(
        "Updated #{}: {} -> {}",
        updated.id, updated.source_amount, updated.destination_amount
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = requester(conn, sub)?;
    let data = query_rows(conn, &user)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.source.clone(),
                    format!("{} {}", r.source_amount, r.source_currency),
                    r.destination.clone(),
                    format!("{} {}", r.destination_amount, r.destination_currency),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Id", "Date", "From", "Amount", "To", "Amount"], rows)
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub source: String,
    pub source_amount: String,
    pub source_currency: String,
    pub destination: String,
    pub destination_amount: String,
    pub destination_currency: String,
}

/// Transactions visible to `user` with unit names resolved, in the order
/// [TransactionEngine::list_transactions] returns them.
pub fn query_rows(conn: &Connection, user: &User) -> Result<Vec<TransactionRow>> {
    let table = RateTable::new(conn);
    let engine = TransactionEngine::new(conn, &table);
    let mut units: HashMap<UnitId, Unit> = HashMap::new();
    let mut data = Vec::new();
    for t in engine.list_transactions(user)? {
        let source = cached_unit(conn, &mut units, t.source_unit)?;
        let destination = cached_unit(conn, &mut units, t.destination_unit)?;
        data.push(TransactionRow {
            id: t.id,
            date: t.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            source: source.name,
            source_amount: t.source_amount.to_string(),
            source_currency: source.currency,
            destination: destination.name,
            destination_amount: t.destination_amount.to_string(),
            destination_currency: destination.currency,
        });
    }
    Ok(data)
}

fn cached_unit(conn: &Connection, cache: &mut HashMap<UnitId, Unit>, id: UnitId) -> Result<Unit> {
    if let Some(u) = cache.get(&id) {
        return Ok(u.clone());
    }
    let u = get_unit(conn, id)?;
    cache.insert(id, u.clone());
    Ok(u)
}
