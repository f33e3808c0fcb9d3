// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::users::requester;
use crate::models::UnitType;
use crate::rates::RateTable;
use crate::units::{create_unit, list_units, total_balance, unit_by_name, update_unit, NewUnit, UnitPatch};
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("total", sub)) => {
            let user = requester(conn, sub)?;
            let ccy = sub.get_one::<String>("currency").map(|s| s.as_str());
            let table = RateTable::new(conn);
            let (code, total) = total_balance(conn, &table, user.id, ccy)?;
            if code.is_empty() {
                println!("No accounts included in the total");
            } else {
                println!("Total: {}", fmt_money(&total, &code));
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_type(sub: &clap::ArgMatches) -> Result<Option<UnitType>> {
    Ok(match sub.get_one::<String>("type") {
        Some(t) => Some(t.parse::<UnitType>()?),
        None => None,
    })
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = requester(conn, sub)?;
    let name = sub.get_one::<String>("name").unwrap();
    let unit_type = parse_type(sub)?.unwrap_or(UnitType::Account);
    let ccy = sub.get_one::<String>("currency").unwrap();
    let opening = match sub.get_one::<String>("opening-balance") {
        Some(s) => parse_decimal(s)?,
        None => rust_decimal::Decimal::ZERO,
    };
    let new = NewUnit::new(name, unit_type, ccy, user.id)
        .opening_balance(opening)
        .include_in_total(!sub.get_flag("exclude-from-total"));
    let unit = create_unit(conn, &new)?;
    println!(
        "Added {} '{}' ({}, {})",
        unit.unit_type, unit.name, unit.currency, unit.balance
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = requester(conn, sub)?;
    let units = list_units(conn, user.id, parse_type(sub)?)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &units)? {
        let data = units
            .into_iter()
            .map(|u| {
                vec![
                    u.name,
                    u.unit_type.to_string(),
                    u.currency,
                    format!("{:.2}", u.balance),
                    if u.include_in_total { "yes".into() } else { "no".into() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Name", "Type", "Currency", "Balance", "In total"], data)
        );
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = requester(conn, sub)?;
    let name = sub.get_one::<String>("name").unwrap();
    let unit = unit_by_name(conn, user.id, name)?;
    let patch = UnitPatch {
        name: sub.get_one::<String>("rename").cloned(),
        unit_type: parse_type(sub)?,
        include_in_total: sub.get_one::<bool>("include-in-total").copied(),
    };
    let updated = update_unit(conn, unit.id, user.id, &patch)?;
    println!(
        "Updated {} '{}' (in total: {})",
        updated.unit_type, updated.name, updated.include_in_total
    );
    Ok(())
}
