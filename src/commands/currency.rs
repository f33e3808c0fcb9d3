// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::convert::convert;
use crate::rates::RateTable;
use crate::utils::{maybe_print_json, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list_rates(conn, sub)?,
        Some(("set", sub)) => {
            let code = sub.get_one::<String>("code").unwrap();
            let rate = parse_decimal(sub.get_one::<String>("rate").unwrap())?;
            let currency = RateTable::new(conn).upsert(code, rate)?;
            println!("Rate for {} set to {}", currency.code, currency.rate);
        }
        Some(("convert", sub)) => convert_amount(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn list_rates(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let rates = RateTable::new(conn).list()?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rates)? {
        let data = rates
            .into_iter()
            .map(|c| vec![c.code, c.rate.to_string()])
            .collect();
        println!("{}", pretty_table(&["Code", "Rate"], data));
    }
    Ok(())
}

fn convert_amount(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let from = sub.get_one::<String>("from").unwrap().trim().to_uppercase();
    let to = sub.get_one::<String>("to").unwrap().trim().to_uppercase();
    let table = RateTable::new(conn);
    let res = convert(&table, amount, &from, &to)?;
    println!("{} {} -> {:.2} {}", amount, from, res, to);
    Ok(())
}
