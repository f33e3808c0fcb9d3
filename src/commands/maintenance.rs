// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::maintenance::{refresh_rates, reset_periodic_units};
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::rates::HttpRateFeed;
use crate::utils::http_client;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, settings: &Settings, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("refresh-rates", _)) => {
            let client = http_client()?;
            let feed = HttpRateFeed::new(
                client.clone(),
                settings.rates.url.clone(),
                settings.rates.access_key.clone(),
            );
            let notifier: Box<dyn Notifier> = match &settings.telegram {
                Some(t) => Box::new(TelegramNotifier::new(
                    client,
                    t.token.clone(),
                    t.chat_id.clone(),
                )),
                None => Box::new(LogNotifier),
            };
            let n = refresh_rates(conn, &feed, notifier.as_ref())?;
            println!("Updated {} currency rates", n);
        }
        Some(("reset", _)) => {
            let n = reset_periodic_units(conn)?;
            println!("Reset {} income and expense units", n);
        }
        _ => {}
    }
    Ok(())
}
