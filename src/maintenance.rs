// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Entry points for the periodic jobs. Scheduling is left to whatever runs
//! them (cron, a systemd timer, ...).

use crate::error::Result;
use crate::models::UnitType;
use crate::notify::Notifier;
use crate::rates::{RateFeed, RateTable};
use crate::units;
use chrono::Local;
use rusqlite::Connection;

/// Refresh the rate table from `feed` and report the outcome to `notifier`.
///
/// A failed fetch leaves the stored rates as they were. The error is both
/// reported and returned; a failure to deliver the report is only logged.
pub fn refresh_rates(
    conn: &Connection,
    feed: &dyn RateFeed,
    notifier: &dyn Notifier,
) -> Result<usize> {
    let outcome = RateTable::new(conn).refresh(feed);
    let status = match &outcome {
        Ok(_) => "Currencies Updated",
        Err(e) => {
            tracing::error!("currency refresh failed: {}", e);
            "Currencies NOT Updated"
        }
    };
    let message = format!("{}\n{}", Local::now().format("%Y-%m-%d %H:%M:%S"), status);
    if let Err(e) = notifier.notify(&message) {
        tracing::warn!("could not deliver refresh notification: {}", e);
    }
    outcome
}

/// Zero every income and expense balance. Accounts are left alone.
pub fn reset_periodic_units(conn: &Connection) -> Result<usize> {
    let n = units::reset(conn, &UnitType::PERIODIC, None)?;
    tracing::info!(units = n, "income and expense balances reset");
    Ok(n)
}
