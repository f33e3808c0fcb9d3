// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::User;
use crate::users::{create_user, list_users, set_default_currency, user_by_name};
use crate::utils::pretty_table;
use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let admin = sub.get_flag("admin");
            let user = create_user(conn, name, admin)?;
            println!(
                "Added user '{}'{}",
                user.name,
                if user.is_admin { " (admin)" } else { "" }
            );
        }
        Some(("list", _)) => {
            let data = list_users(conn)?
                .into_iter()
                .map(|u| vec![u.id.to_string(), u.name, u.is_admin.to_string()])
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Admin"], data));
        }
        Some(("default-currency", sub)) => {
            let user = requester(conn, sub)?;
            let ccy = sub.get_one::<String>("currency").unwrap();
            let code = set_default_currency(conn, user.id, ccy)?;
            println!("Default currency for '{}' set to {}", user.name, code);
        }
        _ => {}
    }
    Ok(())
}

/// Resolve the `--user` argument.
pub fn requester(conn: &Connection, sub: &clap::ArgMatches) -> Result<User> {
    let name = sub.get_one::<String>("user").unwrap();
    user_by_name(conn, name).with_context(|| format!("Unknown user '{}'", name.trim()))
}
