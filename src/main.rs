// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use spendlog::{cli, commands, config::Settings, db, logging};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();
    logging::init(matches.get_flag("verbose"));

    let settings = Settings::load(matches.get_one::<String>("config").map(Path::new))
        .context("Failed to load settings")?;
    let path = match matches.get_one::<String>("db") {
        Some(p) => PathBuf::from(p),
        None => match &settings.database.path {
            Some(p) => p.clone(),
            None => db::default_db_path()?,
        },
    };
    let conn = db::open_or_init(&path)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", path.display());
        }
        Some(("user", sub)) => commands::users::handle(&conn, sub)?,
        Some(("currency", sub)) => commands::currency::handle(&conn, sub)?,
        Some(("unit", sub)) => commands::units::handle(&conn, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&conn, sub)?,
        Some(("maintenance", sub)) => commands::maintenance::handle(&conn, &settings, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
