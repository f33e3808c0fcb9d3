// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command};

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .short('u')
        .required(true)
        .help("Name of the user acting")
}

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl")
            .help("Print as pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    ]
}

fn unit_type_arg() -> Arg {
    Arg::new("type")
        .long("type")
        .value_parser(["income", "expense", "account"])
        .ignore_case(true)
}

pub fn build_cli() -> Command {
    Command::new("spendlog")
        .about("Income, expense and account ledger with currency conversion")
        .version(clap::crate_version!())
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Settings file (defaults to ./spendlog.toml when present)"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .help("SQLite database path, overrides the configured one"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("user")
                .about("Manage users")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("admin").long("admin").action(ArgAction::SetTrue)),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("default-currency")
                        .about("Set the currency totals are shown in")
                        .arg(user_arg())
                        .arg(Arg::new("currency").required(true)),
                ),
        )
        .subcommand(
            Command::new("currency")
                .about("Exchange rates")
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(
                    Command::new("set")
                        .about("Insert or overwrite a rate by hand")
                        .arg(Arg::new("code").required(true))
                        .arg(Arg::new("rate").required(true)),
                )
                .subcommand(
                    Command::new("convert")
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ),
        )
        .subcommand(
            Command::new("unit")
                .about("Income sources, expense buckets and accounts")
                .subcommand(
                    Command::new("add")
                        .arg(user_arg())
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(unit_type_arg().required(true))
                        .arg(Arg::new("currency").long("currency").required(true))
                        .arg(Arg::new("opening-balance").long("opening-balance"))
                        .arg(
                            Arg::new("exclude-from-total")
                                .long("exclude-from-total")
                                .action(ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .arg(user_arg())
                        .arg(unit_type_arg())
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(user_arg())
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("rename").long("rename"))
                        .arg(unit_type_arg())
                        .arg(
                            Arg::new("include-in-total")
                                .long("include-in-total")
                                .value_parser(clap::value_parser!(bool)),
                        ),
                )
                .subcommand(
                    Command::new("total")
                        .about("Sum of account balances included in the total")
                        .arg(user_arg())
                        .arg(Arg::new("currency").long("currency")),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and edit transfers between units")
                .subcommand(
                    Command::new("add")
                        .arg(user_arg())
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true))
                        .arg(Arg::new("source-amount").long("source-amount"))
                        .arg(Arg::new("destination-amount").long("destination-amount")),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(user_arg())
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        )
                        .arg(Arg::new("from").long("from"))
                        .arg(Arg::new("to").long("to"))
                        .arg(Arg::new("source-amount").long("source-amount"))
                        .arg(Arg::new("destination-amount").long("destination-amount")),
                )
                .subcommand(
                    Command::new("rm").arg(user_arg()).arg(
                        Arg::new("id")
                            .long("id")
                            .required(true)
                            .value_parser(clap::value_parser!(i64)),
                    ),
                )
                .subcommand(Command::new("list").arg(user_arg()).args(json_args())),
        )
        .subcommand(
            Command::new("maintenance")
                .about("Jobs meant to run on a timer")
                .subcommand(
                    Command::new("refresh-rates").about("Fetch the latest exchange rates"),
                )
                .subcommand(
                    Command::new("reset").about("Zero all income and expense balances"),
                ),
        )
}
