// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime settings. Read from an optional `spendlog.toml` (or the file given
//! on the command line), overridden by `SPENDLOG_*` environment variables
//! with `__` between nested keys, e.g. `SPENDLOG_RATES__ACCESS_KEY`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_RATES_URL: &str = "http://api.exchangeratesapi.io/v1/latest";

#[derive(Debug, Default, Deserialize)]
pub struct Database {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Rates {
    pub url: String,
    pub access_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: Database,
    pub rates: Rates,
    pub telegram: Option<Telegram>,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("spendlog").required(false),
        };
        Config::builder()
            .set_default("rates.url", DEFAULT_RATES_URL)?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("SPENDLOG")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spendlog.toml");
        fs::write(
            &path,
            r#"
            [database]
            path = "/tmp/ledger.sqlite"

            [rates]
            access_key = "abc123"

            [telegram]
            token = "bot-token"
            chat_id = "42"
            "#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.rates.url, DEFAULT_RATES_URL);
        assert_eq!(settings.rates.access_key.as_deref(), Some("abc123"));
        assert_eq!(
            settings.database.path,
            Some(PathBuf::from("/tmp/ledger.sqlite"))
        );
        let telegram = settings.telegram.unwrap();
        assert_eq!(telegram.chat_id, "42");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
