// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Currency rate table and the external feed that refreshes it.
//!
//! Rates are stored against whatever base currency the feed quotes in. Only
//! ratios between two stored rates are meaningful, see [crate::convert].

use crate::db::begin_write;
use crate::error::{Error, Result};
use crate::models::Currency;
use crate::utils::{decimal_at, normalize_code};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Read access to exchange rates.
pub trait RateLookup {
    /// Rate of `code` relative to the common base, or [Error::NotFound].
    fn rate(&self, code: &str) -> Result<Decimal>;
}

impl<T: RateLookup + ?Sized> RateLookup for &T {
    fn rate(&self, code: &str) -> Result<Decimal> {
        (**self).rate(code)
    }
}

impl RateLookup for HashMap<String, Decimal> {
    fn rate(&self, code: &str) -> Result<Decimal> {
        self.get(code)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("currency {}", code)))
    }
}

/// A source of fresh rates, keyed by upper-case currency code.
pub trait RateFeed {
    fn fetch(&self) -> Result<BTreeMap<String, Decimal>>;
}

/// Fetches `{"rates": {"USD": 1.08, ...}}` style payloads over HTTP.
pub struct HttpRateFeed {
    client: reqwest::blocking::Client,
    url: String,
    access_key: Option<String>,
}

impl HttpRateFeed {
    pub fn new(client: reqwest::blocking::Client, url: String, access_key: Option<String>) -> Self {
        Self {
            client,
            url,
            access_key,
        }
    }
}

impl RateFeed for HttpRateFeed {
    fn fetch(&self) -> Result<BTreeMap<String, Decimal>> {
        let mut req = self.client.get(&self.url);
        if let Some(key) = &self.access_key {
            req = req.query(&[("access_key", key)]);
        }
        let resp = req.send().map_err(|e| Error::RateFeed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::RateFeed(format!("feed answered {}", status)));
        }
        let body = resp.text().map_err(|e| Error::RateFeed(e.to_string()))?;
        parse_feed_body(&body)
    }
}

#[derive(Debug, Deserialize)]
struct FeedPayload {
    rates: Option<HashMap<String, Decimal>>,
}

/// Validate a feed response. Any malformed entry rejects the whole payload
/// so a refresh never writes a partial set of rates. Rates keep every digit
/// the feed sent.
pub fn parse_feed_body(body: &str) -> Result<BTreeMap<String, Decimal>> {
    let payload: FeedPayload =
        serde_json::from_str(body).map_err(|e| Error::RateFeed(format!("bad payload: {}", e)))?;
    let rates = payload
        .rates
        .filter(|r| !r.is_empty())
        .ok_or_else(|| Error::RateFeed("payload has no rates".to_string()))?;

    let mut out = BTreeMap::new();
    for (code, rate) in rates {
        let norm = normalize_code(&code)
            .ok_or_else(|| Error::RateFeed(format!("malformed currency code '{}'", code)))?;
        if rate <= Decimal::ZERO {
            return Err(Error::RateFeed(format!("non-positive rate {} for {}", rate, code)));
        }
        out.insert(norm, rate);
    }
    Ok(out)
}

/// The stored rate table.
pub struct RateTable<'c> {
    conn: &'c Connection,
}

impl<'c> RateTable<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn get(&self, code: &str) -> Result<Currency> {
        let code = code.trim().to_ascii_uppercase();
        self.conn
            .query_row(
                "SELECT code, rate FROM currencies WHERE code=?1",
                params![code],
                |r| {
                    Ok(Currency {
                        code: r.get(0)?,
                        rate: decimal_at(r, 1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("currency {}", code)))
    }

    pub fn list(&self) -> Result<Vec<Currency>> {
        let mut stmt = self
            .conn
            .prepare("SELECT code, rate FROM currencies ORDER BY code")?;
        let rows = stmt.query_map([], |r| {
            Ok(Currency {
                code: r.get(0)?,
                rate: decimal_at(r, 1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Insert or overwrite a single rate.
    pub fn upsert(&self, code: &str, rate: Decimal) -> Result<Currency> {
        let code = normalize_code(code)
            .ok_or_else(|| Error::InvalidCurrency(format!("'{}' is not a 3-letter code", code)))?;
        if rate <= Decimal::ZERO {
            return Err(Error::InvalidCurrency(format!(
                "rate for {} must be positive, got {}",
                code, rate
            )));
        }
        upsert_row(self.conn, &code, rate)?;
        Ok(Currency { code, rate })
    }

    /// Fetch rates from `feed` and upsert all of them in one store
    /// transaction. On any failure the stored rates are left untouched.
    pub fn refresh(&self, feed: &dyn RateFeed) -> Result<usize> {
        let rates = feed.fetch()?;
        let tx = begin_write(self.conn)?;
        for (code, rate) in &rates {
            upsert_row(&tx, code, *rate)?;
        }
        tx.commit()?;
        tracing::info!(count = rates.len(), "currency rates refreshed");
        Ok(rates.len())
    }
}

impl RateLookup for RateTable<'_> {
    fn rate(&self, code: &str) -> Result<Decimal> {
        self.get(code).map(|c| c.rate)
    }
}

fn upsert_row(conn: &Connection, code: &str, rate: Decimal) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO currencies(code, rate) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET rate=excluded.rate, updated_at=datetime('now')",
        params![code, rate.to_string()],
    )?;
    Ok(())
}
