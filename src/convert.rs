// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use crate::rates::RateLookup;
use crate::utils::round_money;
use rust_decimal::Decimal;

/// Convert `amount` from `from_ccy` to `to_ccy`.
///
/// Both rates are quoted against the same base, so `rate(to) / rate(from)`
/// is the direct cross rate. The result is rounded to money precision. A
/// same-currency conversion returns `amount` untouched without a lookup.
pub fn convert(
    rates: &dyn RateLookup,
    amount: Decimal,
    from_ccy: &str,
    to_ccy: &str,
) -> Result<Decimal> {
    if from_ccy == to_ccy {
        return Ok(amount);
    }
    let lookup = |code: &str| -> Result<Decimal> {
        match rates.rate(code) {
            Ok(r) if r > Decimal::ZERO => Ok(r),
            Ok(r) => Err(conversion_error(from_ccy, to_ccy, format!("{} has rate {}", code, r))),
            Err(Error::NotFound(what)) => {
                Err(conversion_error(from_ccy, to_ccy, format!("{} is unknown", what)))
            }
            Err(e) => Err(e),
        }
    };
    let from_rate = lookup(from_ccy)?;
    let to_rate = lookup(to_ccy)?;

    let cross = to_rate
        .checked_div(from_rate)
        .ok_or_else(|| conversion_error(from_ccy, to_ccy, "rate ratio overflows".to_string()))?;
    let converted = amount
        .checked_mul(cross)
        .ok_or_else(|| conversion_error(from_ccy, to_ccy, "amount overflows".to_string()))?;
    Ok(round_money(converted))
}

fn conversion_error(from: &str, to: &str, reason: String) -> Error {
    Error::Conversion {
        from: from.to_string(),
        to: to.to_string(),
        reason,
    }
}
