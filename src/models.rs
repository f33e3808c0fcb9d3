// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;
pub type UnitId = i64;
pub type TransactionId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    /// Rate relative to the feed's base currency.
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub is_admin: bool,
}

/// What a unit represents. Income and expense units track flows for the
/// current period and are zeroed by the monthly reset, accounts hold money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    Income,
    Expense,
    Account,
}

impl UnitType {
    pub const ALL: [UnitType; 3] = [UnitType::Income, UnitType::Expense, UnitType::Account];
    pub const PERIODIC: [UnitType; 2] = [UnitType::Income, UnitType::Expense];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitType::Income => "INCOME",
            UnitType::Expense => "EXPENSE",
            UnitType::Account => "ACCOUNT",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit type '{0}', expected income, expense or account")]
pub struct UnknownUnitType(pub String);

impl FromStr for UnitType {
    type Err = UnknownUnitType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(UnitType::Income),
            "EXPENSE" => Ok(UnitType::Expense),
            "ACCOUNT" => Ok(UnitType::Account),
            _ => Err(UnknownUnitType(s.to_string())),
        }
    }
}

impl ToSql for UnitType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for UnitType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub unit_type: UnitType,
    pub currency: String,
    pub balance: Decimal,
    pub include_in_total: bool,
    pub owner: UserId,
}

/// The two permitted ways money can move between units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferShape {
    /// Income flowing into an account. Both balances grow.
    IncomeToAccount,
    /// Money leaving an account for another account or an expense.
    AccountOutflow,
}

impl TransferShape {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferShape::IncomeToAccount => "income_to_account",
            TransferShape::AccountOutflow => "account_outflow",
        }
    }
}

impl ToSql for TransferShape {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TransferShape {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income_to_account" => Ok(TransferShape::IncomeToAccount),
            "account_outflow" => Ok(TransferShape::AccountOutflow),
            other => Err(FromSqlError::Other(
                format!("unknown transfer shape '{}'", other).into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub created_at: DateTime<Utc>,
    pub source_unit: UnitId,
    pub destination_unit: UnitId,
    pub source_amount: Decimal,
    pub destination_amount: Decimal,
    /// Shape the amounts were last applied with. Reversal follows this, not
    /// the units' current types.
    pub shape: TransferShape,
    pub owner: UserId,
}
