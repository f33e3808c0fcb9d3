// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The error type shared by the ledger core.

/// Errors returned by the rate table, unit ledger and transaction engine.
///
/// The `Display` text of every variant is fit to show to an end user.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A unit or user with this name already exists for the owner.
    #[error("the name \"{0}\" is already taken")]
    DuplicateName(String),

    /// A name is empty or otherwise unusable.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Neither the source nor the destination amount was given.
    #[error("a transaction needs a source amount, a destination amount, or both")]
    MissingAmount,

    /// An amount is negative or more precise than the ledger stores.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A currency code or rate is malformed.
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    /// A currency could not be resolved in the rate table.
    #[error("cannot convert {from} to {to}: {reason}")]
    Conversion {
        from: String,
        to: String,
        reason: String,
    },

    /// The unit types do not form one of the permitted transfers.
    #[error("invalid transfer: {0}")]
    InvalidTransferShape(String),

    /// The requested unit, transaction, currency or user does not exist
    /// (or is not visible to the requester).
    #[error("{0} not found")]
    NotFound(String),

    /// Fetching rates from the external feed failed.
    #[error("rate feed failed: {0}")]
    RateFeed(String),

    /// The notification channel rejected a message.
    #[error("notification failed: {0}")]
    Notify(String),

    /// An unexpected failure in the store. The surrounding store transaction
    /// has been rolled back.
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl Error {
    /// Map a UNIQUE constraint violation to [Error::DuplicateName], keep
    /// everything else as a persistence error.
    pub(crate) fn from_insert(error: rusqlite::Error, name: &str) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(e, _) if e.extended_code == SQLITE_CONSTRAINT_UNIQUE => {
                Error::DuplicateName(name.to_string())
            }
            e => Error::Persistence(e),
        }
    }
}

const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

pub type Result<T> = std::result::Result<T, Error>;
