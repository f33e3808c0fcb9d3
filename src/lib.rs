// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod maintenance;
pub mod models;
pub mod notify;
pub mod rates;
pub mod units;
pub mod users;
pub mod utils;

pub use error::{Error, Result};
