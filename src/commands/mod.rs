// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod currency;
pub mod maintenance;
pub mod transactions;
pub mod units;
pub mod users;
