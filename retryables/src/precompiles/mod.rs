// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

pub mod aggregator;
pub mod call;
pub mod constants;
pub mod error;
pub mod gas;
pub mod provider;
pub mod retryable_tx;

mod guard;
