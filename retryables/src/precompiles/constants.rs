// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

use revm::primitives::{Address, FixedBytes};

pub const RETRYABLE_TX_PRECOMPILE_ADDRESS: Address = Address(FixedBytes::new([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x6e,
]));

pub const AGGREGATOR_PRECOMPILE_ADDRESS: Address = Address(FixedBytes::new([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x6d,
]));

pub(crate) const CUSTOMS: [Address; 2] =
    [RETRYABLE_TX_PRECOMPILE_ADDRESS, AGGREGATOR_PRECOMPILE_ADDRESS];

// Frontier schedule, the costs retryable operations are priced with.
pub const SLOAD_GAS: u64 = 50;
pub const SSTORE_SET_GAS: u64 = 20_000;
pub const LOG_GAS: u64 = 375;
pub const LOG_TOPIC_GAS: u64 = 375;
pub const LOG_DATA_GAS: u64 = 8;

pub const DEFAULT_RETRYABLE_LIFETIME_SECONDS: u64 = 60 * 60 * 24 * 7; // 7 days
