// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

//! Gas charged by the ticket lifecycle operations.
//!
//! Fixed costs are burnt before the ticket is looked at. Size dependent
//! costs are burnt in a second step, once the stored size of the ticket
//! is known.

use alloy_sol_types::SolEvent;

use crate::precompiles::constants::{
    LOG_DATA_GAS, LOG_GAS, LOG_TOPIC_GAS, SLOAD_GAS, SSTORE_SET_GAS,
};

/// Number of 32 bytes words needed to hold `size` bytes.
pub fn words_for_bytes(size: u64) -> u64 {
    size.div_ceil(32)
}

/// Cost of emitting `event`, signature topic included.
pub fn event_cost<E: SolEvent>(event: &E) -> u64 {
    let log = event.encode_log_data();
    let topics = log.topics().len() as u64;
    let data = log.data.len() as u64;
    LOG_GAS
        .saturating_add(LOG_TOPIC_GAS.saturating_mul(topics))
        .saturating_add(LOG_DATA_GAS.saturating_mul(data))
}

pub fn get_beneficiary_cost() -> u64 {
    2 * SLOAD_GAS
}

/// Reading the ticket, writing its new timeout and the
/// `LifetimeExtended` event.
pub fn keepalive_fixed_cost(event_cost: u64) -> u64 {
    (6 * SLOAD_GAS + 2 * SSTORE_SET_GAS).saturating_add(event_cost)
}

pub fn keepalive_update_cost(size_bytes: u64) -> u64 {
    words_for_bytes(size_bytes).saturating_mul(SSTORE_SET_GAS) / 100
}

/// Reading the ticket, bumping its number of tries and the
/// `RedeemScheduled` event.
pub fn redeem_fixed_cost(event_cost: u64) -> u64 {
    (5 * SLOAD_GAS + SSTORE_SET_GAS).saturating_add(event_cost)
}

pub fn redeem_copy_cost(size_bytes: u64) -> u64 {
    words_for_bytes(size_bytes).saturating_mul(SLOAD_GAS)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::precompiles::retryable_tx::RetryableTx::{
        Canceled, LifetimeExtended, RedeemScheduled,
    };
    use revm::primitives::{Address, B256, U256};

    #[test]
    fn words_round_up() {
        assert_eq!(words_for_bytes(0), 0);
        assert_eq!(words_for_bytes(1), 1);
        assert_eq!(words_for_bytes(32), 1);
        assert_eq!(words_for_bytes(33), 2);
        assert_eq!(words_for_bytes(352), 11);
    }

    #[test]
    fn event_cost_counts_topics_and_data() {
        let canceled = Canceled {
            ticketId: B256::ZERO,
        };
        // Signature and ticket id topics, no data.
        assert_eq!(event_cost(&canceled), 375 + 2 * 375);

        let extended = LifetimeExtended {
            ticketId: B256::ZERO,
            newTimeout: U256::ZERO,
        };
        assert_eq!(event_cost(&extended), 375 + 2 * 375 + 8 * 32);

        let scheduled = RedeemScheduled {
            ticketId: B256::ZERO,
            retryTxHash: B256::ZERO,
            sequenceNum: 0,
            donatedGas: 0,
            gasDonor: Address::ZERO,
        };
        assert_eq!(event_cost(&scheduled), 375 + 4 * 375 + 8 * 64);
    }

    #[test]
    fn operation_costs() {
        assert_eq!(get_beneficiary_cost(), 100);
        assert_eq!(keepalive_fixed_cost(1_381), 300 + 40_000 + 1_381);
        // 352 bytes are 11 words.
        assert_eq!(keepalive_update_cost(352), 2_200);
        assert_eq!(redeem_fixed_cost(2_387), 250 + 20_000 + 2_387);
        assert_eq!(redeem_copy_cost(352), 550);
    }
}
