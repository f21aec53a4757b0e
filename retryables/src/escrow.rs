// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

//! Gas forwarding from a redeem call to the retry it schedules.
//!
//! Redeem burns all the gas left to its caller and records how much in a
//! [`ScheduledRedeem`]. Before running the retry, the execution
//! environment credits exactly that amount back to the gas pool of the
//! retry, and the wei paid for it to whoever funds the retry.

use revm::{
    interpreter::Gas,
    primitives::{Address, B256, U256},
};

/// Anything the forwarded gas can be credited back to.
pub trait GasPool {
    fn add_gas(&mut self, amount: u64);
}

impl GasPool for Gas {
    fn add_gas(&mut self, amount: u64) {
        self.erase_cost(amount)
    }
}

/// Gas escrowed by a redeem call for a later retry of the ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRedeem {
    pub ticket_id: B256,
    pub redeem_tx_id: B256,
    pub sequence_num: u64,
    pub donated_gas: u64,
    pub donor: Address,
}

impl ScheduledRedeem {
    /// Credits the escrowed gas to `pool`. Must be called once per
    /// scheduled redeem, right before the retry executes.
    pub fn recredit(&self, pool: &mut impl GasPool) {
        pool.add_gas(self.donated_gas)
    }

    /// Wei paid by the donor for the escrowed gas at `gas_price`.
    pub fn donor_refund(&self, gas_price: U256) -> U256 {
        U256::from(self.donated_gas).saturating_mul(gas_price)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use revm::primitives::address;

    fn scheduled(donated_gas: u64) -> ScheduledRedeem {
        ScheduledRedeem {
            ticket_id: B256::repeat_byte(1),
            redeem_tx_id: B256::repeat_byte(2),
            sequence_num: 1,
            donated_gas,
            donor: address!("0x0000000000000000000000000000000000000abc"),
        }
    }

    #[test]
    fn recredit_adds_exactly_the_donated_gas() {
        let mut gas = Gas::new(1_000_000);
        assert!(gas.record_cost(1_000_000));
        assert_eq!(gas.remaining(), 0);

        scheduled(73_000).recredit(&mut gas);
        assert_eq!(gas.remaining(), 73_000);
    }

    #[test]
    fn donor_refund_is_priced_in_wei() {
        assert_eq!(
            scheduled(21_000).donor_refund(U256::from(1_000_000_000u64)),
            U256::from(21_000_000_000_000u64)
        );
        assert_eq!(scheduled(2).donor_refund(U256::MAX), U256::MAX);
    }
}
