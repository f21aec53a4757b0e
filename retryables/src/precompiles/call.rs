// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

use alloy_sol_types::SolEvent;
use revm::{
    interpreter::Gas,
    primitives::{Address, Log},
};

use crate::{escrow::ScheduledRedeem, precompiles::error::PrecompileError};

/// State of one call to a retryable precompile.
///
/// Logs and scheduled redeems are only buffered here. They reach the EVM
/// journal and the execution environment when the operation succeeds,
/// and are dropped with the call otherwise.
#[derive(Debug)]
pub struct PrecompileCall {
    address: Address,
    caller: Address,
    timestamp: u64,
    gas: Gas,
    logs: Vec<Log>,
    scheduled_redeems: Vec<ScheduledRedeem>,
}

impl PrecompileCall {
    pub fn new(address: Address, caller: Address, timestamp: u64, gas_limit: u64) -> Self {
        Self {
            address,
            caller,
            timestamp,
            gas: Gas::new(gas_limit),
            logs: vec![],
            scheduled_redeems: vec![],
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn gas_left(&self) -> u64 {
        self.gas.remaining()
    }

    pub fn gas(&self) -> Gas {
        self.gas
    }

    /// Charges `cost`, leaving the gas untouched when there is not enough.
    pub fn burn(&mut self, cost: u64) -> Result<(), PrecompileError> {
        if self.gas.record_cost(cost) {
            Ok(())
        } else {
            Err(PrecompileError::OutOfGas)
        }
    }

    pub fn burn_all(&mut self) {
        self.gas.spend_all();
    }

    pub fn emit<E: SolEvent>(&mut self, event: &E) {
        self.logs.push(Log {
            address: self.address,
            data: event.encode_log_data(),
        })
    }

    pub fn schedule_redeem(&mut self, scheduled: ScheduledRedeem) {
        self.scheduled_redeems.push(scheduled)
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn scheduled_redeems(&self) -> &[ScheduledRedeem] {
        &self.scheduled_redeems
    }

    pub fn into_parts(self) -> (Gas, Vec<Log>, Vec<ScheduledRedeem>) {
        (self.gas, self.logs, self.scheduled_redeems)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use revm::primitives::address;

    const CALLER: Address = address!("0x00000000000000000000000000000000000000ca");

    #[test]
    fn failed_burn_leaves_gas_untouched() {
        let mut call = PrecompileCall::new(Address::ZERO, CALLER, 0, 1_000);
        call.burn(400).unwrap();
        assert_eq!(call.gas_left(), 600);

        assert_eq!(call.burn(601), Err(PrecompileError::OutOfGas));
        assert_eq!(call.gas_left(), 600);

        call.burn_all();
        assert_eq!(call.gas_left(), 0);
        assert_eq!(call.gas().spent(), 1_000);
    }
}
