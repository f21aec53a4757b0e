// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

//! L1 fee aggregation registry: which aggregator a sender prefers, where
//! each aggregator's fees go and the fixed L1 gas charge of each
//! aggregator.

use revm::primitives::{address, Address, U256};
use tezos_smart_rollup_host::{
    path::{OwnedPath, RefPath},
    runtime::Runtime,
};

use crate::{
    storage_helpers::{
        address_path, concat, read_address_opt, read_u256_le_default, write_address,
        write_u256_le,
    },
    Error,
};

pub const L1_PRICING_PATH: RefPath = RefPath::assert_from(b"/evm/world_state/l1_pricing");

const DEFAULT_AGGREGATOR_PATH: RefPath = RefPath::assert_from(b"/default_aggregator");
const AGGREGATORS_PATH: RefPath = RefPath::assert_from(b"/aggregators");
const PREFERRED_PATH: RefPath = RefPath::assert_from(b"/preferred");
const FEE_COLLECTOR_PATH: RefPath = RefPath::assert_from(b"/fee_collector");
const FIXED_CHARGE_PATH: RefPath = RefPath::assert_from(b"/fixed_charge");

/// Aggregator used when nothing else has been configured.
pub const SEQUENCER_ADDRESS: Address =
    address!("0xa4b000000000000000000073657175656e636572");

/// Keyed accessors over the fee aggregation registry.
pub trait AggregatorRegistry {
    /// Fee collector of `aggregator`; the aggregator itself when unset.
    fn aggregator_fee_collector(&self, aggregator: &Address) -> Result<Address, Error>;

    fn set_aggregator_fee_collector(
        &mut self,
        aggregator: &Address,
        collector: &Address,
    ) -> Result<(), Error>;

    fn default_aggregator(&self) -> Result<Address, Error>;

    fn set_default_aggregator(&mut self, aggregator: &Address) -> Result<(), Error>;

    /// Preferred aggregator of `sender`, and whether a non zero one was
    /// set.
    fn preferred_aggregator(&self, sender: &Address) -> Result<(Address, bool), Error>;

    fn set_preferred_aggregator(
        &mut self,
        sender: &Address,
        aggregator: &Address,
    ) -> Result<(), Error>;

    fn fixed_charge_for_aggregator_l1_gas(&self, aggregator: &Address)
        -> Result<U256, Error>;

    fn set_fixed_charge_for_aggregator_l1_gas(
        &mut self,
        aggregator: &Address,
        fee: U256,
    ) -> Result<(), Error>;
}

pub struct L1PricingState<'a, Host: Runtime> {
    host: &'a mut Host,
}

impl<'a, Host: Runtime> L1PricingState<'a, Host> {
    pub fn new(host: &'a mut Host) -> Self {
        Self { host }
    }
}

fn aggregator_field_path(
    aggregator: &Address,
    field: &RefPath,
) -> Result<OwnedPath, Error> {
    let aggregators = concat(&L1_PRICING_PATH, &AGGREGATORS_PATH)?;
    let aggregator = concat(&aggregators, &address_path(aggregator)?)?;
    concat(&aggregator, field)
}

fn preferred_path(sender: &Address) -> Result<OwnedPath, Error> {
    let preferred = concat(&L1_PRICING_PATH, &PREFERRED_PATH)?;
    concat(&preferred, &address_path(sender)?)
}

pub(crate) fn read_fee_collector(
    host: &impl Runtime,
    aggregator: &Address,
) -> Result<Option<Address>, Error> {
    read_address_opt(host, &aggregator_field_path(aggregator, &FEE_COLLECTOR_PATH)?)
}

pub(crate) fn read_default_aggregator(
    host: &impl Runtime,
) -> Result<Option<Address>, Error> {
    read_address_opt(host, &concat(&L1_PRICING_PATH, &DEFAULT_AGGREGATOR_PATH)?)
}

pub(crate) fn read_preferred_aggregator(
    host: &impl Runtime,
    sender: &Address,
) -> Result<Option<Address>, Error> {
    read_address_opt(host, &preferred_path(sender)?)
}

pub(crate) fn read_fixed_charge(
    host: &impl Runtime,
    aggregator: &Address,
) -> Result<U256, Error> {
    let path = aggregator_field_path(aggregator, &FIXED_CHARGE_PATH)?;
    read_u256_le_default(host, &path, U256::ZERO)
}

/// A zero preferred aggregator is the same as none.
pub(crate) fn preferred_or_unset(preferred: Option<Address>) -> (Address, bool) {
    match preferred {
        Some(aggregator) if !aggregator.is_zero() => (aggregator, true),
        _ => (Address::ZERO, false),
    }
}

impl<Host: Runtime> AggregatorRegistry for L1PricingState<'_, Host> {
    fn aggregator_fee_collector(&self, aggregator: &Address) -> Result<Address, Error> {
        Ok(read_fee_collector(self.host, aggregator)?.unwrap_or(*aggregator))
    }

    fn set_aggregator_fee_collector(
        &mut self,
        aggregator: &Address,
        collector: &Address,
    ) -> Result<(), Error> {
        let path = aggregator_field_path(aggregator, &FEE_COLLECTOR_PATH)?;
        write_address(self.host, &path, collector)
    }

    fn default_aggregator(&self) -> Result<Address, Error> {
        Ok(read_default_aggregator(self.host)?.unwrap_or(SEQUENCER_ADDRESS))
    }

    fn set_default_aggregator(&mut self, aggregator: &Address) -> Result<(), Error> {
        let path = concat(&L1_PRICING_PATH, &DEFAULT_AGGREGATOR_PATH)?;
        write_address(self.host, &path, aggregator)
    }

    fn preferred_aggregator(&self, sender: &Address) -> Result<(Address, bool), Error> {
        let preferred = read_preferred_aggregator(self.host, sender)?;
        Ok(preferred_or_unset(preferred))
    }

    fn set_preferred_aggregator(
        &mut self,
        sender: &Address,
        aggregator: &Address,
    ) -> Result<(), Error> {
        write_address(self.host, &preferred_path(sender)?, aggregator)
    }

    fn fixed_charge_for_aggregator_l1_gas(
        &self,
        aggregator: &Address,
    ) -> Result<U256, Error> {
        read_fixed_charge(self.host, aggregator)
    }

    fn set_fixed_charge_for_aggregator_l1_gas(
        &mut self,
        aggregator: &Address,
        fee: U256,
    ) -> Result<(), Error> {
        let path = aggregator_field_path(aggregator, &FIXED_CHARGE_PATH)?;
        write_u256_le(self.host, &path, fee)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tezos_smart_rollup_mock::MockHost;

    const AGGREGATOR: Address = address!("0x00000000000000000000000000000000000000a1");
    const COLLECTOR: Address = address!("0x00000000000000000000000000000000000000c1");
    const SENDER: Address = address!("0x00000000000000000000000000000000000000e1");

    #[test]
    fn defaults_when_nothing_is_configured() {
        let mut host = MockHost::default();
        let state = L1PricingState::new(&mut host);

        assert_eq!(state.aggregator_fee_collector(&AGGREGATOR).unwrap(), AGGREGATOR);
        assert_eq!(state.default_aggregator().unwrap(), SEQUENCER_ADDRESS);
        assert_eq!(
            state.preferred_aggregator(&SENDER).unwrap(),
            (Address::ZERO, false)
        );
        assert_eq!(
            state.fixed_charge_for_aggregator_l1_gas(&AGGREGATOR).unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn writes_are_read_back() {
        let mut host = MockHost::default();
        let mut state = L1PricingState::new(&mut host);

        state
            .set_aggregator_fee_collector(&AGGREGATOR, &COLLECTOR)
            .unwrap();
        state.set_default_aggregator(&AGGREGATOR).unwrap();
        state.set_preferred_aggregator(&SENDER, &AGGREGATOR).unwrap();
        state
            .set_fixed_charge_for_aggregator_l1_gas(&AGGREGATOR, U256::from(1_234))
            .unwrap();

        assert_eq!(state.aggregator_fee_collector(&AGGREGATOR).unwrap(), COLLECTOR);
        assert_eq!(state.default_aggregator().unwrap(), AGGREGATOR);
        assert_eq!(
            state.preferred_aggregator(&SENDER).unwrap(),
            (AGGREGATOR, true)
        );
        assert_eq!(
            state.fixed_charge_for_aggregator_l1_gas(&AGGREGATOR).unwrap(),
            U256::from(1_234)
        );
    }

    #[test]
    fn zero_preferred_aggregator_is_unset() {
        let mut host = MockHost::default();
        let mut state = L1PricingState::new(&mut host);

        state.set_preferred_aggregator(&SENDER, &AGGREGATOR).unwrap();
        state
            .set_preferred_aggregator(&SENDER, &Address::ZERO)
            .unwrap();
        assert_eq!(
            state.preferred_aggregator(&SENDER).unwrap(),
            (Address::ZERO, false)
        );
    }
}
