// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

//! L1 fee aggregation registry precompile.

use alloy_sol_types::{sol, SolInterface, SolValue};
use retryables_logging::{log, Level::*};
use revm::primitives::{Address, Bytes, U256};
use tezos_smart_rollup_host::runtime::Runtime;

use crate::{
    configuration::Configuration,
    layered_state::{LayeredState, LayeredStorage},
    precompiles::{
        aggregator::Aggregator::AggregatorCalls,
        call::PrecompileCall,
        error::PrecompileError,
        guard::{not_static, only_chain_owner},
    },
    storage::l1_pricing::AggregatorRegistry,
};

sol! {
    contract Aggregator {
        function getFeeCollector(address aggregator) external view returns (address);
        function setFeeCollector(address aggregator, address newFeeCollector) external;
        function getDefaultAggregator() external view returns (address);
        function setDefaultAggregator(address newDefault) external;
        function getPreferredAggregator(address addr) external view returns (address, bool);
        function setPreferredAggregator(address prefAgg) external;
        function getTxBaseFee(address aggregator) external view returns (uint256);
        function setTxBaseFee(address aggregator, uint256 feeInL1Gas) external;
    }
}

pub fn get_fee_collector(
    registry: &impl AggregatorRegistry,
    aggregator: Address,
) -> Result<Address, PrecompileError> {
    Ok(registry.aggregator_fee_collector(&aggregator)?)
}

/// Only the aggregator or its current fee collector may hand the fees to
/// someone else.
pub fn set_fee_collector(
    registry: &mut impl AggregatorRegistry,
    call: &PrecompileCall,
    aggregator: Address,
    new_fee_collector: Address,
) -> Result<(), PrecompileError> {
    let caller = call.caller();
    let current = registry.aggregator_fee_collector(&aggregator)?;
    if caller != aggregator && caller != current {
        return Err(PrecompileError::unauthorized(
            "only an aggregator or its fee collector may change its fee collector",
        ));
    }
    Ok(registry.set_aggregator_fee_collector(&aggregator, &new_fee_collector)?)
}

pub fn get_default_aggregator(
    registry: &impl AggregatorRegistry,
) -> Result<Address, PrecompileError> {
    Ok(registry.default_aggregator()?)
}

pub fn set_default_aggregator(
    registry: &mut impl AggregatorRegistry,
    configuration: &Configuration,
    call: &PrecompileCall,
    new_default: Address,
) -> Result<(), PrecompileError> {
    only_chain_owner(configuration.chain_owner, call.caller())?;
    Ok(registry.set_default_aggregator(&new_default)?)
}

pub fn get_preferred_aggregator(
    registry: &impl AggregatorRegistry,
    address: Address,
) -> Result<(Address, bool), PrecompileError> {
    Ok(registry.preferred_aggregator(&address)?)
}

/// Sets the preferred aggregator of the caller, nobody else's.
pub fn set_preferred_aggregator(
    registry: &mut impl AggregatorRegistry,
    call: &PrecompileCall,
    preferred: Address,
) -> Result<(), PrecompileError> {
    Ok(registry.set_preferred_aggregator(&call.caller(), &preferred)?)
}

pub fn get_tx_base_fee(
    registry: &impl AggregatorRegistry,
    aggregator: Address,
) -> Result<U256, PrecompileError> {
    Ok(registry.fixed_charge_for_aggregator_l1_gas(&aggregator)?)
}

pub fn set_tx_base_fee(
    registry: &mut impl AggregatorRegistry,
    configuration: &Configuration,
    call: &PrecompileCall,
    aggregator: Address,
    fee_in_l1_gas: U256,
) -> Result<(), PrecompileError> {
    only_chain_owner(configuration.chain_owner, call.caller())?;
    Ok(registry.set_fixed_charge_for_aggregator_l1_gas(&aggregator, fee_in_l1_gas)?)
}

pub(crate) fn aggregator_precompile<Host: Runtime>(
    host: &Host,
    layered_state: &mut LayeredState,
    configuration: &Configuration,
    input: &[u8],
    call: &mut PrecompileCall,
    is_static: bool,
) -> Result<Bytes, PrecompileError> {
    let Ok(function_call) = AggregatorCalls::abi_decode(input) else {
        return Err(PrecompileError::revert("invalid input encoding"));
    };
    let mut registry = LayeredStorage::new(host, layered_state);

    match function_call {
        AggregatorCalls::getFeeCollector(args) => {
            let collector = get_fee_collector(&registry, args.aggregator)?;
            Ok(Bytes::from(collector.abi_encode()))
        }
        AggregatorCalls::setFeeCollector(args) => {
            not_static(is_static)?;
            set_fee_collector(
                &mut registry,
                call,
                args.aggregator,
                args.newFeeCollector,
            )?;
            log!(
                host,
                Debug,
                "Fee collector of aggregator {} set to {}",
                args.aggregator,
                args.newFeeCollector
            );
            Ok(Bytes::new())
        }
        AggregatorCalls::getDefaultAggregator(_) => {
            let aggregator = get_default_aggregator(&registry)?;
            Ok(Bytes::from(aggregator.abi_encode()))
        }
        AggregatorCalls::setDefaultAggregator(args) => {
            not_static(is_static)?;
            set_default_aggregator(&mut registry, configuration, call, args.newDefault)?;
            log!(host, Info, "Default aggregator set to {}", args.newDefault);
            Ok(Bytes::new())
        }
        AggregatorCalls::getPreferredAggregator(args) => {
            let preferred = get_preferred_aggregator(&registry, args.addr)?;
            Ok(Bytes::from(preferred.abi_encode()))
        }
        AggregatorCalls::setPreferredAggregator(args) => {
            not_static(is_static)?;
            set_preferred_aggregator(&mut registry, call, args.prefAgg)?;
            Ok(Bytes::new())
        }
        AggregatorCalls::getTxBaseFee(args) => {
            let fee = get_tx_base_fee(&registry, args.aggregator)?;
            Ok(Bytes::from(fee.abi_encode()))
        }
        AggregatorCalls::setTxBaseFee(args) => {
            not_static(is_static)?;
            set_tx_base_fee(
                &mut registry,
                configuration,
                call,
                args.aggregator,
                args.feeInL1Gas,
            )?;
            log!(
                host,
                Info,
                "Base fee of aggregator {} set to {}",
                args.aggregator,
                args.feeInL1Gas
            );
            Ok(Bytes::new())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        precompiles::constants::AGGREGATOR_PRECOMPILE_ADDRESS,
        storage::l1_pricing::{L1PricingState, SEQUENCER_ADDRESS},
    };
    use alloy_sol_types::SolCall;
    use pretty_assertions::assert_eq;
    use revm::primitives::address;
    use tezos_smart_rollup_mock::MockHost;

    const AGGREGATOR: Address = address!("0x00000000000000000000000000000000000000a0");
    const COLLECTOR: Address = address!("0x00000000000000000000000000000000000000c0");
    const STRANGER: Address = address!("0x00000000000000000000000000000000000000d0");
    const NEW_COLLECTOR: Address = address!("0x00000000000000000000000000000000000000e0");
    const OWNER: Address = address!("0x00000000000000000000000000000000000000f0");

    fn call_from(caller: Address) -> PrecompileCall {
        PrecompileCall::new(AGGREGATOR_PRECOMPILE_ADDRESS, caller, 0, 100_000)
    }

    #[test]
    fn fee_collector_is_changed_by_the_current_collector() {
        let mut host = MockHost::default();
        let mut registry = L1PricingState::new(&mut host);
        set_fee_collector(&mut registry, &call_from(AGGREGATOR), AGGREGATOR, COLLECTOR)
            .unwrap();

        assert!(matches!(
            set_fee_collector(
                &mut registry,
                &call_from(STRANGER),
                AGGREGATOR,
                NEW_COLLECTOR
            ),
            Err(PrecompileError::Unauthorized(_))
        ));
        assert_eq!(get_fee_collector(&registry, AGGREGATOR), Ok(COLLECTOR));

        set_fee_collector(&mut registry, &call_from(COLLECTOR), AGGREGATOR, NEW_COLLECTOR)
            .unwrap();
        assert_eq!(get_fee_collector(&registry, AGGREGATOR), Ok(NEW_COLLECTOR));

        // The previous collector lost its right, the aggregator kept it.
        assert!(set_fee_collector(
            &mut registry,
            &call_from(COLLECTOR),
            AGGREGATOR,
            COLLECTOR
        )
        .is_err());
        set_fee_collector(&mut registry, &call_from(AGGREGATOR), AGGREGATOR, AGGREGATOR)
            .unwrap();
    }

    #[test]
    fn privileged_writes_need_the_chain_owner() {
        let mut host = MockHost::default();
        let mut registry = L1PricingState::new(&mut host);
        let unowned = Configuration::default();
        let owned = Configuration {
            chain_owner: Some(OWNER),
            ..Configuration::default()
        };

        assert!(matches!(
            set_default_aggregator(&mut registry, &unowned, &call_from(OWNER), AGGREGATOR),
            Err(PrecompileError::Unauthorized(_))
        ));
        assert!(matches!(
            set_default_aggregator(&mut registry, &owned, &call_from(STRANGER), AGGREGATOR),
            Err(PrecompileError::Unauthorized(_))
        ));
        assert_eq!(get_default_aggregator(&registry), Ok(SEQUENCER_ADDRESS));

        set_default_aggregator(&mut registry, &owned, &call_from(OWNER), AGGREGATOR)
            .unwrap();
        assert_eq!(get_default_aggregator(&registry), Ok(AGGREGATOR));

        let fee = U256::from(4_000);
        assert!(set_tx_base_fee(
            &mut registry,
            &owned,
            &call_from(AGGREGATOR),
            AGGREGATOR,
            fee
        )
        .is_err());
        set_tx_base_fee(&mut registry, &owned, &call_from(OWNER), AGGREGATOR, fee)
            .unwrap();
        assert_eq!(get_tx_base_fee(&registry, AGGREGATOR), Ok(fee));
    }

    #[test]
    fn preferred_aggregator_is_scoped_to_the_caller() {
        let mut host = MockHost::default();
        let mut registry = L1PricingState::new(&mut host);

        set_preferred_aggregator(&mut registry, &call_from(STRANGER), AGGREGATOR)
            .unwrap();
        assert_eq!(
            get_preferred_aggregator(&registry, STRANGER),
            Ok((AGGREGATOR, true))
        );
        assert_eq!(
            get_preferred_aggregator(&registry, OWNER),
            Ok((Address::ZERO, false))
        );
    }

    #[test]
    fn dispatch_encodes_outputs() {
        let mut host = MockHost::default();
        let mut layered_state = LayeredState::new();
        let configuration = Configuration::default();
        let mut call = call_from(STRANGER);

        let input = Aggregator::setPreferredAggregatorCall {
            prefAgg: AGGREGATOR,
        }
        .abi_encode();
        aggregator_precompile(
            &host,
            &mut layered_state,
            &configuration,
            &input,
            &mut call,
            false,
        )
        .unwrap();

        let input = Aggregator::getPreferredAggregatorCall { addr: STRANGER }.abi_encode();
        let output = aggregator_precompile(
            &host,
            &mut layered_state,
            &configuration,
            &input,
            &mut call,
            true,
        )
        .unwrap();
        assert_eq!(
            <(Address, bool)>::abi_decode(&output).unwrap(),
            (AGGREGATOR, true)
        );

        let input = Aggregator::getFeeCollectorCall {
            aggregator: AGGREGATOR,
        }
        .abi_encode();
        let output = aggregator_precompile(
            &host,
            &mut layered_state,
            &configuration,
            &input,
            &mut call,
            true,
        )
        .unwrap();
        assert_eq!(Address::abi_decode(&output).unwrap(), AGGREGATOR);

        let input = Aggregator::setPreferredAggregatorCall {
            prefAgg: COLLECTOR,
        }
        .abi_encode();
        assert!(matches!(
            aggregator_precompile(
                &host,
                &mut layered_state,
                &configuration,
                &input,
                &mut call,
                true
            ),
            Err(PrecompileError::Revert(_))
        ));

        // Nothing reaches the durable storage before the changes are committed.
        assert_eq!(
            L1PricingState::new(&mut host)
                .preferred_aggregator(&STRANGER)
                .unwrap(),
            (Address::ZERO, false)
        );
        layered_state.take_changes().commit(&mut host).unwrap();
        assert_eq!(
            L1PricingState::new(&mut host)
                .preferred_aggregator(&STRANGER)
                .unwrap(),
            (AGGREGATOR, true)
        );
    }
}
