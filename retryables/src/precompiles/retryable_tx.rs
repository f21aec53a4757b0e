// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

//! Retryable tickets management precompile.
//!
//! A ticket can be kept alive by anyone, redeemed by anyone and only
//! canceled by its beneficiary. Redeeming a ticket does not execute it:
//! it schedules a retry funded by all the gas left to the caller.

use alloy_sol_types::{sol, SolEvent, SolInterface, SolValue};
use retryables_logging::{log, Level::*};
use revm::primitives::{Address, Bytes, Log, B256, U256};
use tezos_smart_rollup_host::runtime::Runtime;

use crate::{
    configuration::Configuration,
    escrow::ScheduledRedeem,
    layered_state::{LayeredState, LayeredStorage},
    precompiles::{
        call::PrecompileCall,
        constants::RETRYABLE_TX_PRECOMPILE_ADDRESS,
        error::PrecompileError,
        gas::{
            event_cost, get_beneficiary_cost, keepalive_fixed_cost,
            keepalive_update_cost, redeem_copy_cost, redeem_fixed_cost,
        },
        guard::not_static,
        retryable_tx::RetryableTx::{
            Canceled, LifetimeExtended, RedeemScheduled, Redeemed, RetryableTxCalls,
            TicketCreated,
        },
    },
    storage::retryables::{tx_id_for_redeem_attempt, RetryableStore},
};

sol! {
    contract RetryableTx {
        function cancel(bytes32 ticketId) external;
        function getBeneficiary(bytes32 ticketId) external view returns (address);
        function getLifetime() external view returns (uint256);
        function getTimeout(bytes32 ticketId) external view returns (uint256);
        function keepalive(bytes32 ticketId) external returns (uint256);
        function redeem(bytes32 ticketId) external returns (bytes32);

        event TicketCreated(bytes32 indexed ticketId);
        event LifetimeExtended(bytes32 indexed ticketId, uint256 newTimeout);
        event RedeemScheduled(
            bytes32 indexed ticketId,
            bytes32 indexed retryTxHash,
            uint64 indexed sequenceNum,
            uint64 donatedGas,
            address gasDonor
        );
        event Redeemed(bytes32 indexed userTxHash);
        event Canceled(bytes32 indexed ticketId);
    }
}

/// Log announcing a new ticket, emitted by whoever stores it.
pub fn ticket_created_log(ticket_id: B256) -> Log {
    Log {
        address: RETRYABLE_TX_PRECOMPILE_ADDRESS,
        data: TicketCreated { ticketId: ticket_id }.encode_log_data(),
    }
}

/// Log emitted once a scheduled retry has been executed.
pub fn redeemed_log(user_tx_hash: B256) -> Log {
    Log {
        address: RETRYABLE_TX_PRECOMPILE_ADDRESS,
        data: Redeemed {
            userTxHash: user_tx_hash,
        }
        .encode_log_data(),
    }
}

/// Deletes the ticket, without refunding its rent to anyone.
pub fn cancel(
    store: &mut impl RetryableStore,
    call: &mut PrecompileCall,
    ticket_id: B256,
) -> Result<(), PrecompileError> {
    let retryable = store
        .open_retryable(&ticket_id, call.timestamp())?
        .ok_or(PrecompileError::NotFound)?;
    if retryable.beneficiary() != call.caller() {
        return Err(PrecompileError::unauthorized(
            "only the beneficiary may cancel a retryable",
        ));
    }
    store.delete_retryable(&ticket_id)?;
    call.emit(&Canceled { ticketId: ticket_id });
    Ok(())
}

pub fn get_beneficiary(
    store: &impl RetryableStore,
    call: &mut PrecompileCall,
    ticket_id: B256,
) -> Result<Address, PrecompileError> {
    call.burn(get_beneficiary_cost())?;
    let retryable = store
        .open_retryable(&ticket_id, call.timestamp())?
        .ok_or(PrecompileError::NotFound)?;
    Ok(retryable.beneficiary())
}

pub fn get_lifetime(configuration: &Configuration) -> U256 {
    U256::from(configuration.retryable_lifetime_seconds)
}

pub fn get_timeout(
    store: &impl RetryableStore,
    call: &PrecompileCall,
    ticket_id: B256,
) -> Result<u64, PrecompileError> {
    let retryable = store
        .open_retryable(&ticket_id, call.timestamp())?
        .ok_or(PrecompileError::NotFound)?;
    Ok(retryable.timeout())
}

/// Resets the ticket timeout to `lifetime` seconds from now, whatever it
/// was before, and returns it.
pub fn keepalive(
    store: &mut impl RetryableStore,
    call: &mut PrecompileCall,
    ticket_id: B256,
    lifetime: u64,
) -> Result<u64, PrecompileError> {
    let event = LifetimeExtended {
        ticketId: ticket_id,
        newTimeout: U256::ZERO,
    };
    call.burn(keepalive_fixed_cost(event_cost(&event)))?;

    let now = call.timestamp();
    let size = store.retryable_size_bytes(&ticket_id, now)?;
    if size == 0 {
        return Err(PrecompileError::NotFound);
    }
    call.burn(keepalive_update_cost(size))?;

    let new_timeout = now
        .checked_add(lifetime)
        .ok_or_else(|| PrecompileError::revert("retryable timeout overflow"))?;
    store.keepalive(&ticket_id, now, new_timeout)?;

    // The stored timeout is authoritative.
    let timeout = store
        .open_retryable(&ticket_id, now)?
        .ok_or(PrecompileError::NotFound)?
        .timeout();
    call.emit(&LifetimeExtended {
        ticketId: ticket_id,
        newTimeout: U256::from(timeout),
    });
    Ok(timeout)
}

/// Schedules a retry of the ticket funded by all the gas left to the
/// caller, and returns the id of that retry.
pub fn redeem(
    store: &mut impl RetryableStore,
    call: &mut PrecompileCall,
    ticket_id: B256,
) -> Result<B256, PrecompileError> {
    let event = RedeemScheduled {
        ticketId: ticket_id,
        retryTxHash: ticket_id,
        sequenceNum: 0,
        donatedGas: 0,
        gasDonor: call.caller(),
    };
    call.burn(redeem_fixed_cost(event_cost(&event)))?;

    let now = call.timestamp();
    let size = store.retryable_size_bytes(&ticket_id, now)?;
    call.burn(redeem_copy_cost(size))?;

    let retryable = store
        .open_retryable(&ticket_id, now)?
        .ok_or(PrecompileError::NotFound)?;
    let sequence_num = store.increment_num_tries(&retryable)?;
    let redeem_tx_id = tx_id_for_redeem_attempt(&ticket_id, sequence_num);

    let donated_gas = call.gas_left();
    call.emit(&RedeemScheduled {
        ticketId: ticket_id,
        retryTxHash: redeem_tx_id,
        sequenceNum: sequence_num,
        donatedGas: donated_gas,
        gasDonor: call.caller(),
    });
    call.schedule_redeem(ScheduledRedeem {
        ticket_id,
        redeem_tx_id,
        sequence_num,
        donated_gas,
        donor: call.caller(),
    });
    call.burn_all();
    Ok(redeem_tx_id)
}

pub(crate) fn retryable_tx_precompile<Host: Runtime>(
    host: &Host,
    layered_state: &mut LayeredState,
    configuration: &Configuration,
    input: &[u8],
    call: &mut PrecompileCall,
    is_static: bool,
) -> Result<Bytes, PrecompileError> {
    let Ok(function_call) = RetryableTxCalls::abi_decode(input) else {
        return Err(PrecompileError::revert("invalid input encoding"));
    };
    let mut storage = LayeredStorage::new(host, layered_state);

    match function_call {
        RetryableTxCalls::cancel(args) => {
            not_static(is_static)?;
            cancel(&mut storage, call, args.ticketId)?;
            log!(host, Debug, "Retryable {} canceled", args.ticketId);
            Ok(Bytes::new())
        }
        RetryableTxCalls::getBeneficiary(args) => {
            let beneficiary = get_beneficiary(&storage, call, args.ticketId)?;
            Ok(Bytes::from(beneficiary.abi_encode()))
        }
        RetryableTxCalls::getLifetime(_) => {
            Ok(Bytes::from(get_lifetime(configuration).abi_encode()))
        }
        RetryableTxCalls::getTimeout(args) => {
            let timeout = get_timeout(&storage, call, args.ticketId)?;
            Ok(Bytes::from(U256::from(timeout).abi_encode()))
        }
        RetryableTxCalls::keepalive(args) => {
            not_static(is_static)?;
            let timeout = keepalive(
                &mut storage,
                call,
                args.ticketId,
                configuration.retryable_lifetime_seconds,
            )?;
            log!(
                host,
                Debug,
                "Retryable {} kept alive until {}",
                args.ticketId,
                timeout
            );
            Ok(Bytes::from(U256::from(timeout).abi_encode()))
        }
        RetryableTxCalls::redeem(args) => {
            not_static(is_static)?;
            let redeem_tx_id = redeem(&mut storage, call, args.ticketId)?;
            Ok(Bytes::from(redeem_tx_id.abi_encode()))
        }
    }
}
