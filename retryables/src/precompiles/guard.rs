// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

use revm::{
    interpreter::{Gas, InputsImpl, InstructionResult, InterpreterResult},
    primitives::{Address, Bytes},
};
use std::fmt::Display;

use crate::precompiles::error::PrecompileError;

/// Rejects calls executed in another account's context.
pub(crate) fn guard(current: Address, inputs: &InputsImpl) -> Result<(), PrecompileError> {
    if inputs.target_address != current {
        return Err(PrecompileError::revert(
            "DELEGATECALLs and CALLCODEs are not allowed",
        ));
    }
    Ok(())
}

pub(crate) fn not_static(is_static: bool) -> Result<(), PrecompileError> {
    if is_static {
        return Err(PrecompileError::revert(
            "state changes are not allowed in a STATICCALL",
        ));
    }
    Ok(())
}

pub(crate) fn only_chain_owner(
    chain_owner: Option<Address>,
    caller: Address,
) -> Result<(), PrecompileError> {
    match chain_owner {
        Some(owner) if owner == caller => Ok(()),
        _ => Err(PrecompileError::unauthorized(
            "only the chain owner may call this method",
        )),
    }
}

pub(crate) fn revert<R>(reason: R, gas: Gas) -> InterpreterResult
where
    R: Display,
{
    InterpreterResult {
        result: InstructionResult::Revert,
        gas,
        output: Bytes::copy_from_slice(reason.to_string().as_bytes()),
    }
}

pub(crate) fn out_of_gas(gas: u64) -> InterpreterResult {
    InterpreterResult {
        result: InstructionResult::OutOfGas,
        gas: Gas::new_spent(gas),
        output: Bytes::new(),
    }
}
