// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::Error as StoreError;

/// Ways an operation of the retryable precompiles can fail.
///
/// Every variant but [`PrecompileError::Abort`] reverts the call, the
/// enclosing frame dropping whatever the operation changed. `Abort` means
/// the durable storage itself failed and the whole transaction must stop.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PrecompileError {
    #[error("ticketId not found")]
    NotFound,
    #[error("{0}")]
    Unauthorized(String),
    #[error("out of gas")]
    OutOfGas,
    #[error("{0}")]
    Revert(String),
    #[error(transparent)]
    Abort(StoreError),
}

impl From<StoreError> for PrecompileError {
    fn from(error: StoreError) -> Self {
        PrecompileError::Abort(error)
    }
}

impl PrecompileError {
    pub(crate) fn unauthorized(reason: &str) -> Self {
        PrecompileError::Unauthorized(reason.to_string())
    }

    pub(crate) fn revert(reason: &str) -> Self {
        PrecompileError::Revert(reason.to_string())
    }
}
