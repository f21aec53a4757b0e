// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

//! Retryable tickets: messages submitted from L1 that can be redeemed on
//! the rollup until they expire, exposed through two precompiled
//! contracts (retryable tx management and L1 fee aggregation).

use tezos_smart_rollup_host::{path::PathError, runtime::RuntimeError};
use thiserror::Error;

pub mod configuration;
pub mod escrow;
pub mod journal;
pub mod layered_state;
pub mod precompiles;
pub mod storage;
pub mod storage_helpers;

pub use configuration::Configuration;
pub use escrow::{GasPool, ScheduledRedeem};
pub use journal::{Journal, PrecompileStateChanges};
pub use layered_state::{LayeredState, LayeredStorage};
pub use precompiles::{error::PrecompileError, provider::RetryablePrecompiles};
pub use storage::l1_pricing::{AggregatorRegistry, L1PricingState};
pub use storage::retryables::{
    tx_id_for_redeem_attempt, Retryable, RetryableState, RetryableStore,
};

/// Failures of the durable storage backing the precompiles.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("Invalid durable storage path: {0:?}")]
    Path(PathError),
    #[error("{0}")]
    Custom(String),
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Self::Path(e)
    }
}

pub fn custom<E: ToString>(e: E) -> Error {
    Error::Custom(e.to_string())
}
