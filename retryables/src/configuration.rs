// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

use revm::primitives::Address;
use tezos_smart_rollup_host::{path::RefPath, runtime::Runtime};

use crate::{
    precompiles::constants::DEFAULT_RETRYABLE_LIFETIME_SECONDS,
    storage_helpers::{read_address_opt, read_u64_le_default},
    Error,
};

pub const RETRYABLE_LIFETIME_PATH: RefPath =
    RefPath::assert_from(b"/evm/world_state/retryables/lifetime_seconds");

pub const CHAIN_OWNER_PATH: RefPath = RefPath::assert_from(b"/evm/world_state/chain_owner");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Window added to the current time when a ticket is renewed.
    pub retryable_lifetime_seconds: u64,
    /// Only account allowed to change the default aggregator and the
    /// aggregators base fees. Nobody can when unset.
    pub chain_owner: Option<Address>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            retryable_lifetime_seconds: DEFAULT_RETRYABLE_LIFETIME_SECONDS,
            chain_owner: None,
        }
    }
}

impl Configuration {
    pub fn read(host: &impl Runtime) -> Result<Self, Error> {
        let retryable_lifetime_seconds = read_u64_le_default(
            host,
            &RETRYABLE_LIFETIME_PATH,
            DEFAULT_RETRYABLE_LIFETIME_SECONDS,
        )?;
        let chain_owner = read_address_opt(host, &CHAIN_OWNER_PATH)?;
        Ok(Self {
            retryable_lifetime_seconds,
            chain_owner,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage_helpers::{write_address, write_u64_le};
    use revm::primitives::address;
    use tezos_smart_rollup_mock::MockHost;

    #[test]
    fn defaults_to_a_week_without_owner() {
        let host = MockHost::default();
        let configuration = Configuration::read(&host).unwrap();
        assert_eq!(configuration, Configuration::default());
        assert_eq!(configuration.retryable_lifetime_seconds, 604_800);
        assert_eq!(configuration.chain_owner, None);
    }

    #[test]
    fn reads_configured_values() {
        let mut host = MockHost::default();
        let owner = address!("0x0000000000000000000000000000000000000042");
        write_u64_le(&mut host, &RETRYABLE_LIFETIME_PATH, 600).unwrap();
        write_address(&mut host, &CHAIN_OWNER_PATH, &owner).unwrap();

        let configuration = Configuration::read(&host).unwrap();
        assert_eq!(configuration.retryable_lifetime_seconds, 600);
        assert_eq!(configuration.chain_owner, Some(owner));
    }
}
