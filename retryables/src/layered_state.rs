// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

use std::{hash::Hash, mem};

use revm::primitives::{Address, HashMap, B256, U256};
use tezos_smart_rollup_host::runtime::Runtime;

use crate::{
    custom,
    escrow::ScheduledRedeem,
    journal::PrecompileStateChanges,
    storage::{
        l1_pricing::{
            preferred_or_unset, read_default_aggregator, read_fee_collector,
            read_fixed_charge, read_preferred_aggregator, AggregatorRegistry,
            SEQUENCER_ADDRESS,
        },
        retryables::{
            read_num_tries, read_retryable, retryable_exists, Retryable, RetryableStore,
        },
    },
    Error,
};

/// Changes of the retryable precompiles on top of the durable storage,
/// with enough history to undo them up to any open checkpoint.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct LayeredState {
    changes: PrecompileStateChanges,
    entries: Vec<LayeredEntry>,
    depths: Vec<usize>,
}

/// One change, with the layered value it replaced.
#[derive(Debug, PartialEq, Eq)]
pub enum LayeredEntry {
    Timeout {
        id: B256,
        previous: Option<u64>,
    },
    NumTries {
        id: B256,
        previous: Option<u64>,
    },
    DeleteRetryable {
        id: B256,
    },
    FeeCollector {
        aggregator: Address,
        previous: Option<Address>,
    },
    DefaultAggregator {
        previous: Option<Address>,
    },
    PreferredAggregator {
        sender: Address,
        previous: Option<Address>,
    },
    FixedCharge {
        aggregator: Address,
        previous: Option<U256>,
    },
    ScheduleRedeem,
}

fn restore<K: Eq + Hash, V>(map: &mut HashMap<K, V>, key: K, previous: Option<V>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

impl LayeredState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(&self, id: &B256) -> Option<u64> {
        self.changes.timeouts.get(id).copied()
    }

    pub fn num_tries(&self, id: &B256) -> Option<u64> {
        self.changes.num_tries.get(id).copied()
    }

    pub fn is_retryable_deleted(&self, id: &B256) -> bool {
        self.changes.deleted_retryables.contains(id)
    }

    pub fn fee_collector(&self, aggregator: &Address) -> Option<Address> {
        self.changes.fee_collectors.get(aggregator).copied()
    }

    pub fn default_aggregator(&self) -> Option<Address> {
        self.changes.default_aggregator
    }

    pub fn preferred_aggregator(&self, sender: &Address) -> Option<Address> {
        self.changes.preferred_aggregators.get(sender).copied()
    }

    pub fn fixed_charge(&self, aggregator: &Address) -> Option<U256> {
        self.changes.fixed_charges.get(aggregator).copied()
    }

    pub fn scheduled_redeems(&self) -> &[ScheduledRedeem] {
        &self.changes.scheduled_redeems
    }

    pub fn set_timeout(&mut self, id: B256, timeout: u64) {
        let previous = self.changes.timeouts.insert(id, timeout);
        self.entries.push(LayeredEntry::Timeout { id, previous });
    }

    pub fn set_num_tries(&mut self, id: B256, num_tries: u64) {
        let previous = self.changes.num_tries.insert(id, num_tries);
        self.entries.push(LayeredEntry::NumTries { id, previous });
    }

    pub fn delete_retryable(&mut self, id: B256) {
        if self.changes.deleted_retryables.insert(id) {
            self.entries.push(LayeredEntry::DeleteRetryable { id });
        }
    }

    pub fn set_fee_collector(&mut self, aggregator: Address, collector: Address) {
        let previous = self.changes.fee_collectors.insert(aggregator, collector);
        self.entries.push(LayeredEntry::FeeCollector {
            aggregator,
            previous,
        });
    }

    pub fn set_default_aggregator(&mut self, aggregator: Address) {
        let previous = self.changes.default_aggregator.replace(aggregator);
        self.entries
            .push(LayeredEntry::DefaultAggregator { previous });
    }

    pub fn set_preferred_aggregator(&mut self, sender: Address, aggregator: Address) {
        let previous = self
            .changes
            .preferred_aggregators
            .insert(sender, aggregator);
        self.entries
            .push(LayeredEntry::PreferredAggregator { sender, previous });
    }

    pub fn set_fixed_charge(&mut self, aggregator: Address, fee: U256) {
        let previous = self.changes.fixed_charges.insert(aggregator, fee);
        self.entries.push(LayeredEntry::FixedCharge {
            aggregator,
            previous,
        });
    }

    pub fn schedule_redeem(&mut self, scheduled: ScheduledRedeem) {
        self.changes.scheduled_redeems.push(scheduled);
        self.entries.push(LayeredEntry::ScheduleRedeem);
    }

    pub fn checkpoint(&mut self) {
        self.depths.push(self.entries.len());
    }

    pub fn checkpoint_commit(&mut self) {
        self.depths.pop();
    }

    /// Reverts the changes by reverse-applying all the entries from the
    /// last one to the latest checkpoint.
    pub fn checkpoint_revert(&mut self) {
        let entries = if let Some(depth) = self.depths.pop() {
            self.entries.drain(depth..).collect::<Vec<_>>()
        } else {
            mem::take(&mut self.entries)
        };
        for entry in entries.into_iter().rev() {
            match entry {
                LayeredEntry::Timeout { id, previous } => {
                    restore(&mut self.changes.timeouts, id, previous)
                }
                LayeredEntry::NumTries { id, previous } => {
                    restore(&mut self.changes.num_tries, id, previous)
                }
                LayeredEntry::DeleteRetryable { id } => {
                    self.changes.deleted_retryables.remove(&id);
                }
                LayeredEntry::FeeCollector {
                    aggregator,
                    previous,
                } => restore(&mut self.changes.fee_collectors, aggregator, previous),
                LayeredEntry::DefaultAggregator { previous } => {
                    self.changes.default_aggregator = previous
                }
                LayeredEntry::PreferredAggregator { sender, previous } => {
                    restore(&mut self.changes.preferred_aggregators, sender, previous)
                }
                LayeredEntry::FixedCharge {
                    aggregator,
                    previous,
                } => restore(&mut self.changes.fixed_charges, aggregator, previous),
                LayeredEntry::ScheduleRedeem => {
                    self.changes.scheduled_redeems.pop();
                }
            }
        }
    }

    /// Makes the changes of the current transaction final. They stay
    /// visible to the next transactions until taken.
    pub fn commit_tx(&mut self) {
        self.depths.clear();
        self.entries.clear();
    }

    /// Reverts every change of the current transaction.
    pub fn discard_tx(&mut self) {
        self.depths.clear();
        self.checkpoint_revert();
    }

    pub fn take_changes(&mut self) -> PrecompileStateChanges {
        self.commit_tx();
        mem::take(&mut self.changes)
    }
}

/// Durable storage of `host` seen through a layered state. Reads fall back
/// to the durable storage, writes only reach the layered state.
pub struct LayeredStorage<'a, Host: Runtime> {
    host: &'a Host,
    layered_state: &'a mut LayeredState,
}

impl<'a, Host: Runtime> LayeredStorage<'a, Host> {
    pub fn new(host: &'a Host, layered_state: &'a mut LayeredState) -> Self {
        Self {
            host,
            layered_state,
        }
    }

    fn current_num_tries(&self, id: &B256) -> Result<u64, Error> {
        match self.layered_state.num_tries(id) {
            Some(num_tries) => Ok(num_tries),
            None => read_num_tries(self.host, id),
        }
    }
}

impl<Host: Runtime> RetryableStore for LayeredStorage<'_, Host> {
    fn open_retryable(&self, id: &B256, now: u64) -> Result<Option<Retryable>, Error> {
        if self.layered_state.is_retryable_deleted(id) {
            return Ok(None);
        }
        let Some(mut retryable) = read_retryable(self.host, id)? else {
            return Ok(None);
        };
        if let Some(timeout) = self.layered_state.timeout(id) {
            retryable = retryable.with_timeout(timeout);
        }
        if let Some(num_tries) = self.layered_state.num_tries(id) {
            retryable = retryable.with_num_tries(num_tries);
        }
        Ok(Some(retryable).filter(|retryable| retryable.is_alive(now)))
    }

    fn delete_retryable(&mut self, id: &B256) -> Result<bool, Error> {
        if self.layered_state.is_retryable_deleted(id)
            || !retryable_exists(self.host, id)?
        {
            return Ok(false);
        }
        self.layered_state.delete_retryable(*id);
        Ok(true)
    }

    fn keepalive(&mut self, id: &B256, now: u64, new_timeout: u64) -> Result<(), Error> {
        if self.open_retryable(id, now)?.is_none() {
            return Err(custom(format!("no retryable {id} to keep alive")));
        }
        self.layered_state.set_timeout(*id, new_timeout);
        Ok(())
    }

    fn increment_num_tries(&mut self, retryable: &Retryable) -> Result<u64, Error> {
        let num_tries = self
            .current_num_tries(retryable.id())?
            .checked_add(1)
            .ok_or_else(|| custom("retryable number of tries overflow"))?;
        self.layered_state.set_num_tries(*retryable.id(), num_tries);
        Ok(num_tries)
    }
}

impl<Host: Runtime> AggregatorRegistry for LayeredStorage<'_, Host> {
    fn aggregator_fee_collector(&self, aggregator: &Address) -> Result<Address, Error> {
        let collector = match self.layered_state.fee_collector(aggregator) {
            Some(collector) => Some(collector),
            None => read_fee_collector(self.host, aggregator)?,
        };
        Ok(collector.unwrap_or(*aggregator))
    }

    fn set_aggregator_fee_collector(
        &mut self,
        aggregator: &Address,
        collector: &Address,
    ) -> Result<(), Error> {
        self.layered_state.set_fee_collector(*aggregator, *collector);
        Ok(())
    }

    fn default_aggregator(&self) -> Result<Address, Error> {
        let aggregator = match self.layered_state.default_aggregator() {
            Some(aggregator) => Some(aggregator),
            None => read_default_aggregator(self.host)?,
        };
        Ok(aggregator.unwrap_or(SEQUENCER_ADDRESS))
    }

    fn set_default_aggregator(&mut self, aggregator: &Address) -> Result<(), Error> {
        self.layered_state.set_default_aggregator(*aggregator);
        Ok(())
    }

    fn preferred_aggregator(&self, sender: &Address) -> Result<(Address, bool), Error> {
        let preferred = match self.layered_state.preferred_aggregator(sender) {
            Some(aggregator) => Some(aggregator),
            None => read_preferred_aggregator(self.host, sender)?,
        };
        Ok(preferred_or_unset(preferred))
    }

    fn set_preferred_aggregator(
        &mut self,
        sender: &Address,
        aggregator: &Address,
    ) -> Result<(), Error> {
        self.layered_state
            .set_preferred_aggregator(*sender, *aggregator);
        Ok(())
    }

    fn fixed_charge_for_aggregator_l1_gas(
        &self,
        aggregator: &Address,
    ) -> Result<U256, Error> {
        match self.layered_state.fixed_charge(aggregator) {
            Some(fee) => Ok(fee),
            None => read_fixed_charge(self.host, aggregator),
        }
    }

    fn set_fixed_charge_for_aggregator_l1_gas(
        &mut self,
        aggregator: &Address,
        fee: U256,
    ) -> Result<(), Error> {
        self.layered_state.set_fixed_charge(*aggregator, fee);
        Ok(())
    }
}
