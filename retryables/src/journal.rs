// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

use revm::{
    bytecode::Bytecode,
    context_interface::{
        context::{SStoreResult, SelfDestructResult, StateLoad},
        journaled_state::{AccountLoad, JournalCheckpoint, JournalTr, TransferError},
        Database,
    },
    primitives::{
        hardfork::SpecId, Address, HashMap, HashSet, Log, StorageKey, StorageValue, B256,
        U256,
    },
    state::{Account, EvmState},
    Journal as EvmJournal,
};
use tezos_smart_rollup_host::runtime::Runtime;

use crate::{
    escrow::ScheduledRedeem,
    layered_state::LayeredState,
    storage::{
        l1_pricing::{AggregatorRegistry, L1PricingState},
        retryables::{RetryableState, RetryableStore},
    },
    Error,
};

/// Changes made by the retryable precompiles and not yet written to the
/// durable storage.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct PrecompileStateChanges {
    pub timeouts: HashMap<B256, u64>,
    pub num_tries: HashMap<B256, u64>,
    pub deleted_retryables: HashSet<B256>,
    pub fee_collectors: HashMap<Address, Address>,
    pub default_aggregator: Option<Address>,
    pub preferred_aggregators: HashMap<Address, Address>,
    pub fixed_charges: HashMap<Address, U256>,
    pub scheduled_redeems: Vec<ScheduledRedeem>,
}

impl PrecompileStateChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Writes the changes to the durable storage of `host` and returns the
    /// redeems to execute, in scheduling order.
    pub fn commit(self, host: &mut impl Runtime) -> Result<Vec<ScheduledRedeem>, Error> {
        let PrecompileStateChanges {
            timeouts,
            num_tries,
            deleted_retryables,
            fee_collectors,
            default_aggregator,
            preferred_aggregators,
            fixed_charges,
            scheduled_redeems,
        } = self;

        let mut retryables = RetryableState::new(host);
        for (id, timeout) in timeouts {
            if !deleted_retryables.contains(&id) {
                retryables.write_timeout(&id, timeout)?;
            }
        }
        for (id, tries) in num_tries {
            if !deleted_retryables.contains(&id) {
                retryables.write_num_tries(&id, tries)?;
            }
        }
        for id in deleted_retryables {
            retryables.delete_retryable(&id)?;
        }

        let mut registry = L1PricingState::new(host);
        for (aggregator, collector) in fee_collectors {
            registry.set_aggregator_fee_collector(&aggregator, &collector)?;
        }
        if let Some(aggregator) = default_aggregator {
            registry.set_default_aggregator(&aggregator)?;
        }
        for (sender, aggregator) in preferred_aggregators {
            registry.set_preferred_aggregator(&sender, &aggregator)?;
        }
        for (aggregator, fee) in fixed_charges {
            registry.set_fixed_charge_for_aggregator_l1_gas(&aggregator, fee)?;
        }

        Ok(scheduled_redeems)
    }
}

/// The REVM journal extended with the state of the retryable precompiles.
///
/// The layered state follows the checkpoints of the journal, so that a
/// reverted call frame drops the ticket, registry and escrow changes of
/// the precompile calls it made, as it drops their logs.
#[derive(Debug)]
pub struct Journal<DB> {
    /// Layered state for state changes not managed by REVM
    pub layered_state: LayeredState,

    /// Inner REVM journal.
    pub inner: EvmJournal<DB>,
}

impl<DB: Database> JournalTr for Journal<DB> {
    type Database = DB;
    type State = EvmState;

    fn new(database: DB) -> Journal<DB> {
        Self {
            layered_state: LayeredState::new(),
            inner: EvmJournal::new(database),
        }
    }

    fn db(&self) -> &Self::Database {
        self.inner.db()
    }

    fn db_mut(&mut self) -> &mut Self::Database {
        self.inner.db_mut()
    }

    fn sload(
        &mut self,
        address: Address,
        key: StorageKey,
    ) -> Result<StateLoad<StorageValue>, <Self::Database as Database>::Error> {
        self.inner.sload(address, key)
    }

    fn sstore(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<StateLoad<SStoreResult>, <Self::Database as Database>::Error> {
        self.inner.sstore(address, key, value)
    }

    fn tload(&mut self, address: Address, key: StorageKey) -> StorageValue {
        self.inner.tload(address, key)
    }

    fn tstore(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.inner.tstore(address, key, value)
    }

    fn log(&mut self, log: Log) {
        self.inner.log(log)
    }

    fn selfdestruct(
        &mut self,
        address: Address,
        target: Address,
    ) -> Result<StateLoad<SelfDestructResult>, DB::Error> {
        self.inner.selfdestruct(address, target)
    }

    fn warm_account(&mut self, address: Address) {
        self.inner.warm_account(address)
    }

    fn warm_coinbase_account(&mut self, address: Address) {
        self.inner.warm_coinbase_account(address)
    }

    fn warm_precompiles(&mut self, precompiles: HashSet<Address>) {
        self.inner.warm_precompiles(precompiles)
    }

    #[inline]
    fn precompile_addresses(&self) -> &HashSet<Address> {
        self.inner.precompile_addresses()
    }

    #[inline]
    fn depth(&self) -> usize {
        self.inner.depth()
    }

    #[inline]
    fn warm_account_and_storage(
        &mut self,
        address: Address,
        storage_keys: impl IntoIterator<Item = StorageKey>,
    ) -> Result<(), <Self::Database as Database>::Error> {
        self.inner.warm_account_and_storage(address, storage_keys)
    }

    #[inline]
    fn set_spec_id(&mut self, spec_id: SpecId) {
        self.inner.set_spec_id(spec_id)
    }

    #[inline]
    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        balance: U256,
    ) -> Result<Option<TransferError>, DB::Error> {
        self.inner.transfer(from, to, balance)
    }

    #[inline]
    fn touch_account(&mut self, address: Address) {
        self.inner.touch_account(address)
    }

    #[inline]
    fn caller_accounting_journal_entry(
        &mut self,
        address: Address,
        old_balance: U256,
        bump_nonce: bool,
    ) {
        self.inner
            .caller_accounting_journal_entry(address, old_balance, bump_nonce)
    }

    #[inline]
    fn balance_incr(
        &mut self,
        address: Address,
        balance: U256,
    ) -> Result<(), <Self::Database as Database>::Error> {
        self.inner.balance_incr(address, balance)
    }

    #[inline]
    fn nonce_bump_journal_entry(&mut self, address: Address) {
        self.inner.nonce_bump_journal_entry(address)
    }

    #[inline]
    fn load_account(
        &mut self,
        address: Address,
    ) -> Result<StateLoad<&mut Account>, DB::Error> {
        self.inner.load_account(address)
    }

    #[inline]
    fn load_account_code(
        &mut self,
        address: Address,
    ) -> Result<StateLoad<&mut Account>, DB::Error> {
        self.inner.load_account_code(address)
    }

    #[inline]
    fn load_account_delegated(
        &mut self,
        address: Address,
    ) -> Result<StateLoad<AccountLoad>, DB::Error> {
        self.inner.load_account_delegated(address)
    }

    #[inline]
    fn checkpoint(&mut self) -> JournalCheckpoint {
        self.layered_state.checkpoint();
        self.inner.checkpoint()
    }

    #[inline]
    fn checkpoint_commit(&mut self) {
        self.layered_state.checkpoint_commit();
        self.inner.checkpoint_commit()
    }

    #[inline]
    fn checkpoint_revert(&mut self, checkpoint: JournalCheckpoint) {
        // REVM always reverts the latest checkpoint, which is the latest
        // depth of the layered state.
        self.layered_state.checkpoint_revert();
        self.inner.checkpoint_revert(checkpoint)
    }

    #[inline]
    fn set_code_with_hash(&mut self, address: Address, code: Bytecode, hash: B256) {
        self.inner.set_code_with_hash(address, code, hash)
    }

    #[inline]
    fn create_account_checkpoint(
        &mut self,
        caller: Address,
        address: Address,
        balance: U256,
        spec_id: SpecId,
    ) -> Result<JournalCheckpoint, TransferError> {
        // The frame commits or reverts this checkpoint like any other.
        let checkpoint = self
            .inner
            .create_account_checkpoint(caller, address, balance, spec_id)?;
        self.layered_state.checkpoint();
        Ok(checkpoint)
    }

    #[inline]
    fn take_logs(&mut self) -> Vec<Log> {
        self.inner.take_logs()
    }

    #[inline]
    fn commit_tx(&mut self) {
        self.layered_state.commit_tx();
        self.inner.commit_tx()
    }

    #[inline]
    fn discard_tx(&mut self) {
        self.layered_state.discard_tx();
        self.inner.discard_tx()
    }

    #[inline]
    fn finalize(&mut self) -> Self::State {
        self.layered_state.commit_tx();
        self.inner.finalize()
    }
}

impl<DB> Journal<DB> {
    /// Precompile changes of the transactions executed so far. They must
    /// be committed with [`PrecompileStateChanges::commit`] once the
    /// transactions are final.
    pub fn take_precompile_state_changes(&mut self) -> PrecompileStateChanges {
        self.layered_state.take_changes()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::retryables::RetryableMessage;
    use pretty_assertions::assert_eq;
    use revm::{database_interface::EmptyDB, primitives::address};
    use tezos_smart_rollup_mock::MockHost;

    const TICKET_ID: B256 = B256::repeat_byte(0x42);
    const AGGREGATOR: Address = address!("0x00000000000000000000000000000000000000a2");
    const SENDER: Address = address!("0x00000000000000000000000000000000000000e2");
    const CREATED: Address = address!("0x00000000000000000000000000000000000000c2");

    fn scheduled(sequence_num: u64) -> ScheduledRedeem {
        ScheduledRedeem {
            ticket_id: TICKET_ID,
            redeem_tx_id: B256::repeat_byte(sequence_num as u8),
            sequence_num,
            donated_gas: 10_000,
            donor: SENDER,
        }
    }

    #[test]
    fn reverted_checkpoint_drops_layered_changes() {
        let mut journal = Journal::new(EmptyDB::default());

        journal.checkpoint();
        journal.layered_state.set_num_tries(TICKET_ID, 1);
        let inner = journal.checkpoint();
        journal.layered_state.set_num_tries(TICKET_ID, 2);
        journal.layered_state.schedule_redeem(scheduled(2));
        journal.checkpoint_revert(inner);

        assert_eq!(journal.layered_state.num_tries(&TICKET_ID), Some(1));
        assert!(journal.layered_state.scheduled_redeems().is_empty());

        journal.checkpoint_commit();
        journal.commit_tx();

        let changes = journal.take_precompile_state_changes();
        assert_eq!(changes.num_tries.get(&TICKET_ID), Some(&1));
        assert!(journal.take_precompile_state_changes().is_empty());
    }

    #[test]
    fn reverted_create_frame_keeps_parent_changes() {
        let mut journal = Journal::new(EmptyDB::default());
        journal.load_account(SENDER).unwrap();
        journal.load_account(CREATED).unwrap();

        journal.checkpoint();
        journal.layered_state.schedule_redeem(scheduled(1));
        let create = journal
            .create_account_checkpoint(SENDER, CREATED, U256::ZERO, SpecId::PRAGUE)
            .unwrap();
        journal.layered_state.set_num_tries(TICKET_ID, 2);
        journal.checkpoint_revert(create);
        journal.checkpoint_commit();
        journal.commit_tx();

        let changes = journal.take_precompile_state_changes();
        assert_eq!(changes.scheduled_redeems, vec![scheduled(1)]);
        assert!(changes.num_tries.is_empty());
    }

    #[test]
    fn discarded_transaction_drops_layered_changes() {
        let mut journal = Journal::new(EmptyDB::default());
        journal.layered_state.set_default_aggregator(AGGREGATOR);
        journal.commit_tx();

        journal.layered_state.set_preferred_aggregator(SENDER, AGGREGATOR);
        journal.discard_tx();

        let changes = journal.take_precompile_state_changes();
        assert_eq!(changes.default_aggregator, Some(AGGREGATOR));
        assert!(changes.preferred_aggregators.is_empty());
    }

    #[test]
    fn commit_writes_changes_to_durable_storage() {
        let mut host = MockHost::default();
        RetryableState::new(&mut host)
            .create_retryable(
                &TICKET_ID,
                1_000,
                &RetryableMessage {
                    beneficiary: SENDER,
                    ..RetryableMessage::default()
                },
            )
            .unwrap();

        let mut changes = PrecompileStateChanges::default();
        changes.timeouts.insert(TICKET_ID, 2_000);
        changes.num_tries.insert(TICKET_ID, 3);
        changes.fixed_charges.insert(AGGREGATOR, U256::from(7));
        changes.scheduled_redeems.push(scheduled(3));

        assert_eq!(changes.commit(&mut host).unwrap(), vec![scheduled(3)]);
        let opened = RetryableState::new(&mut host)
            .open_retryable(&TICKET_ID, 1_500)
            .unwrap()
            .unwrap();
        assert_eq!(opened.timeout(), 2_000);
        assert_eq!(opened.num_tries(), 3);
        assert_eq!(
            L1PricingState::new(&mut host)
                .fixed_charge_for_aggregator_l1_gas(&AGGREGATOR)
                .unwrap(),
            U256::from(7)
        );

        let mut changes = PrecompileStateChanges::default();
        changes.timeouts.insert(TICKET_ID, 3_000);
        changes.deleted_retryables.insert(TICKET_ID);
        changes.commit(&mut host).unwrap();
        assert_eq!(
            RetryableState::new(&mut host).read_message(&TICKET_ID).unwrap(),
            None
        );
    }
}
