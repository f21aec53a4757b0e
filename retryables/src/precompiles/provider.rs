// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

use retryables_logging::{log, Level};
use revm::{
    context::{Block, Cfg, ContextTr, JournalTr, LocalContextTr},
    context_interface::Database,
    handler::{EthPrecompiles, PrecompileProvider},
    interpreter::{CallInput, InputsImpl, InstructionResult, InterpreterResult},
    primitives::Address,
};
use tezos_smart_rollup_host::runtime::Runtime;

use crate::{
    configuration::Configuration,
    journal::Journal,
    precompiles::{
        aggregator::aggregator_precompile,
        call::PrecompileCall,
        constants::{
            AGGREGATOR_PRECOMPILE_ADDRESS, CUSTOMS, RETRYABLE_TX_PRECOMPILE_ADDRESS,
        },
        error::PrecompileError,
        guard::{guard, out_of_gas, revert},
        retryable_tx::retryable_tx_precompile,
    },
    Error,
};

/// Ethereum precompiles extended with the retryable tx and aggregator
/// precompiles.
///
/// Both read the durable storage of `host` through the layered state of
/// the [`Journal`], and only ever write to the latter.
pub struct RetryablePrecompiles<'a, Host: Runtime> {
    host: &'a Host,
    configuration: Configuration,
    builtins: EthPrecompiles,
}

impl<'a, Host: Runtime> RetryablePrecompiles<'a, Host> {
    pub fn new(host: &'a Host) -> Result<Self, Error> {
        let configuration = Configuration::read(host)?;
        Ok(Self::with_configuration(host, configuration))
    }

    pub fn with_configuration(host: &'a Host, configuration: Configuration) -> Self {
        Self {
            host,
            configuration,
            builtins: EthPrecompiles::default(),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    fn warm_addresses(&self) -> Box<impl Iterator<Item = Address>> {
        Box::new(self.builtins.warm_addresses().chain(CUSTOMS))
    }

    fn contains(&self, address: &Address) -> bool {
        CUSTOMS.contains(address) || self.builtins.contains(address)
    }

    fn run_custom_precompile<CTX, DB>(
        &mut self,
        context: &mut CTX,
        address: &Address,
        inputs: &InputsImpl,
        is_static: bool,
        gas_limit: u64,
    ) -> Result<Option<InterpreterResult>, Error>
    where
        DB: Database,
        CTX: ContextTr<Db = DB, Journal = Journal<DB>>,
    {
        if !CUSTOMS.contains(address) {
            return Ok(None);
        }

        let input_bytes = match &inputs.input {
            CallInput::SharedBuffer(range) => context
                .local()
                .shared_memory_buffer_slice(range.clone())
                .map(|slice| slice.to_vec())
                .unwrap_or_default(),
            CallInput::Bytes(bytes) => bytes.to_vec(),
        };

        let timestamp = context.block().timestamp().saturating_to::<u64>();
        let mut call =
            PrecompileCall::new(*address, inputs.caller_address, timestamp, gas_limit);

        let journal = context.journal_mut();
        journal.layered_state.checkpoint();
        let result = guard(*address, inputs).and_then(|()| match *address {
            RETRYABLE_TX_PRECOMPILE_ADDRESS => retryable_tx_precompile(
                self.host,
                &mut journal.layered_state,
                &self.configuration,
                &input_bytes,
                &mut call,
                is_static,
            ),
            AGGREGATOR_PRECOMPILE_ADDRESS => aggregator_precompile(
                self.host,
                &mut journal.layered_state,
                &self.configuration,
                &input_bytes,
                &mut call,
                is_static,
            ),
            _ => Err(PrecompileError::revert("unknown precompile")),
        });
        if result.is_ok() {
            journal.layered_state.checkpoint_commit();
        } else {
            journal.layered_state.checkpoint_revert();
        }

        let interpreter_result = match result {
            Ok(output) => {
                let (gas, logs, scheduled_redeems) = call.into_parts();
                for log in logs {
                    journal.log(log);
                }
                for scheduled in scheduled_redeems {
                    log!(
                        self.host,
                        Level::Debug,
                        "Redeem {} of retryable {} scheduled with {} gas",
                        scheduled.sequence_num,
                        scheduled.ticket_id,
                        scheduled.donated_gas
                    );
                    journal.layered_state.schedule_redeem(scheduled);
                }
                InterpreterResult {
                    result: InstructionResult::Return,
                    gas,
                    output,
                }
            }
            Err(PrecompileError::OutOfGas) => out_of_gas(gas_limit),
            Err(PrecompileError::Abort(error)) => {
                log!(
                    self.host,
                    Level::Error,
                    "Precompile {} aborted: {}",
                    address,
                    error
                );
                return Err(error);
            }
            Err(reason) => revert(reason, call.gas()),
        };

        Ok(Some(interpreter_result))
    }
}

impl<CTX, DB, Host> PrecompileProvider<CTX> for RetryablePrecompiles<'_, Host>
where
    DB: Database,
    CTX: ContextTr<Db = DB, Journal = Journal<DB>>,
    Host: Runtime,
{
    type Output = InterpreterResult;

    fn set_spec(&mut self, spec: <CTX::Cfg as Cfg>::Spec) -> bool {
        <EthPrecompiles as PrecompileProvider<CTX>>::set_spec(&mut self.builtins, spec)
    }

    fn run(
        &mut self,
        context: &mut CTX,
        address: &Address,
        inputs: &InputsImpl,
        is_static: bool,
        gas_limit: u64,
    ) -> Result<Option<Self::Output>, String> {
        if let Some(custom_result) = self
            .run_custom_precompile(context, address, inputs, is_static, gas_limit)
            .map_err(|e| e.to_string())?
        {
            return Ok(Some(custom_result));
        }

        self.builtins
            .run(context, address, inputs, is_static, gas_limit)
    }

    fn warm_addresses(&self) -> Box<impl Iterator<Item = Address>> {
        self.warm_addresses()
    }

    fn contains(&self, address: &Address) -> bool {
        self.contains(address)
    }
}
