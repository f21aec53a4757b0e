// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

//! Durable storage of retryable tickets.
//!
//! Every ticket lives in its own subtree, keyed by the hex encoding of its
//! id. A ticket is considered alive as long as its timeout is not in the
//! past; expired tickets are left in place until they are reaped but are
//! never returned by [`RetryableStore::open_retryable`].

use revm::primitives::{keccak256, Address, B256, U256};
use tezos_smart_rollup_host::{
    path::{OwnedPath, RefPath},
    runtime::{Runtime, RuntimeError},
};

use crate::{
    custom,
    storage_helpers::{
        b256_path, concat, read_address_opt, read_u256_le_default, read_u64_le_default,
        write_address, write_all, write_u256_le, write_u64_le,
    },
    Error,
};

pub const RETRYABLES_PATH: RefPath = RefPath::assert_from(b"/evm/world_state/retryables");

const TIMEOUT_PATH: RefPath = RefPath::assert_from(b"/timeout");
const NUM_TRIES_PATH: RefPath = RefPath::assert_from(b"/num_tries");
const BENEFICIARY_PATH: RefPath = RefPath::assert_from(b"/beneficiary");
const FROM_PATH: RefPath = RefPath::assert_from(b"/from");
const TO_PATH: RefPath = RefPath::assert_from(b"/to");
const CALLVALUE_PATH: RefPath = RefPath::assert_from(b"/callvalue");
const CALLDATA_PATH: RefPath = RefPath::assert_from(b"/calldata");

// Timeout, number of tries, beneficiary, from, to and callvalue each take
// one storage word.
const FIXED_FIELDS_SIZE: u64 = 6 * 32;
const CALLDATA_LENGTH_SIZE: u64 = 32;

/// Identifier of the `sequence_num`-th redeem attempt of `ticket_id`:
/// `keccak256(ticket_id ++ sequence_num as a 32 bytes big endian word)`.
pub fn tx_id_for_redeem_attempt(ticket_id: &B256, sequence_num: u64) -> B256 {
    let mut input = [0u8; 64];
    input[..32].copy_from_slice(ticket_id.as_slice());
    input[32..].copy_from_slice(&U256::from(sequence_num).to_be_bytes::<32>());
    keccak256(input)
}

/// Stored footprint of a ticket carrying `calldata_size` bytes of calldata.
pub fn retryable_size_bytes(calldata_size: u64) -> u64 {
    FIXED_FIELDS_SIZE + CALLDATA_LENGTH_SIZE + 32 * calldata_size.div_ceil(32)
}

/// An opened, non expired ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retryable {
    id: B256,
    beneficiary: Address,
    timeout: u64,
    num_tries: u64,
    calldata_size: u64,
}

impl Retryable {
    pub fn id(&self) -> &B256 {
        &self.id
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn num_tries(&self) -> u64 {
        self.num_tries
    }

    pub fn calldata_size(&self) -> u64 {
        self.calldata_size
    }

    pub fn size_bytes(&self) -> u64 {
        retryable_size_bytes(self.calldata_size)
    }

    /// A ticket whose timeout is exactly `now` is still alive.
    pub fn is_alive(&self, now: u64) -> bool {
        self.timeout >= now
    }

    pub(crate) fn with_timeout(self, timeout: u64) -> Self {
        Self { timeout, ..self }
    }

    pub(crate) fn with_num_tries(self, num_tries: u64) -> Self {
        Self { num_tries, ..self }
    }
}

/// The L1 message a ticket will replay when redeemed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetryableMessage {
    pub from: Address,
    pub to: Address,
    pub callvalue: U256,
    pub beneficiary: Address,
    pub calldata: Vec<u8>,
}

/// Access to the tickets required by the lifecycle operations.
pub trait RetryableStore {
    /// Returns the ticket if it exists and has not expired at `now`.
    fn open_retryable(&self, id: &B256, now: u64) -> Result<Option<Retryable>, Error>;

    /// Removes the ticket, returns whether it existed. No rent is refunded.
    fn delete_retryable(&mut self, id: &B256) -> Result<bool, Error>;

    /// Stored size of the ticket, 0 if it is absent or expired.
    fn retryable_size_bytes(&self, id: &B256, now: u64) -> Result<u64, Error> {
        Ok(self
            .open_retryable(id, now)?
            .map(|retryable| retryable.size_bytes())
            .unwrap_or(0))
    }

    /// Sets the timeout of a live ticket to `new_timeout`.
    fn keepalive(&mut self, id: &B256, now: u64, new_timeout: u64) -> Result<(), Error>;

    /// Bumps the number of scheduled redeem attempts, returns the new count.
    fn increment_num_tries(&mut self, retryable: &Retryable) -> Result<u64, Error>;
}

fn retryable_path(id: &B256) -> Result<OwnedPath, Error> {
    concat(&RETRYABLES_PATH, &b256_path(id)?)
}

pub(crate) fn retryable_exists(host: &impl Runtime, id: &B256) -> Result<bool, Error> {
    Ok(host.store_has(&retryable_path(id)?)?.is_some())
}

/// Reads a stored ticket whether or not it expired. `None` when it has no
/// timeout.
pub(crate) fn read_retryable(
    host: &impl Runtime,
    id: &B256,
) -> Result<Option<Retryable>, Error> {
    let path = retryable_path(id)?;
    let timeout = read_u64_le_default(host, &concat(&path, &TIMEOUT_PATH)?, 0)?;
    if timeout == 0 {
        return Ok(None);
    }

    let Some(beneficiary) = read_address_opt(host, &concat(&path, &BENEFICIARY_PATH)?)?
    else {
        return Err(custom(format!("retryable {id} has no beneficiary")));
    };
    let calldata_size = match host.store_value_size(&concat(&path, &CALLDATA_PATH)?) {
        Ok(size) => size as u64,
        Err(RuntimeError::PathNotFound) => 0,
        Err(err) => return Err(err.into()),
    };

    Ok(Some(Retryable {
        id: *id,
        beneficiary,
        timeout,
        num_tries: read_num_tries(host, id)?,
        calldata_size,
    }))
}

pub(crate) fn read_num_tries(host: &impl Runtime, id: &B256) -> Result<u64, Error> {
    read_u64_le_default(host, &concat(&retryable_path(id)?, &NUM_TRIES_PATH)?, 0)
}

pub struct RetryableState<'a, Host: Runtime> {
    host: &'a mut Host,
}

impl<'a, Host: Runtime> RetryableState<'a, Host> {
    pub fn new(host: &'a mut Host) -> Self {
        Self { host }
    }

    /// Stores a new ticket expiring at `timeout`. Called by the inbox
    /// handler when an L1 retryable submission is processed.
    pub fn create_retryable(
        &mut self,
        id: &B256,
        timeout: u64,
        message: &RetryableMessage,
    ) -> Result<Retryable, Error> {
        if timeout == 0 {
            return Err(custom("a retryable cannot be created with a zero timeout"));
        }
        if retryable_exists(self.host, id)? {
            return Err(custom(format!("retryable {id} already exists")));
        }
        let path = retryable_path(id)?;

        write_u64_le(self.host, &concat(&path, &TIMEOUT_PATH)?, timeout)?;
        write_u64_le(self.host, &concat(&path, &NUM_TRIES_PATH)?, 0)?;
        write_address(
            self.host,
            &concat(&path, &BENEFICIARY_PATH)?,
            &message.beneficiary,
        )?;
        write_address(self.host, &concat(&path, &FROM_PATH)?, &message.from)?;
        write_address(self.host, &concat(&path, &TO_PATH)?, &message.to)?;
        write_u256_le(
            self.host,
            &concat(&path, &CALLVALUE_PATH)?,
            message.callvalue,
        )?;
        write_all(
            self.host,
            &concat(&path, &CALLDATA_PATH)?,
            &message.calldata,
        )?;

        Ok(Retryable {
            id: *id,
            beneficiary: message.beneficiary,
            timeout,
            num_tries: 0,
            calldata_size: message.calldata.len() as u64,
        })
    }

    /// Reads back the message of a ticket, whether or not it expired.
    pub fn read_message(&self, id: &B256) -> Result<Option<RetryableMessage>, Error> {
        if !retryable_exists(self.host, id)? {
            return Ok(None);
        }
        let path = retryable_path(id)?;
        let read_address = |suffix: &RefPath| -> Result<Address, Error> {
            Ok(read_address_opt(self.host, &concat(&path, suffix)?)?.unwrap_or_default())
        };
        let calldata = match self.host.store_read_all(&concat(&path, &CALLDATA_PATH)?) {
            Ok(bytes) => bytes,
            Err(RuntimeError::PathNotFound) => vec![],
            Err(err) => return Err(err.into()),
        };
        Ok(Some(RetryableMessage {
            from: read_address(&FROM_PATH)?,
            to: read_address(&TO_PATH)?,
            callvalue: read_u256_le_default(
                self.host,
                &concat(&path, &CALLVALUE_PATH)?,
                U256::ZERO,
            )?,
            beneficiary: read_address(&BENEFICIARY_PATH)?,
            calldata,
        }))
    }

    pub(crate) fn write_timeout(&mut self, id: &B256, timeout: u64) -> Result<(), Error> {
        let path = concat(&retryable_path(id)?, &TIMEOUT_PATH)?;
        write_u64_le(self.host, &path, timeout)
    }

    pub(crate) fn write_num_tries(
        &mut self,
        id: &B256,
        num_tries: u64,
    ) -> Result<(), Error> {
        let path = concat(&retryable_path(id)?, &NUM_TRIES_PATH)?;
        write_u64_le(self.host, &path, num_tries)
    }
}

impl<Host: Runtime> RetryableStore for RetryableState<'_, Host> {
    fn open_retryable(&self, id: &B256, now: u64) -> Result<Option<Retryable>, Error> {
        Ok(read_retryable(self.host, id)?.filter(|retryable| retryable.is_alive(now)))
    }

    fn delete_retryable(&mut self, id: &B256) -> Result<bool, Error> {
        if !retryable_exists(self.host, id)? {
            return Ok(false);
        }
        self.host.store_delete(&retryable_path(id)?)?;
        Ok(true)
    }

    fn keepalive(&mut self, id: &B256, now: u64, new_timeout: u64) -> Result<(), Error> {
        if self.open_retryable(id, now)?.is_none() {
            return Err(custom(format!("no retryable {id} to keep alive")));
        }
        self.write_timeout(id, new_timeout)
    }

    fn increment_num_tries(&mut self, retryable: &Retryable) -> Result<u64, Error> {
        let num_tries = read_num_tries(self.host, retryable.id())?
            .checked_add(1)
            .ok_or_else(|| custom("retryable number of tries overflow"))?;
        self.write_num_tries(retryable.id(), num_tries)?;
        Ok(num_tries)
    }
}
