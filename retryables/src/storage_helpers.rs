// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

use crate::Error;
use revm::primitives::{Address, B256, U256};
use tezos_smart_rollup_host::{
    path::{concat as host_concat, OwnedPath, Path},
    runtime::{Runtime, RuntimeError},
};

/// Maximum number of bytes a single `store_write` accepts.
const MAX_FILE_CHUNK_SIZE: usize = 2048;

const ADDRESS_SIZE: usize = 20;

pub fn concat(prefix: &impl Path, suffix: &impl Path) -> Result<OwnedPath, Error> {
    host_concat(prefix, suffix).map_err(Error::from)
}

pub fn address_path(address: &Address) -> Result<OwnedPath, Error> {
    let path_string = format!("/{}", hex::encode(address.as_slice()));
    OwnedPath::try_from(path_string).map_err(Error::from)
}

pub fn b256_path(value: &B256) -> Result<OwnedPath, Error> {
    let path_string = format!("/{}", hex::encode(value.as_slice()));
    OwnedPath::try_from(path_string).map_err(Error::from)
}

pub fn read_u64_le_default(
    host: &impl Runtime,
    path: &impl Path,
    default: u64,
) -> Result<u64, Error> {
    match host.store_read_all(path) {
        Ok(bytes) if bytes.len() == std::mem::size_of::<u64>() => {
            let bytes_array: [u8; std::mem::size_of::<u64>()] = match bytes.try_into() {
                Ok(bytes) => bytes,
                Err(err) => {
                    return Err(Error::Custom(format!(
                        "Bytes array conversion failed with {err:?}",
                    )))
                }
            };
            Ok(u64::from_le_bytes(bytes_array))
        }
        Ok(_) | Err(RuntimeError::PathNotFound) => Ok(default),
        Err(err) => Err(Error::Runtime(err)),
    }
}

pub fn write_u64_le(
    host: &mut impl Runtime,
    path: &impl Path,
    value: u64,
) -> Result<(), Error> {
    host.store_write(path, value.to_le_bytes().as_slice(), 0)
        .map_err(Error::from)
}

pub fn read_u256_le_default(
    host: &impl Runtime,
    path: &impl Path,
    default: U256,
) -> Result<U256, Error> {
    match host.store_read_all(path) {
        Ok(bytes) if bytes.len() == 32 => Ok(U256::from_le_slice(&bytes)),
        Ok(_) | Err(RuntimeError::PathNotFound) => Ok(default),
        Err(err) => Err(Error::Runtime(err)),
    }
}

pub fn write_u256_le(
    host: &mut impl Runtime,
    path: &impl Path,
    value: U256,
) -> Result<(), Error> {
    host.store_write(path, &value.to_le_bytes::<32>(), 0)
        .map_err(Error::from)
}

pub fn read_address_opt(
    host: &impl Runtime,
    path: &impl Path,
) -> Result<Option<Address>, Error> {
    match host.store_read_all(path) {
        Ok(bytes) if bytes.len() == ADDRESS_SIZE => {
            Ok(Some(Address::from_slice(&bytes)))
        }
        Ok(_) | Err(RuntimeError::PathNotFound) => Ok(None),
        Err(err) => Err(Error::Runtime(err)),
    }
}

pub fn write_address(
    host: &mut impl Runtime,
    path: &impl Path,
    address: &Address,
) -> Result<(), Error> {
    host.store_write(path, address.as_slice(), 0)
        .map_err(Error::from)
}

/// Replaces the value at `path` with `bytes`, whatever their size. An empty
/// `bytes` leaves the path unset.
pub fn write_all(
    host: &mut impl Runtime,
    path: &impl Path,
    bytes: &[u8],
) -> Result<(), Error> {
    if host.store_has(path)?.is_some() {
        host.store_delete(path)?;
    }
    for (index, chunk) in bytes.chunks(MAX_FILE_CHUNK_SIZE).enumerate() {
        host.store_write(path, chunk, index * MAX_FILE_CHUNK_SIZE)?;
    }
    Ok(())
}
