// SPDX-FileCopyrightText: 2023-2025 Nomadic Labs <contact@nomadic-labs.com>
// SPDX-FileCopyrightText: 2025 Functori <contact@functori.com>
//
// SPDX-License-Identifier: MIT

#[doc(hidden)]
pub use tezos_smart_rollup_debug::debug_str;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use tezos_smart_rollup_host::{path::RefPath, runtime::Runtime};

/// Path of the one byte verbosity level. Missing or invalid values
/// fall back to [`Level::default`].
pub const VERBOSITY_PATH: RefPath = RefPath::assert_from(b"/evm/logging_verbosity");

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, FromPrimitive)]
pub enum Level {
    Fatal = 0,
    Error,
    Info,
    Debug,
}

impl TryFrom<u8> for Level {
    type Error = ();
    fn try_from(value: u8) -> Result<Self, ()> {
        FromPrimitive::from_u8(value).ok_or(())
    }
}

impl Default for Level {
    fn default() -> Self {
        if cfg!(feature = "debug") {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Level::Info => write!(f, "Info"),
            Level::Error => write!(f, "Error"),
            Level::Fatal => write!(f, "Fatal"),
            Level::Debug => write!(f, "Debug"),
        }
    }
}

pub trait Verbosity {
    fn verbosity(&self) -> Level;
}

impl<Host: Runtime> Verbosity for Host {
    fn verbosity(&self) -> Level {
        match self.store_read(&VERBOSITY_PATH, 0, 1) {
            Ok(bytes) => bytes
                .first()
                .and_then(|byte| Level::try_from(*byte).ok())
                .unwrap_or_default(),
            Err(_) => Level::default(),
        }
    }
}

#[macro_export]
macro_rules! log {
    ($host: expr, $level: expr, $fmt: expr $(, $arg:expr)*)  => {{
        use $crate::Verbosity as _;
        if $host.verbosity() >= $level {
            let msg = format!("[{}] {}\n", $level, format_args!($fmt $(, $arg)*));
            $crate::debug_str!($host, &msg);
        }
    }};
}

#[cfg(test)]
mod test {
    use super::{Level, Verbosity, VERBOSITY_PATH};
    use tezos_smart_rollup_host::runtime::Runtime;
    use tezos_smart_rollup_mock::MockHost;

    #[test]
    fn levels_are_ordered_by_verbosity() {
        assert!(Level::Fatal < Level::Error);
        assert!(Level::Error < Level::Info);
        assert!(Level::Info < Level::Debug);
    }

    #[test]
    fn level_from_byte() {
        assert_eq!(Level::try_from(0), Ok(Level::Fatal));
        assert_eq!(Level::try_from(3), Ok(Level::Debug));
        assert_eq!(Level::try_from(4), Err(()));
    }

    #[test]
    fn verbosity_defaults_when_unset() {
        let host = MockHost::default();
        assert_eq!(host.verbosity(), Level::default());
    }

    #[test]
    fn verbosity_is_read_from_storage() {
        let mut host = MockHost::default();
        host.store_write(&VERBOSITY_PATH, &[Level::Error as u8], 0)
            .unwrap();
        assert_eq!(host.verbosity(), Level::Error);

        host.store_write(&VERBOSITY_PATH, &[42], 0).unwrap();
        assert_eq!(host.verbosity(), Level::default());
    }

    #[test]
    fn log_writes_through_the_host() {
        let host = MockHost::default();
        let value = 7;
        crate::log!(host, Level::Info, "value is {}", value);
        crate::log!(host, Level::Debug, "filtered unless debug");
    }
}
