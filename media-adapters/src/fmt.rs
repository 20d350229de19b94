//! Logging shim.
//!
//! Forwards to `log` when that feature is on, otherwise to `defmt`, otherwise
//! type-checks the arguments and discards them. Format strings must stay in
//! the subset both backends accept (`{}` and `{:?}`).

#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        ::log::trace!($($arg)+);
        #[cfg(all(feature = "defmt", not(feature = "log")))]
        ::defmt::trace!($($arg)+);
        #[cfg(not(any(feature = "log", feature = "defmt")))]
        let _ = ::core::format_args!($($arg)+);
    }};
}

macro_rules! debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        ::log::debug!($($arg)+);
        #[cfg(all(feature = "defmt", not(feature = "log")))]
        ::defmt::debug!($($arg)+);
        #[cfg(not(any(feature = "log", feature = "defmt")))]
        let _ = ::core::format_args!($($arg)+);
    }};
}

macro_rules! warn {
    ($($arg:tt)+) => {{
        #[cfg(feature = "log")]
        ::log::warn!($($arg)+);
        #[cfg(all(feature = "defmt", not(feature = "log")))]
        ::defmt::warn!($($arg)+);
        #[cfg(not(any(feature = "log", feature = "defmt")))]
        let _ = ::core::format_args!($($arg)+);
    }};
}
