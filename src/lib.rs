//! Staged Bluetooth LE GATT peripheral bringup.
//!
//! Brings up a single-service GATT peripheral on top of a platform radio stack
//! ([`radio::RadioAdapter`]): the service is created, published, and advertised
//! in a strict order, with each step gated on an asynchronous confirmation from
//! the adapter. Once [`Stage::Ready`] is reached, characteristic read requests
//! from connected centrals are answered by [`gatt::GattServer`].

/// Implements `Display` for one or more types by forwarding to `Debug`.
macro_rules! impl_display_via_debug {
    ($($t:ty),* $(,)?) => {$(
        impl ::std::fmt::Display for $t {
            #[inline(always)]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(self, f)
            }
        }
    )*};
}
pub(crate) use impl_display_via_debug;

pub use {bringup::*, config::*, peripheral::*};

pub mod att;
pub mod gap;
pub mod gatt;
pub mod radio;

mod bringup;
mod config;
mod peripheral;

/// Error type returned by the peripheral.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("bringup failed at {stage}: {source}")]
    AdapterOperationFailed {
        stage: Stage,
        source: radio::AdapterError,
    },
    #[error("GATT service has not been created")]
    NotCreated,
    #[error(transparent)]
    Att(#[from] att::ErrorCode),
    #[cfg(feature = "fs")]
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[cfg(feature = "fs")]
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Common result type.
pub type Result<T> = std::result::Result<T, Error>;

type SyncMutex<T> = parking_lot::Mutex<T>;
