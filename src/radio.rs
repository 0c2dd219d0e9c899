//! Interface to the platform Bluetooth LE peripheral-role stack.
//!
//! The stack performs the actual radio work. Operations that the bringup
//! sequence waits on are submitted with an [`OpId`] and confirmed later by an
//! [`Event`] carrying the same id, which lets stray or duplicate confirmations
//! be told apart from the one currently awaited.

use std::fmt::{Debug, Display, Formatter};

use crate::gap::{AdvertisementData, Uuid};
use crate::gatt::{GattService, ReadOutcome, ReadRequest};
use crate::Stage;

#[cfg(test)]
pub(crate) mod fake;

/// Adapter operation identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct OpId(pub(crate) u64);

impl Display for OpId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Opaque identifier of a connected central assigned by the radio stack.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct CentralId(pub u64);

impl Display for CentralId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "central#{}", self.0)
    }
}

/// Power and availability state of the radio stack.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum AdapterState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl AdapterState {
    /// Returns whether the stack can no longer complete submitted operations.
    #[inline]
    #[must_use]
    pub const fn is_unavailable(self) -> bool {
        !matches!(self, Self::Unknown | Self::PoweredOn)
    }
}

crate::impl_display_via_debug! { AdapterState }

/// Error reported by the radio stack for a submitted operation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum AdapterError {
    #[error("radio stack error: {0}")]
    Stack(String),
    #[error("radio stack is {0}")]
    Unavailable(AdapterState),
    #[error("timeout while waiting for {0} confirmation")]
    Timeout(Stage),
}

/// Platform Bluetooth LE peripheral-role stack.
///
/// Submission methods must not block. A successful return only means that the
/// operation was accepted; its outcome is delivered later as an [`Event`]
/// tagged with the same [`OpId`]. An error return means that the operation was
/// rejected and no confirmation will follow.
pub trait RadioAdapter: Debug + Send {
    /// Publishes a service to the local GATT database. Confirmed by
    /// [`Event::ServiceAdded`].
    fn add_service(&mut self, op: OpId, svc: &GattService) -> Result<(), AdapterError>;

    /// Starts advertising the specified service. Confirmed by
    /// [`Event::AdvertisingStarted`].
    fn start_advertising(
        &mut self,
        op: OpId,
        svc: Uuid,
        data: &AdvertisementData,
    ) -> Result<(), AdapterError>;

    /// Sends the outcome of a read request back to the requesting central.
    fn respond_to_read(&mut self, req: &ReadRequest, out: ReadOutcome);

    /// Discards an in-flight operation. Any confirmation that still arrives for
    /// it is ignored.
    fn cancel(&mut self, op: OpId);
}

/// Event delivered by the radio stack.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Stack power or availability state changed.
    StateChanged(AdapterState),
    /// Outcome of [`RadioAdapter::add_service`].
    ServiceAdded {
        op: OpId,
        result: Result<(), AdapterError>,
    },
    /// Outcome of [`RadioAdapter::start_advertising`].
    AdvertisingStarted {
        op: OpId,
        result: Result<(), AdapterError>,
    },
    /// Central read a characteristic value.
    ReadRequest(ReadRequest),
    /// Central enabled notifications for a characteristic.
    Subscribe {
        central: CentralId,
        characteristic: Uuid,
    },
    /// Central disabled notifications for a characteristic.
    Unsubscribe {
        central: CentralId,
        characteristic: Uuid,
    },
}
