use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::att::{ErrorCode, Perm, MAX_VAL_LEN};
use crate::gap::Uuid;
use crate::radio::CentralId;
use crate::{Error, Result};

use super::*;

/// GATT server exposing one primary service with a single readable and
/// notifiable characteristic.
#[derive(Debug)]
pub struct GattServer {
    svc_uuid: Uuid,
    char_uuid: Uuid,
    svc: Option<GattService>,
    subscribers: BTreeSet<CentralId>,
}

impl GattServer {
    /// Creates a server for the specified service and characteristic UUIDs.
    /// The service itself is defined by [`Self::create`].
    #[inline]
    #[must_use]
    pub const fn new(svc_uuid: Uuid, char_uuid: Uuid) -> Self {
        Self {
            svc_uuid,
            char_uuid,
            svc: None,
            subscribers: BTreeSet::new(),
        }
    }

    /// Defines the service structure. Calling this again returns the existing
    /// service without rebuilding it.
    pub fn create(&mut self) -> &GattService {
        if self.svc.is_some() {
            debug!("Service {} already exists", self.svc_uuid);
        }
        let (svc_uuid, char_uuid) = (self.svc_uuid, self.char_uuid);
        self.svc.get_or_insert_with(|| {
            debug!("Creating service {svc_uuid} with characteristic {char_uuid}");
            let props = CharProp::READ | CharProp::NOTIFY;
            let ch = GattCharacteristic::new(char_uuid, props, Perm::READ);
            GattService::primary(svc_uuid, [ch])
        })
    }

    /// Returns the service if it was created.
    #[inline]
    #[must_use]
    pub const fn service(&self) -> Option<&GattService> {
        self.svc.as_ref()
    }

    /// Returns the characteristic if the service was created.
    #[inline]
    #[must_use]
    pub fn characteristic(&self) -> Option<&GattCharacteristic> {
        (self.svc.as_ref()).and_then(|s| s.characteristic(self.char_uuid))
    }

    /// Validates and answers a read request. The first failed check determines
    /// the error: unknown characteristic, missing value or read permission,
    /// and finally an offset past the end of the value.
    pub fn handle_read_request(&self, req: &ReadRequest) -> ReadOutcome {
        let Some(ch) = self.characteristic().filter(|ch| ch.uuid() == req.uuid()) else {
            warn!("Read request for unknown characteristic {}", req.uuid());
            return Err(ErrorCode::InvalidHandle);
        };
        let Some(v) = ch.value() else {
            debug!("No value for characteristic {}", ch.uuid());
            return Err(ErrorCode::ReadNotPermitted);
        };
        ch.perms().test(Perm::READ)?;
        req.complete(v).map_err(|e| {
            warn!(
                "Read offset {} is past the end of {} ({} bytes)",
                req.offset(),
                ch.uuid(),
                v.len()
            );
            e
        })
    }

    /// Replaces the characteristic value.
    pub fn set_value(&mut self, v: impl Into<Vec<u8>>) -> Result<()> {
        let v = v.into();
        if v.len() > MAX_VAL_LEN {
            return Err(Error::Att(ErrorCode::InvalidAttributeValueLength));
        }
        self.update(Some(v))
    }

    /// Removes the characteristic value, making it unreadable.
    #[inline]
    pub fn clear_value(&mut self) -> Result<()> {
        self.update(None)
    }

    fn update(&mut self, v: Option<Vec<u8>>) -> Result<()> {
        let char_uuid = self.char_uuid;
        let ch = (self.svc.as_mut())
            .and_then(|s| s.characteristic_mut(char_uuid))
            .ok_or(Error::NotCreated)?;
        debug!(
            "Characteristic {char_uuid} value: {:?}",
            v.as_ref().map(Vec::len)
        );
        ch.set_value(v);
        Ok(())
    }

    /// Records a notification subscription. Returns `false` if the
    /// characteristic is unknown or the central was already subscribed.
    pub fn subscribe(&mut self, central: CentralId, uuid: Uuid) -> bool {
        if !self.is_notifiable(uuid) {
            warn!("{central} subscribed to unknown characteristic {uuid}");
            return false;
        }
        debug!("{central} subscribed to {uuid}");
        self.subscribers.insert(central)
    }

    /// Removes a notification subscription. Returns `false` if the central was
    /// not subscribed.
    pub fn unsubscribe(&mut self, central: CentralId, uuid: Uuid) -> bool {
        if uuid != self.char_uuid {
            warn!("{central} unsubscribed from unknown characteristic {uuid}");
            return false;
        }
        debug!("{central} unsubscribed from {uuid}");
        self.subscribers.remove(&central)
    }

    /// Returns the centrals subscribed to the characteristic.
    #[inline]
    pub fn subscribers(&self) -> impl ExactSizeIterator<Item = CentralId> + '_ {
        self.subscribers.iter().copied()
    }

    fn is_notifiable(&self, uuid: Uuid) -> bool {
        self.characteristic()
            .map_or(false, |ch| ch.uuid() == uuid && ch.props().contains(CharProp::NOTIFY))
    }
}
