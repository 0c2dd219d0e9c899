use crate::gap::Uuid;

use super::GattCharacteristic;

/// Service definition. The structure is fixed once the service is created;
/// only characteristic values change afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GattService {
    uuid: Uuid,
    primary: bool,
    chars: Vec<GattCharacteristic>,
}

impl GattService {
    /// Creates a primary service.
    #[inline]
    #[must_use]
    pub fn primary(uuid: Uuid, chars: impl IntoIterator<Item = GattCharacteristic>) -> Self {
        Self {
            uuid,
            primary: true,
            chars: chars.into_iter().collect(),
        }
    }

    /// Returns the service UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns whether this is a primary service.
    #[inline(always)]
    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.primary
    }

    /// Returns the service characteristics.
    #[inline]
    #[must_use]
    pub fn characteristics(&self) -> &[GattCharacteristic] {
        &self.chars
    }

    /// Returns the characteristic with the specified UUID.
    #[inline]
    #[must_use]
    pub fn characteristic(&self, uuid: Uuid) -> Option<&GattCharacteristic> {
        self.chars.iter().find(|c| c.uuid() == uuid)
    }

    #[inline]
    pub(super) fn characteristic_mut(&mut self, uuid: Uuid) -> Option<&mut GattCharacteristic> {
        self.chars.iter_mut().find(|c| c.uuid() == uuid)
    }
}
