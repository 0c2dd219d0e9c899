use crate::att::Perm;
use crate::gap::Uuid;

bitflags::bitflags! {
    /// Characteristic properties ([Vol 3] Part G, Section 3.3.1.1).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct CharProp: u8 {
        /// Permits reads of the Characteristic Value using procedures defined in Section 4.8.
        const READ = 0x02;
        /// Permits writes of the Characteristic Value with response using procedures defined in
        /// Section 4.9.3 or Section 4.9.4.
        const WRITE = 0x08;
        /// Permits notifications of a Characteristic Value without acknowledgment using the
        /// procedure defined in Section 4.10.
        const NOTIFY = 0x10;
    }
}

/// Characteristic definition and its current value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GattCharacteristic {
    uuid: Uuid,
    props: CharProp,
    perms: Perm,
    value: Option<Vec<u8>>,
}

impl GattCharacteristic {
    /// Creates a characteristic without a value.
    #[inline]
    #[must_use]
    pub const fn new(uuid: Uuid, props: CharProp, perms: Perm) -> Self {
        Self {
            uuid,
            props,
            perms,
            value: None,
        }
    }

    /// Returns the characteristic UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the declared properties.
    #[inline(always)]
    #[must_use]
    pub const fn props(&self) -> CharProp {
        self.props
    }

    /// Returns the attribute permissions of the characteristic value.
    #[inline(always)]
    #[must_use]
    pub const fn perms(&self) -> Perm {
        self.perms
    }

    /// Returns the current value or [`None`] if the value was never set.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    #[inline]
    pub(super) fn set_value(&mut self, v: Option<Vec<u8>>) {
        self.value = v;
    }
}
