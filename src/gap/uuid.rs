#![allow(clippy::use_self)]

use std::fmt::{Debug, Display, Formatter};
use std::num::NonZeroU128;
use std::str::FromStr;

const SHIFT: u32 = u128::BITS - u32::BITS;
const BASE: u128 = 0x00000000_0000_1000_8000_00805F9B34FB;
const MASK_16: u128 = !((u16::MAX as u128) << SHIFT);
const MASK_32: u128 = !((u32::MAX as u128) << SHIFT);

/// 16-, 32-, or 128-bit UUID ([Vol 3] Part B, Section 2.5.1).
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Uuid(NonZeroU128);

impl Uuid {
    /// Creates a UUID from a `u128`.
    #[inline]
    #[must_use]
    pub const fn new(v: u128) -> Option<Self> {
        match NonZeroU128::new(v) {
            Some(nz) => Some(Self(nz)),
            None => None,
        }
    }

    /// Creates a UUID from an assigned 16-bit Bluetooth SIG value.
    #[inline]
    #[must_use]
    pub const fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => None,
            v => Self::new((v as u128) << SHIFT | BASE),
        }
    }

    /// Creates a UUID from an assigned 32-bit Bluetooth SIG value.
    #[inline]
    #[must_use]
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => None,
            v => Self::new((v as u128) << SHIFT | BASE),
        }
    }

    /// Converts an assigned 16-bit Bluetooth SIG UUID to `u16`. This is
    /// mutually exclusive with `as_u32` and `as_u128`.
    #[inline]
    #[must_use]
    pub fn as_u16(self) -> Option<u16> {
        #[allow(clippy::cast_possible_truncation)]
        let v = (self.0.get() >> SHIFT) as u16;
        (self.0.get() & MASK_16 == BASE && v > 0).then_some(v)
    }

    /// Converts an assigned 32-bit Bluetooth SIG UUID to `u32`. This is
    /// mutually exclusive with `as_u16` and `as_u128`.
    #[inline]
    #[must_use]
    pub fn as_u32(self) -> Option<u32> {
        let v = (self.0.get() >> SHIFT) as u32;
        (self.0.get() & MASK_32 == BASE && v > u32::from(u16::MAX)).then_some(v)
    }

    /// Converts a UUID without a 16- or 32-bit shorthand to `u128`. This is
    /// mutually exclusive with `as_u16` and `as_u32`, and includes the Base
    /// UUID itself.
    #[inline]
    #[must_use]
    pub fn as_u128(self) -> Option<u128> {
        let v = self.0.get();
        (v & MASK_32 != BASE || v == BASE).then_some(v)
    }

    /// Returns the UUID as a little-endian byte array.
    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.get().to_le_bytes()
    }
}

/// Creates a UUID from a non-zero `u128` constant.
///
/// # Panics
///
/// Panics if `v` is zero.
#[inline]
#[must_use]
pub(crate) const fn uuid(v: u128) -> Uuid {
    match Uuid::new(v) {
        Some(u) => u,
        None => panic!("zero UUID"),
    }
}

impl Debug for Uuid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        #[allow(clippy::cast_possible_truncation)]
        if let Some(v) = self.as_u16() {
            write!(f, "{v:#06X}")
        } else if let Some(v) = self.as_u32() {
            write!(f, "{v:#010X}")
        } else {
            let v = self.0.get();
            write!(
                f,
                "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
                (v >> 96) as u32,
                (v >> 80) as u16,
                (v >> 64) as u16,
                (v >> 48) as u16,
                (v & ((1 << 48) - 1)) as u64
            )
        }
    }
}

impl Display for Uuid {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl From<Uuid> for u128 {
    #[inline]
    fn from(u: Uuid) -> Self {
        u.0.get()
    }
}

/// Error returned when a string is not a valid UUID.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid UUID: {0:?}")]
pub struct ParseUuidError(String);

impl FromStr for Uuid {
    type Err = ParseUuidError;

    /// Parses a UUID in any of the forms produced by `Display`: `0x180F`,
    /// `0x0001180F`, or `6D8FE6C4-9557-445A-846C-BA502F8997CF`. The `0x`
    /// prefix is optional and hex digits are case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseUuidError(s.to_owned());
        let t = (s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))).unwrap_or(s);
        let u = match t.len() {
            4 if is_hex(t) => u16::from_str_radix(t, 16).ok().and_then(Uuid::from_u16),
            8 if is_hex(t) => u32::from_str_radix(t, 16).ok().and_then(Uuid::from_u32),
            36 if t.len() == s.len() => {
                let b = t.as_bytes();
                if [8, 13, 18, 23].iter().any(|&i| b[i] != b'-') {
                    return Err(err());
                }
                let hex: String = t.split('-').collect();
                (hex.len() == 32 && is_hex(&hex))
                    .then(|| u128::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(Uuid::new)
            }
            _ => None,
        };
        u.ok_or_else(err)
    }
}

#[inline]
fn is_hex(s: &str) -> bool {
    s.bytes().all(|c| c.is_ascii_hexdigit())
}

impl serde::Serialize for Uuid {
    #[inline]
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Uuid {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
