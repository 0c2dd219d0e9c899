//! Advertising Data (AD) in the length-type-value response data format:
//!
//! * [Vol 3] Part C, Section 11
//! * [Core Specification Supplement] Part A, Section 1
//! * [Assigned Numbers] Section 2.3

use structbuf::{Pack, Packer, StructBuf};
use tracing::warn;

use super::Uuid;

/// Maximum legacy advertising data length ([Vol 6] Part B, Section 2.3.1).
pub const LEGACY_ADV_LEN: usize = 31;

bitflags::bitflags! {
    /// Advertising flags (\[CSS\] Part A, Section 1.3).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct AdvFlag: u8 {
        /// LE Limited Discoverable Mode.
        const LE_LIMITED = 1 << 0;
        /// LE General Discoverable Mode.
        const LE_GENERAL = 1 << 1;
        /// BR/EDR Not Supported.
        const NO_BREDR = 1 << 2;
    }
}

/// Response data types ([Assigned Numbers] Section 2.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, num_enum::IntoPrimitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum ResponseDataType {
    Flags = 0x01,
    IncompleteServiceClass16 = 0x02,
    CompleteServiceClass16 = 0x03,
    IncompleteServiceClass32 = 0x04,
    CompleteServiceClass32 = 0x05,
    IncompleteServiceClass128 = 0x06,
    CompleteServiceClass128 = 0x07,
    ShortLocalName = 0x08,
    CompleteLocalName = 0x09,
}

/// Advertisement announcing the published service to nearby centrals.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AdvertisementData {
    service_uuids: Vec<Uuid>,
    local_name: Option<String>,
}

impl AdvertisementData {
    /// Creates an advertisement for the specified service UUIDs.
    #[inline]
    pub fn new(service_uuids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            service_uuids: service_uuids.into_iter().collect(),
            local_name: None,
        }
    }

    /// Sets the advertised local name.
    #[inline]
    #[must_use]
    pub fn with_local_name(mut self, name: Option<impl Into<String>>) -> Self {
        self.local_name = name.map(Into::into);
        self
    }

    /// Returns the advertised service UUIDs.
    #[inline]
    #[must_use]
    pub fn service_uuids(&self) -> &[Uuid] {
        &self.service_uuids
    }

    /// Returns the advertised local name.
    #[inline]
    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }

    /// Encodes the advertisement as legacy advertising data limited to
    /// [`LEGACY_ADV_LEN`]. Service UUIDs that do not fit are dropped and the
    /// list is marked incomplete. The local name is shortened if necessary,
    /// and omitted entirely if there is no room left after the service UUIDs.
    #[must_use]
    pub fn encode(&self) -> StructBuf {
        let mut ad = ResponseDataMut::new();
        ad.flags(AdvFlag::LE_GENERAL | AdvFlag::NO_BREDR);
        let uuids = Self::fit_uuids(LEGACY_ADV_LEN - ad.len(), &self.service_uuids);
        ad.service_class(uuids.len() == self.service_uuids.len(), &uuids);
        if let Some(name) = self.local_name.as_deref() {
            // Length and type bytes
            let avail = LEGACY_ADV_LEN.saturating_sub(ad.len() + 2);
            if name.len() <= avail {
                ad.local_name(true, name);
            } else if avail > 0 {
                let mut end = avail;
                while !name.is_char_boundary(end) {
                    end -= 1;
                }
                if end > 0 {
                    ad.local_name(false, &name[..end]);
                }
            }
        }
        ad.get()
    }

    /// Returns the longest prefix of `uuids` whose service class fields fit
    /// within `avail` bytes.
    fn fit_uuids(avail: usize, uuids: &[Uuid]) -> Vec<Uuid> {
        let mut groups = [0_usize; 3];
        let mut n = 0;
        for u in uuids {
            let g = match (u.as_u16(), u.as_u32()) {
                (Some(_), _) => 0,
                (_, Some(_)) => 1,
                _ => 2,
            };
            groups[g] += 1;
            let need: usize = (groups.iter().zip([2, 4, 16]))
                .filter(|&(&k, _)| k > 0)
                .map(|(&k, w)| 2 + k * w)
                .sum();
            if need > avail {
                break;
            }
            n += 1;
        }
        uuids[..n].to_vec()
    }
}

/// Response data builder.
#[derive(Clone, Debug)]
pub struct ResponseDataMut(StructBuf);

impl ResponseDataMut {
    /// Creates a new response data buffer.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(StructBuf::new(254)) // [Vol 6] Part B, Section 2.3.4
    }

    /// Returns the current data length.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    /// Returns the final response data buffer.
    #[allow(clippy::missing_const_for_fn)]
    #[inline]
    pub fn get(self) -> StructBuf {
        self.0
    }

    /// Appends service class UUIDs (\[CSS\] Part A, Section 1.1). Each UUID is
    /// encoded in the optimal format and empty groups are omitted.
    pub fn service_class(&mut self, complete: bool, uuids: &[Uuid]) -> &mut Self {
        let typ = u8::from(ResponseDataType::IncompleteServiceClass16) + u8::from(complete);
        let n16 = uuids.iter().filter_map(|u| u.as_u16()).count();
        let n32 = uuids.iter().filter_map(|u| u.as_u32()).count();
        let n128 = uuids.iter().filter_map(|u| u.as_u128()).count();
        self.maybe_put(false, typ, 2 * n16, |b| {
            (uuids.iter().filter_map(|u| u.as_u16())).for_each(|v| {
                b.u16(v);
            });
        });
        self.maybe_put(false, typ + 2, 4 * n32, |b| {
            (uuids.iter().filter_map(|u| u.as_u32())).for_each(|v| {
                b.u32(v);
            });
        });
        self.maybe_put(false, typ + 4, 16 * n128, |b| {
            (uuids.iter().filter_map(|u| u.as_u128())).for_each(|v| {
                b.u128(v);
            });
        })
    }

    /// Appends either shortened or complete local device name
    /// (\[CSS\] Part A, Section 1.2).
    pub fn local_name<T: AsRef<str>>(&mut self, complete: bool, v: T) -> &mut Self {
        let typ = u8::from(ResponseDataType::ShortLocalName) + u8::from(complete);
        let v = v.as_ref().as_bytes();
        self.put(typ, v.len(), |b| {
            b.put(v);
        })
    }

    /// Appends advertising flags (\[CSS\] Part A, Section 1.3).
    pub fn flags(&mut self, v: AdvFlag) -> &mut Self {
        self.put(ResponseDataType::Flags, 1, |b| {
            b.u8(v.bits());
        })
    }

    /// Appends a length-type-data field to the buffer, calling `f` to provide
    /// `n` bytes of data.
    #[inline]
    fn put<T: Into<u8>>(&mut self, typ: T, n: usize, f: impl Fn(&mut Packer)) -> &mut Self {
        self.maybe_put(true, typ, n, f)
    }

    /// Append a length-type-data field to the buffer, calling `f` to provide
    /// `n` bytes of data. If the data is empty and `keep_empty` is `false`,
    /// then nothing gets appended. A field that does not fit in the remaining
    /// space is dropped.
    fn maybe_put<T: Into<u8>>(
        &mut self,
        keep_empty: bool,
        typ: T,
        n: usize,
        f: impl Fn(&mut Packer),
    ) -> &mut Self {
        let typ = typ.into();
        if n == 0 && !keep_empty {
            return self;
        }
        let Some(len) = (n.checked_add(2))
            .filter(|&m| m <= self.0.remaining())
            .and_then(|m| u8::try_from(m - 1).ok())
        else {
            warn!("Dropping {n}-byte response data field {typ:#04X}");
            return self;
        };
        f(self.0.append().put([len, typ]));
        self
    }
}

impl Default for ResponseDataMut {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::gap::uuid;

    use super::*;

    const SERVICE: Uuid = uuid(0x6D8FE6C4_9557_445A_846C_BA502F8997CF);

    #[test]
    fn service_and_name() {
        let ad = AdvertisementData::new([SERVICE]).with_local_name(Some("Chirp"));
        let mut want = vec![
            0x02, // Length of this Data
            0x01, // <Flags>
            0x06, // LE General Discoverable, BR/EDR Not Supported
            0x11, // Length of this Data
            0x07, // <Complete list of 128-bit Service UUIDs>
        ];
        want.extend_from_slice(&SERVICE.to_bytes());
        want.extend_from_slice(&[
            0x06, // Length of this Data
            0x09, // <Complete Local Name>
            b'C', b'h', b'i', b'r', b'p',
        ]);
        assert_eq!(ad.encode().as_ref(), want.as_slice());
    }

    #[test]
    fn sixteen_bit_service() {
        let batt = Uuid::from_u16(0x180F).unwrap();
        let mut ad = ResponseDataMut::new();
        ad.service_class(false, &[batt]);
        let want = &[
            0x03, // Length of this Data
            0x02, // <Incomplete list of 16-bit Service UUIDs>
            0x0F, // Battery Service
            0x18, //
        ];
        assert_eq!(ad.get().as_ref(), want);
    }

    #[test]
    fn shortened_name() {
        let name = "A rather long peripheral name";
        let ad = AdvertisementData::new([SERVICE]).with_local_name(Some(name));
        let b = ad.encode();
        let b = b.as_ref();
        assert_eq!(b.len(), LEGACY_ADV_LEN);
        // Flags (3) + 128-bit UUID list (18)
        assert_eq!(b[21], 9);
        assert_eq!(b[22], u8::from(ResponseDataType::ShortLocalName));
        assert_eq!(&b[23..], &name.as_bytes()[..8]);

        let ad = AdvertisementData::new([SERVICE, SERVICE]).with_local_name(Some(name));
        let b = ad.encode();
        let b = b.as_ref();
        // Second 128-bit UUID does not fit, so the list is incomplete
        assert_eq!(b.len(), LEGACY_ADV_LEN);
        assert_eq!(b[3], 17);
        assert_eq!(b[4], u8::from(ResponseDataType::IncompleteServiceClass128));
        assert_eq!(&b[23..], &name.as_bytes()[..8]);
    }

    #[test]
    fn base_uuid_service() {
        let base = uuid(0x00000000_0000_1000_8000_00805F9B34FB);
        let b = AdvertisementData::new([base]).encode();
        let mut want = vec![0x02, 0x01, 0x06, 0x11, 0x07];
        want.extend_from_slice(&base.to_bytes());
        assert_eq!(b.as_ref(), want.as_slice());
    }

    #[test]
    fn too_many_services() {
        let batt = Uuid::from_u16(0x180F).unwrap();
        let mut uuids = vec![SERVICE; 20];
        uuids.push(batt);
        let ad = AdvertisementData::new(uuids).with_local_name(Some("Chirp"));
        let b = ad.encode();
        let b = b.as_ref();
        // Flags (3) + one 128-bit UUID (18), the rest is dropped
        assert_eq!(b.len(), 3 + 18 + 7);
        assert_eq!(&b[3..5], &[17, 0x06]);
        assert_eq!(&b[5..21], &SERVICE.to_bytes());
        assert_eq!(&b[21..], b"\x06\x09Chirp");

        // Short UUIDs are packed until the limit is reached
        let ad = AdvertisementData::new((1..=20).filter_map(Uuid::from_u16));
        let b = ad.encode();
        assert_eq!(b.len(), 3 + 2 + 13 * 2);
        assert_eq!(b.as_ref()[4], u8::from(ResponseDataType::IncompleteServiceClass16));
    }

    #[test]
    fn oversized_field() {
        let mut ad = ResponseDataMut::new();
        ad.flags(AdvFlag::LE_GENERAL)
            .service_class(true, &[SERVICE; 16])
            .local_name(true, "x".repeat(252));
        // Neither field fits after the flags
        assert_eq!(ad.len(), 3);
        ad.service_class(true, &[SERVICE; 15]);
        assert_eq!(ad.len(), 3 + 2 + 15 * 16);
    }
}
