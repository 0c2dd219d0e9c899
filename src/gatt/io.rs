use std::fmt::{Display, Formatter};

use crate::att::ErrorCode;
use crate::gap::Uuid;
use crate::radio::CentralId;

/// Read request result. The value is the suffix of the characteristic value
/// starting at the requested offset.
pub type ReadOutcome = std::result::Result<Vec<u8>, ErrorCode>;

/// Radio stack identifier of a pending request, used to route the response.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct RequestId(pub u64);

impl Display for RequestId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Characteristic value read request from a central.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadRequest {
    id: RequestId,
    central: CentralId,
    uuid: Uuid,
    off: usize,
}

impl ReadRequest {
    /// Creates a new read request.
    #[inline]
    #[must_use]
    pub const fn new(id: RequestId, central: CentralId, uuid: Uuid, off: usize) -> Self {
        Self {
            id,
            central,
            uuid,
            off,
        }
    }

    /// Returns the request identifier.
    #[inline(always)]
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the requesting central.
    #[inline(always)]
    #[must_use]
    pub const fn central(&self) -> CentralId {
        self.central
    }

    /// Returns the characteristic UUID.
    #[inline(always)]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the value offset.
    #[inline(always)]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.off
    }

    /// Provides the complete attribute value with automatic offset handling. An
    /// offset equal to the value length produces an empty response.
    #[inline]
    pub fn complete(&self, v: impl AsRef<[u8]>) -> ReadOutcome {
        (v.as_ref().get(self.offset()..))
            .map(<[u8]>::to_vec)
            .ok_or(ErrorCode::InvalidOffset)
    }
}
