use super::ErrorCode;

bitflags::bitflags! {
    /// Attribute permissions ([Vol 3] Part F, Section 3.2.5).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[must_use]
    #[repr(transparent)]
    pub struct Perm: u8 {
        /// Read access.
        const READ = 1 << 0;
        /// Write access.
        const WRITE = 1 << 1;
        /// Read/write access.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Perm {
    /// Tests whether an access request should be allowed.
    pub const fn test(self, req: Self) -> Result<(), ErrorCode> {
        use ErrorCode::*;
        // Read/write access must be a superset of the request
        let want = req.intersection(Self::READ_WRITE);
        let fail = want.difference(self);
        if want.is_empty() {
            Err(RequestNotSupported)
        } else if fail.contains(Self::READ) {
            Err(ReadNotPermitted)
        } else if fail.contains(Self::WRITE) {
            Err(WriteNotPermitted)
        } else {
            Ok(())
        }
    }
}
