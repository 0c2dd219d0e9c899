//! Attribute Protocol ([Vol 3] Part F) error codes and attribute permissions.

pub use {consts::*, perm::*};

mod consts;
mod perm;

/// Maximum attribute value length ([Vol 3] Part F, Section 3.2.9).
pub const MAX_VAL_LEN: usize = 512;
