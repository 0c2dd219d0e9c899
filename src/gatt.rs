//! Generic Attribute Profile ([Vol 3] Part G) server role.

pub use {characteristic::*, io::*, server::*, service::*};

mod characteristic;
mod io;
mod server;
mod service;
