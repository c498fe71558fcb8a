//! Client side of the host's own bus service, used by the command line to reach a running host.

mod loader;
pub use loader::*;
