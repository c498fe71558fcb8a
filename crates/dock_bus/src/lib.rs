//! Everything that crosses the session bus between the applet host and the dock.
//!
//! The dock signals each applet at its own object path, and the applet answers by calling methods
//! on that same path. This crate only knows how to move those messages around. What they mean is
//! up to the host.

pub mod names;

mod error;
pub use error::*;

mod value;
pub use value::*;

mod event;
pub use event::*;

mod transport;
pub use transport::*;

pub mod proxy;
