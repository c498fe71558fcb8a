//! Applets shipped with the host. See [`crate::applet::AppletRegistry::builtin`].

pub mod mem;
