//! Well-known names and object paths.

/// Bus name owned by the dock.
pub const DOCK_BUS: &str = "org.cairodock.CairoDock";
/// Interface of the dock object itself (quit, reboot...).
pub const DOCK_INTERFACE: &str = "org.cairodock.CairoDock";
/// Object path of the dock. Every applet lives below it.
pub const DOCK_ROOT_PATH: &str = "/org/cairodock/CairoDock";

pub const APPLET_INTERFACE: &str = "org.cairodock.CairoDock.applet";
pub const SUB_APPLET_INTERFACE: &str = "org.cairodock.CairoDock.subapplet";

/// Bus name claimed by the applet host, so a second instance can forward its requests.
pub const LOADER_BUS: &str = "org.cairodock.AppletHost";
pub const LOADER_PATH: &str = "/org/cairodock/AppletHost";
pub const LOADER_INTERFACE: &str = "org.cairodock.AppletHost";
