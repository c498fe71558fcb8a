use derive_more::*;
use ref_cast::RefCast;
use serde::{Deserialize, Serialize};

/// Suffix the dock appends to an applet path to address its sub-icons.
pub const SUB_ICONS_SUFFIX: &str = "/sub_icons";

/// The name of an applet, as the dock launched it.
#[repr(transparent)]
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsRef, From, FromStr, Display, DebugCustom, RefCast)]
#[debug(fmt = "AppletName({})", .0)]
pub struct AppletName(pub String);

impl std::borrow::Borrow<str> for AppletName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AppletName {
    fn from(s: &str) -> Self {
        AppletName(s.to_owned())
    }
}

impl AppletName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The identifier of a sub-icon, unique within its parent applet.
#[repr(transparent)]
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsRef, From, FromStr, Display, DebugCustom, RefCast)]
#[debug(fmt = "SubIconId({})", .0)]
pub struct SubIconId(pub String);

impl std::borrow::Borrow<str> for SubIconId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubIconId {
    fn from(s: &str) -> Self {
        SubIconId(s.to_owned())
    }
}

impl SubIconId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Object path at which the dock signals one applet instance,
/// e.g. `/org/cairodock/CairoDock/Mem`.
#[repr(transparent)]
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize, AsRef, From, Display, DebugCustom, RefCast)]
#[debug(fmt = "BusPath({})", .0)]
pub struct BusPath(pub String);

impl From<&str> for BusPath {
    fn from(s: &str) -> Self {
        BusPath(s.to_owned())
    }
}

impl BusPath {
    pub fn new(root: &str, name: &AppletName) -> Self {
        BusPath(format!("{}/{}", root.trim_end_matches('/'), name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the sub-icons object attached to this applet.
    pub fn sub_icons(&self) -> BusPath {
        BusPath(format!("{}{}", self.0, SUB_ICONS_SUFFIX))
    }

    /// The applet path this path belongs to, dropping a trailing `/sub_icons`.
    pub fn applet_path(&self) -> BusPath {
        BusPath(self.0.strip_suffix(SUB_ICONS_SUFFIX).unwrap_or(&self.0).to_owned())
    }

    /// Extract the applet name, given the root path all applets live under.
    /// Returns `None` when the path is not below `root` or has no name segment.
    pub fn applet_name(&self, root: &str) -> Option<AppletName> {
        let applet_path = self.applet_path();
        let rest = applet_path.0.strip_prefix(root.trim_end_matches('/'))?.strip_prefix('/')?;
        let name = rest.split('/').next().filter(|name| !name.is_empty())?;
        Some(AppletName(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/org/cairodock/CairoDock";

    #[test]
    fn test_applet_name_from_path() {
        assert_eq!(BusPath::from("/org/cairodock/CairoDock/Mem").applet_name(ROOT), Some("Mem".into()));
        assert_eq!(BusPath::from("/org/cairodock/CairoDock/Mem/sub_icons").applet_name(ROOT), Some("Mem".into()));
        assert_eq!(BusPath::from("/org/cairodock/CairoDock").applet_name(ROOT), None);
        assert_eq!(BusPath::from("/org/other/Mem").applet_name(ROOT), None);
    }

    #[test]
    fn test_sub_icons_path_round_trip() {
        let path = BusPath::new(ROOT, &"Clouds".into());
        assert_eq!(path.sub_icons().as_str(), "/org/cairodock/CairoDock/Clouds/sub_icons");
        assert_eq!(path.sub_icons().applet_path(), path);
    }
}
