use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dock_shared_util::{AppletName, BusPath};

/// Locations of the host's own files.
#[derive(Debug, Clone)]
pub struct HostPaths {
    pub config_dir: PathBuf,
}

impl HostPaths {
    pub fn from_config_dir<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        if config_dir.is_file() {
            bail!("Please provide the path to the config directory, not a file within it")
        }
        Ok(HostPaths { config_dir: config_dir.to_path_buf() })
    }

    pub fn default() -> Result<Self> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => PathBuf::from(std::env::var("HOME").context("Neither XDG_CONFIG_HOME nor HOME is set")?).join(".config"),
        };
        Self::from_config_dir(config_dir.join("applet-host"))
    }

    pub fn get_config_dir(&self) -> &Path {
        self.config_dir.as_path()
    }

    /// `host.conf`, which does not have to exist.
    pub fn get_host_config_file(&self) -> PathBuf {
        self.config_dir.join("host.conf")
    }
}

impl std::fmt::Display for HostPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "config-dir: {}", self.config_dir.display())
    }
}

/// The six arguments the dock starts an applet with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartArgs {
    /// Unused, kept so the arguments line up with what the dock sends.
    pub reserved: String,
    pub parent_app: String,
    pub bus_path: BusPath,
    pub config_file: PathBuf,
    pub root_data_dir: PathBuf,
    pub share_data_dir: PathBuf,
}

impl StartArgs {
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let [reserved, parent_app, bus_path, config_file, root_data_dir, share_data_dir] = args else {
            bail!("Expected 6 startup arguments, got {}", args.len());
        };
        Ok(StartArgs {
            reserved: reserved.as_ref().to_owned(),
            parent_app: parent_app.as_ref().to_owned(),
            bus_path: BusPath::from(bus_path.as_ref()),
            config_file: PathBuf::from(config_file.as_ref()),
            root_data_dir: PathBuf::from(root_data_dir.as_ref()),
            share_data_dir: PathBuf::from(share_data_dir.as_ref()),
        })
    }

    pub fn to_args(&self) -> [String; 6] {
        [
            self.reserved.clone(),
            self.parent_app.clone(),
            self.bus_path.to_string(),
            self.config_file.display().to_string(),
            self.root_data_dir.display().to_string(),
            self.share_data_dir.display().to_string(),
        ]
    }
}

/// Files of one applet instance. Fixed for the life of the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppletPaths {
    pub name: AppletName,
    pub bus_path: BusPath,
    pub parent_app: String,
    pub config_file: PathBuf,
    pub root_data_dir: PathBuf,
    pub share_data_dir: PathBuf,
}

impl AppletPaths {
    pub fn new(name: AppletName, args: StartArgs) -> Self {
        AppletPaths {
            name,
            bus_path: args.bus_path,
            parent_app: args.parent_app,
            config_file: args.config_file,
            root_data_dir: args.root_data_dir,
            share_data_dir: args.share_data_dir,
        }
    }

    /// Resolve a resource path. Relative paths are taken from the share directory.
    pub fn share_file(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.share_data_dir.join(path)
        }
    }

    pub fn default_icon(&self) -> PathBuf {
        self.share_data_dir.join("icon")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.share_data_dir.join("templates")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_start_args() {
        let args = ["x", "cairo-dock", "/org/cairodock/CairoDock/Mem", "/c/Mem.conf", "/c", "/s"];
        let parsed = StartArgs::from_args(&args).unwrap();
        assert_eq!(parsed.bus_path, BusPath::from("/org/cairodock/CairoDock/Mem"));
        assert_eq!(parsed.to_args().to_vec(), args.to_vec());
        assert!(StartArgs::from_args(&args[1..]).is_err());
    }

    #[test]
    fn test_share_file() {
        let paths = AppletPaths::new("Mem".into(), StartArgs::from_args(&["", "", "/p/Mem", "", "/r", "/s"]).unwrap());
        assert_eq!(paths.share_file("img/a.svg"), PathBuf::from("/s/img/a.svg"));
        assert_eq!(paths.share_file("/abs/a.svg"), PathBuf::from("/abs/a.svg"));
        assert_eq!(paths.default_icon(), PathBuf::from("/s/icon"));
    }
}
