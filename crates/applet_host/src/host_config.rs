use std::{path::Path, time::Duration};

use groupconf::{ConfError, KeyStrategy};

use crate::loader::LoaderSettings;

groupconf::conf_group! {
    /// The `[Loader]` group of `host.conf`. Missing keys keep their default.
    #[group = "Loader"]
    pub struct GroupLoader {
        pub tick_millis: u64,
        pub drain_millis: u64,
        pub dock_command: String,
        /// Default of `daemon --solo`.
        pub solo: bool,
    }
}

groupconf::conf_record! {
    pub struct HostConfig {
        pub loader: GroupLoader,
    }
}

impl HostConfig {
    /// Read the host settings. A missing file gives the defaults.
    pub fn read(path: &Path) -> Result<Self, ConfError> {
        if !path.exists() {
            log::debug!("No host config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let bound = groupconf::load::<HostConfig>(path, KeyStrategy::ByBoth)?;
        for err in bound.errors.iter().filter(|err| !matches!(err, ConfError::MissingKey { .. } | ConfError::MissingGroup { .. }))
        {
            log::warn!("{}: {}", path.display(), err);
        }
        Ok(bound.record)
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        let defaults = LoaderSettings::default();
        let loader = &self.loader;
        LoaderSettings {
            tick: if loader.tick_millis > 0 { Duration::from_millis(loader.tick_millis) } else { defaults.tick },
            drain: if loader.drain_millis > 0 { Duration::from_millis(loader.drain_millis) } else { defaults.drain },
            dock_command: if loader.dock_command.trim().is_empty() {
                defaults.dock_command
            } else {
                loader.dock_command.trim().to_owned()
            },
        }
    }
}
