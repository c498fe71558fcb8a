use std::{collections::BTreeMap, process::Stdio};

use anyhow::{bail, Context, Result};
use nix::unistd::{setpgid, Pid};

use crate::icon::{Icon, WindowAction};

/// Program the desktop uses to open files and locations.
pub const OPEN_COMMAND: &str = "xdg-open";
const SHELL: &str = "/bin/sh";

/// A program or location the user configured for the applet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Command line, or location when `use_open` is set.
    pub name: String,
    /// Window class of the program. Defaults to the program name when monitored.
    pub class: String,
    pub use_open: bool,
    /// The icon controls the windows of the program.
    pub monitored: bool,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Command { name: name.into(), ..Default::default() }
    }

    pub fn monitored(mut self, class: impl Into<String>) -> Self {
        self.monitored = true;
        self.class = class.into();
        self
    }

    pub fn with_open(mut self) -> Self {
        self.use_open = true;
        self
    }

    /// A command from the applet config. Locations (`scheme://...`) are opened, anything else
    /// is run by the shell.
    pub fn from_config(name: &str) -> Self {
        let command = Command::new(name.trim());
        if command.name.contains("://") {
            command.with_open()
        } else {
            command
        }
    }

    /// Program and arguments that start this command.
    pub fn argv(&self) -> Vec<String> {
        if self.use_open {
            vec![OPEN_COMMAND.to_owned(), self.name.clone()]
        } else {
            shell_argv(&self.name)
        }
    }

    /// Start the command, or toggle its window when it is monitored and already open.
    pub async fn launch(&self, icon: &Icon) -> Result<()> {
        if self.monitored && icon.xid().await.unwrap_or_default() > 0 {
            icon.act_on_appli(WindowAction::ToggleVisibility).await?;
            return Ok(());
        }
        if self.name.trim().is_empty() {
            bail!("Empty command for {}", icon.name());
        }

        spawn_detached(&self.argv())
    }
}

/// Arguments running a command line through the shell.
pub(crate) fn shell_argv(line: &str) -> Vec<String> {
    vec![SHELL.to_owned(), "-c".to_owned(), line.to_owned()]
}

/// Run a program in its own process group, without waiting for it.
pub(crate) fn spawn_detached(args: &[String]) -> Result<()> {
    let (program, args) = args.split_first().context("Empty command line")?;
    let mut child = unsafe {
        tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .pre_exec(|| {
                let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                Ok(())
            })
            .spawn()
            .with_context(|| format!("Failed to start {}", program))?
    };
    let program = program.clone();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => log::debug!("{} exited with {}", program, status),
            Err(e) => log::warn!("Failed to wait for {}: {}", program, e),
        }
    });
    Ok(())
}

/// The commands of an applet, by the key the applet gave them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commands(BTreeMap<usize, Command>);

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: usize, command: Command) {
        self.0.insert(key, command);
    }

    pub fn get(&self, key: usize) -> Option<&Command> {
        self.0.get(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Window class the icon should control: the one of the first monitored command, or `none`.
    pub fn find_monitor(&self) -> String {
        self.0
            .values()
            .find(|command| command.monitored)
            .map(|command| if command.class.is_empty() { command.name.clone() } else { command.class.clone() })
            .unwrap_or_else(|| "none".to_owned())
    }
}

impl FromIterator<(usize, Command)> for Commands {
    fn from_iter<T: IntoIterator<Item = (usize, Command)>>(iter: T) -> Self {
        Commands(iter.into_iter().collect())
    }
}
