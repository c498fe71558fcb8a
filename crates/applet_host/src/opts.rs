use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Struct that gets generated from `RawOpt`.
#[derive(Debug, PartialEq, Eq)]
pub struct Opt {
    pub log_debug: bool,
    pub config_path: Option<PathBuf>,
    pub action: Action,
}

#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "applet-host", version, about = "Runs dock applets as one service on the session bus")]
pub struct RawOpt {
    /// Write out debug logs, for the host and every applet.
    #[arg(long = "debug", global = true)]
    log_debug: bool,

    /// Override the configuration directory (the one that contains host.conf).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Subcommand, Debug, PartialEq, Eq, Clone)]
pub enum Action {
    /// Run the host service. This is the default.
    #[command(name = "daemon", alias = "d")]
    Daemon {
        /// Keep running once the last applet stopped.
        #[arg(long)]
        solo: bool,
    },

    /// Start an applet in the running host, starting the host when there is none.
    #[command(name = "start-applet", alias = "start")]
    StartApplet {
        /// The six arguments the dock passes to an applet.
        #[arg(num_args = 6, value_names = ["ARG0", "PARENT_APP", "BUS_PATH", "CONFIG_FILE", "ROOT_DATA_DIR", "SHARE_DATA_DIR"], allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the applets the host knows about and which of them run.
    #[command(name = "list")]
    ListServices,

    /// Ask the dock to quit.
    #[command(name = "stop-dock")]
    StopDock,

    /// Ask the dock to quit and start it again.
    #[command(name = "restart-dock")]
    RestartDock,
}

impl Opt {
    pub fn from_env() -> Self {
        let raw: RawOpt = RawOpt::parse();
        raw.into()
    }
}

impl From<RawOpt> for Opt {
    fn from(other: RawOpt) -> Self {
        let RawOpt { log_debug, config, action } = other;
        Opt { log_debug, config_path: config, action: action.unwrap_or(Action::Daemon { solo: false }) }
    }
}
