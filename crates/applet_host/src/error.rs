use dock_shared_util::AppletName;
use thiserror::Error;

/// Failures of the runtime itself. Applet code reports its own failures as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(#[from] groupconf::ConfError),

    #[error(transparent)]
    Transport(#[from] dock_bus::TransportError),

    #[error("No {kind} named {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Applet {0} is busy")]
    Busy(AppletName),

    #[error("{0}")]
    Lifecycle(String),

    #[error("Data renderer: {0}")]
    Renderer(String),
}

impl HostError {
    pub fn not_found(kind: &'static str, name: impl ToString) -> Self {
        HostError::NotFound { kind, name: name.to_string() }
    }

    /// Whether this error only means the dock connection is gone.
    pub fn is_closed(&self) -> bool {
        matches!(self, HostError::Transport(dock_bus::TransportError::Closed))
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;
