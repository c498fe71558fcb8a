use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Dbus connection error")]
    Dbus(#[from] zbus::Error),
    #[error("The connection to the dock was closed")]
    Closed,
    #[error("Could not decode arguments of {member}: {reason}")]
    Decode { member: String, reason: String },
    #[error("The dock rejected {member}: {reason}")]
    Rejected { member: String, reason: String },
}

impl TransportError {
    pub fn decode(member: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        TransportError::Decode { member: member.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
