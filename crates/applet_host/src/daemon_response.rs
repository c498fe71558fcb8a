use anyhow::{Context, Result};

/// Answer of the dispatcher to a control command received on the bus.
#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_more::Display)]
pub enum DaemonResponse {
    Success(String),
    Failure(String),
}

impl DaemonResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, DaemonResponse::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn into_result(self) -> std::result::Result<String, String> {
        match self {
            DaemonResponse::Success(x) => Ok(x),
            DaemonResponse::Failure(x) => Err(x),
        }
    }
}

#[derive(Debug)]
pub struct DaemonResponseSender(tokio::sync::oneshot::Sender<DaemonResponse>);

pub type DaemonResponseReceiver = tokio::sync::oneshot::Receiver<DaemonResponse>;

pub fn create_pair() -> (DaemonResponseSender, DaemonResponseReceiver) {
    let (sender, recv) = tokio::sync::oneshot::channel();
    (DaemonResponseSender(sender), recv)
}

impl DaemonResponseSender {
    pub fn send_success(self, s: String) -> Result<()> {
        self.send(DaemonResponse::Success(s))
    }

    pub fn send_failure(self, s: String) -> Result<()> {
        self.send(DaemonResponse::Failure(s))
    }

    /// Answer with the outcome of an operation, formatting the error chain on failure.
    pub fn respond_with_result<T: std::fmt::Display>(self, result: anyhow::Result<T>) -> Result<()> {
        match result {
            Ok(x) => self.send_success(x.to_string()),
            Err(e) => self.send_failure(format!("{:?}", e)),
        }
    }

    fn send(self, response: DaemonResponse) -> Result<()> {
        self.0.send(response).ok().context("Failed to send response from the dispatcher, the caller is gone")
    }
}
