use tokio::sync::mpsc::UnboundedSender;
use zbus::{fdo, interface};

use crate::{
    daemon_response::{self, DaemonResponse, DaemonResponseSender},
    loader::LoaderCommand,
    paths::StartArgs,
};

/// The host's own bus object. Every call is forwarded to the [`Loader`](crate::loader::Loader)
/// task and answered once it handled it.
#[derive(Debug)]
pub struct LoaderIface {
    commands: UnboundedSender<LoaderCommand>,
}

impl LoaderIface {
    pub fn new(commands: UnboundedSender<LoaderCommand>) -> Self {
        LoaderIface { commands }
    }

    async fn request(&self, make: impl FnOnce(DaemonResponseSender) -> LoaderCommand) -> fdo::Result<String> {
        let (sender, recv) = daemon_response::create_pair();
        self.commands.send(make(sender)).map_err(|_| fdo::Error::Failed("The applet host is shutting down".to_owned()))?;
        match recv.await {
            Ok(DaemonResponse::Success(answer)) => Ok(answer),
            Ok(DaemonResponse::Failure(reason)) => Err(fdo::Error::Failed(reason)),
            Err(_) => Err(fdo::Error::Failed("The applet host dropped the request".to_owned())),
        }
    }
}

#[interface(name = "org.cairodock.AppletHost")]
impl LoaderIface {
    /// StartApplet method. The first argument names the forwarding executable and is only logged.
    #[allow(clippy::too_many_arguments)]
    async fn start_applet(
        &self,
        forwarder: &str,
        arg0: &str,
        parent_app: &str,
        bus_path: &str,
        config_file: &str,
        root_data_dir: &str,
        share_data_dir: &str,
    ) -> fdo::Result<()> {
        log::debug!("StartApplet {} forwarded by {}", bus_path, forwarder);
        let args = StartArgs::from_args(&[arg0, parent_app, bus_path, config_file, root_data_dir, share_data_dir])
            .map_err(|e| fdo::Error::InvalidArgs(e.to_string()))?;
        self.request(|sender| LoaderCommand::StartApplet { args, sender }).await?;
        Ok(())
    }

    /// ListServices method
    async fn list_services(&self) -> fdo::Result<String> {
        self.request(LoaderCommand::ListServices).await
    }

    /// StopDock method
    async fn stop_dock(&self) -> fdo::Result<()> {
        self.request(LoaderCommand::StopDock).await?;
        Ok(())
    }

    /// RestartDock method
    async fn restart_dock(&self) -> fdo::Result<()> {
        self.request(LoaderCommand::RestartDock).await?;
        Ok(())
    }
}
