use anyhow::{Context, Result};
use dock_bus::proxy::LoaderProxy;

use crate::{opts::Action, paths::StartArgs};

/// Ask the running host to start an applet.
pub async fn start_applet(proxy: &LoaderProxy<'_>, forwarder: &str, args: &StartArgs) -> Result<()> {
    let [arg0, parent_app, bus_path, config_file, root_data_dir, share_data_dir] = args.to_args();
    proxy
        .start_applet(forwarder, &arg0, &parent_app, &bus_path, &config_file, &root_data_dir, &share_data_dir)
        .await
        .with_context(|| format!("The applet host failed to start {}", bus_path))
}

/// Run one of the control actions against the running host. Returns what to print.
pub async fn handle_client_action(action: &Action) -> Result<Option<String>> {
    let con = zbus::Connection::session().await.context("Failed to connect to the session bus")?;
    let proxy = LoaderProxy::new(&con).await?;
    log::debug!("Connected to the applet host");
    match action {
        Action::ListServices => Ok(Some(proxy.list_services().await.context("Is the applet host running?")?)),
        Action::StopDock => {
            proxy.stop_dock().await.context("Failed to stop the dock")?;
            Ok(None)
        }
        Action::RestartDock => {
            proxy.restart_dock().await.context("Failed to restart the dock")?;
            Ok(None)
        }
        Action::Daemon { .. } | Action::StartApplet { .. } => Ok(None),
    }
}
