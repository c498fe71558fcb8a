use std::sync::Arc;

use anyhow::{Context, Result};
use dock_bus::{names, ZbusTransport};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_util::task::TaskTracker;

use crate::{
    applet::AppletRegistry,
    application_lifecycle::AppExit,
    client,
    daemon_response,
    host_config::HostConfig,
    lifecycle::AppletManager,
    loader::{Loader, LoaderCommand},
    loader_iface::LoaderIface,
    paths::{HostPaths, StartArgs},
};

/// Exit code when `--solo` was asked but another host owns the service name.
pub const EXIT_NAME_TAKEN: i32 = 2;

/// How the process should end once the daemon returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonOutcome {
    /// This process owned the service and served until exit.
    Served,
    /// Another host owns the service. The request, if any, was forwarded to it.
    Forwarded,
    NameTaken,
}

impl DaemonOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            DaemonOutcome::Served | DaemonOutcome::Forwarded => 0,
            DaemonOutcome::NameTaken => EXIT_NAME_TAKEN,
        }
    }
}

/// Claim the host's bus name and serve until exit. When another host has it, forward
/// `initial` to that one instead.
pub async fn run_daemon(
    paths: &HostPaths,
    config: &HostConfig,
    initial: Option<StartArgs>,
    solo: bool,
    debug: bool,
    forwarder: &str,
) -> Result<DaemonOutcome> {
    log::info!("Loading paths: {}", paths);
    let con = zbus::Connection::session().await.context("Failed to connect to the session bus")?;

    let (command_send, command_recv) = unbounded_channel();
    con.object_server()
        .at(names::LOADER_PATH, LoaderIface::new(command_send.clone()))
        .await
        .context("Failed to serve the host object")?;

    let flags = [zbus::fdo::RequestNameFlags::DoNotQueue];
    match con.request_name_with_flags(names::LOADER_BUS, flags.into_iter().collect()).await {
        Ok(zbus::fdo::RequestNameReply::PrimaryOwner) => {}
        Ok(_) | Err(zbus::Error::NameTaken) if solo => {
            log::error!("{} is already owned by another applet host", names::LOADER_BUS);
            return Ok(DaemonOutcome::NameTaken);
        }
        Ok(_) | Err(zbus::Error::NameTaken) => {
            match initial {
                Some(args) => {
                    log::info!("An applet host is already running, forwarding {}", args.bus_path);
                    let proxy = dock_bus::proxy::LoaderProxy::new(&con).await?;
                    client::start_applet(&proxy, forwarder, &args).await?;
                }
                None => log::info!("An applet host is already running"),
            }
            return Ok(DaemonOutcome::Forwarded);
        }
        Err(e) => return Err(e).context("Failed to claim the applet host name"),
    }

    let exit = AppExit::new();
    simple_signal::set_handler(&[simple_signal::Signal::Int, simple_signal::Signal::Term], {
        let exit = exit.clone();
        move |_| {
            log::info!("Shutting down the applet host...");
            if let Err(e) = exit.send_exit() {
                log::error!("Failed to send application shutdown event to workers: {:?}", e);
                std::process::exit(1);
            }
        }
    });

    let events = dock_bus::dock_events(&con).await.context("Failed to subscribe to dock signals")?;
    let transport = Arc::new(ZbusTransport::new(con.clone()));
    let tracker = TaskTracker::new();
    let settings = config.loader_settings();
    let (restart_send, restart_recv) = unbounded_channel();
    let manager = AppletManager::new(AppletRegistry::builtin(), transport.clone(), tracker.clone(), settings.tick, restart_send, debug);

    if let Some(args) = initial {
        send_initial_start(&command_send, args);
    }

    Loader::new(manager, transport, tracker, exit, settings).run(events, command_recv, restart_recv).await;
    log::info!("Applet host finished");
    Ok(DaemonOutcome::Served)
}

fn send_initial_start(commands: &UnboundedSender<LoaderCommand>, args: StartArgs) {
    let (sender, recv) = daemon_response::create_pair();
    if commands.send(LoaderCommand::StartApplet { args, sender }).is_err() {
        return;
    }
    tokio::spawn(async move {
        match recv.await {
            Ok(response) if response.is_failure() => log::error!("Failed to start the first applet: {}", response),
            Ok(_) => {}
            Err(_) => log::warn!("The first applet start was never answered"),
        }
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DaemonOutcome::Served.exit_code(), 0);
        assert_eq!(DaemonOutcome::Forwarded.exit_code(), 0);
        assert_eq!(DaemonOutcome::NameTaken.exit_code(), 2);
    }
}
