//! The dispatcher task of the host.
//!
//! Everything that changes the set of running applets goes through [`Loader::run`]: dock signals,
//! control commands coming in on the host's own bus name, poller restarts and the poller clock.
//! Applet callbacks never run here. They are spawned on the shared task tracker.

use std::{sync::Arc, time::Duration};

use dock_bus::{DockTransport, EventDescriptor, MethodCall};
use dock_shared_util::AppletName;
use futures::{Stream, StreamExt};
use tokio::{sync::mpsc::UnboundedReceiver, time::MissedTickBehavior};
use tokio_util::task::TaskTracker;

use crate::{
    application_lifecycle::AppExit,
    commands::{shell_argv, spawn_detached},
    daemon_response::DaemonResponseSender,
    lifecycle::AppletManager,
    loop_select_exiting,
    paths::StartArgs,
    router::{self, RouteOutcome},
};

/// Control requests, each answered through its sender.
#[derive(Debug)]
pub enum LoaderCommand {
    StartApplet { args: StartArgs, sender: DaemonResponseSender },
    ListServices(DaemonResponseSender),
    StopDock(DaemonResponseSender),
    RestartDock(DaemonResponseSender),
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub tick: Duration,
    /// How long running callbacks may take to finish once the host exits.
    pub drain: Duration,
    /// Command line starting the dock again after a restart request.
    pub dock_command: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        LoaderSettings {
            tick: Duration::from_secs(1),
            drain: Duration::from_secs(2),
            dock_command: "cairo-dock".to_owned(),
        }
    }
}

pub struct Loader {
    manager: AppletManager,
    transport: Arc<dyn DockTransport>,
    tracker: TaskTracker,
    exit: AppExit,
    settings: LoaderSettings,
    /// The dock was asked to restart. Its applets going away must not end the host.
    restarting: bool,
}

impl Loader {
    pub fn new(
        manager: AppletManager,
        transport: Arc<dyn DockTransport>,
        tracker: TaskTracker,
        exit: AppExit,
        settings: LoaderSettings,
    ) -> Self {
        Loader { manager, transport, tracker, exit, settings, restarting: false }
    }

    /// Serve until the exit is requested or the last applet stops, then drain and close the dock
    /// connection.
    pub async fn run(
        mut self,
        events: impl Stream<Item = EventDescriptor>,
        mut commands: UnboundedReceiver<LoaderCommand>,
        mut restarts: UnboundedReceiver<AppletName>,
    ) {
        let mut events = std::pin::pin!(events);
        let mut interval = tokio::time::interval(self.settings.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("Applet host ready, ticking every {:?}", self.settings.tick);
        loop_select_exiting!(self.exit,
            _ = interval.tick() => {
                self.manager.tick();
            }
            Some(event) = events.next() => {
                self.handle_event(event);
            }
            Some(command) = commands.recv() => {
                self.handle_command(command).await;
            }
            Some(name) = restarts.recv() => {
                self.manager.restart_poller(&name);
            }
        );
        self.shutdown().await;
    }

    fn handle_event(&mut self, event: EventDescriptor) {
        if let RouteOutcome::Stop(name) = router::route(&self.manager, event) {
            crate::print_result_err!("stopping applet", self.manager.stop(&name));
            self.exit_when_idle();
        }
    }

    fn exit_when_idle(&self) {
        if self.manager.is_empty() && !self.restarting {
            log::info!("No applet left, exiting");
            crate::print_result_err!("sending exit", self.exit.send_exit());
        }
    }

    async fn handle_command(&mut self, command: LoaderCommand) {
        log::debug!("Handling command {:?}", command);
        let result = match command {
            LoaderCommand::StartApplet { args, sender } => {
                self.restarting = false;
                let result = self.manager.spawn(args).await.map(|name| format!("Started {}", name));
                sender.respond_with_result(result.map_err(anyhow::Error::from))
            }
            LoaderCommand::ListServices(sender) => {
                let services = self.manager.list_services();
                log::info!("{}", services);
                sender.send_success(services)
            }
            LoaderCommand::StopDock(sender) => {
                let result = self.quit_dock().await;
                sender.respond_with_result(result.map(|()| "Dock stopped"))
            }
            LoaderCommand::RestartDock(sender) => {
                self.restarting = true;
                let result = self.restart_dock().await;
                if result.is_err() {
                    self.restarting = false;
                }
                sender.respond_with_result(result.map(|()| "Dock restarted"))
            }
        };
        crate::print_result_err!("answering command", result);
    }

    async fn quit_dock(&self) -> anyhow::Result<()> {
        self.transport.call(MethodCall::dock("Quit")).await?;
        Ok(())
    }

    async fn restart_dock(&self) -> anyhow::Result<()> {
        self.quit_dock().await?;
        log::info!("Starting the dock again: {}", self.settings.dock_command);
        spawn_detached(&shell_argv(&self.settings.dock_command))
    }

    async fn shutdown(mut self) {
        log::info!("Shutting down the applet host");
        self.manager.stop_all();
        self.tracker.close();
        if tokio::time::timeout(self.settings.drain, self.tracker.wait()).await.is_err() {
            log::warn!("Some applet callbacks were still running after {:?}", self.settings.drain);
        }
        self.transport.close();
    }
}
