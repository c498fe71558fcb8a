use zbus::proxy;

#[proxy(
    interface = "org.cairodock.AppletHost",
    default_service = "org.cairodock.AppletHost",
    default_path = "/org/cairodock/AppletHost"
)]
trait Loader {
    /// StartApplet method. The first argument is the name of the forwarding executable.
    #[allow(clippy::too_many_arguments)]
    fn start_applet(
        &self,
        forwarder: &str,
        arg0: &str,
        parent_app: &str,
        bus_path: &str,
        config_file: &str,
        root_data_dir: &str,
        share_data_dir: &str,
    ) -> zbus::Result<()>;

    /// ListServices method
    fn list_services(&self) -> zbus::Result<String>;

    /// StopDock method
    fn stop_dock(&self) -> zbus::Result<()>;

    /// RestartDock method
    fn restart_dock(&self) -> zbus::Result<()>;
}
