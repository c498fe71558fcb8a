//! Memory usage on the icon: RAM and swap, as a gauge or as text.

use std::{
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use futures::future::BoxFuture;
use groupconf::KeyStrategy;
use sysinfo::System;

use crate::{
    actions::Action,
    applet::{Applet, AppletContext, Defaults, Events, Handler},
    commands::{Command, Commands},
    icon::{DialogData, RendererKind},
    menu::Menu,
    poller::PollerSpec,
};

const ACTION_SHOW_INFO: usize = 1;
const ACTION_OPEN_MONITOR: usize = 2;

const COMMAND_LEFT: usize = 0;
const COMMAND_MIDDLE: usize = 1;

const DEFAULT_MONITOR: &str = "gnome-system-monitor";
const DEFAULT_GAUGE: &str = "Turbo-night-fuel";

groupconf::conf_group! {
    #[group = "Icon"]
    pub struct GroupIcon {
        #[conf = "icon"]
        pub icon: String,
        #[conf = "name"]
        pub name: String,
        #[conf = "debug"]
        pub debug: bool,
    }
}

groupconf::conf_group! {
    #[group = "Configuration"]
    pub struct GroupConfiguration {
        /// 0 nothing, 1 quick-info, 2 label.
        #[conf = "DisplayText"]
        pub display_text: i32,
        /// 0 nothing, 1 gauge.
        #[conf = "DisplayValues"]
        pub display_values: i32,
        #[conf = "GaugeName"]
        pub gauge_name: String,
        /// Counted in `update_delay_unit`.
        #[conf = "UpdateDelay"]
        pub update_delay: groupconf::Duration,
        /// `s`, `m` or `h`. Seconds when unset.
        #[conf = "UpdateDelayUnit"]
        pub update_delay_unit: String,
        #[conf = "ShowRAM"]
        pub show_ram: bool,
        #[conf = "ShowSwap"]
        pub show_swap: bool,
    }
}

groupconf::conf_group! {
    #[group = "Actions"]
    pub struct GroupActions {
        /// 0 nothing, 1 info dialog, 2 command.
        #[conf = "LeftAction"]
        pub left_action: i32,
        #[conf = "LeftCommand"]
        pub left_command: String,
        #[conf = "LeftClass"]
        pub left_class: String,
        #[conf = "MiddleAction"]
        pub middle_action: i32,
        #[conf = "MiddleCommand"]
        pub middle_command: String,
    }
}

groupconf::conf_record! {
    pub struct MemConf {
        pub icon: GroupIcon,
        pub configuration: GroupConfiguration,
        pub actions: GroupActions,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(i32)]
enum TextDisplay {
    None = 0,
    QuickInfo = 1,
    Label = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(i32)]
enum ClickAction {
    None = 0,
    ShowInfo = 1,
    Command = 2,
}

/// Memory figures in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MemStats {
    pub ram_used: u64,
    pub ram_total: u64,
    pub swap_used: u64,
    pub swap_total: u64,
}

impl MemStats {
    fn read(system: &mut System) -> Self {
        system.refresh_memory();
        let ram_total = system.total_memory();
        let swap_total = system.total_swap();
        MemStats {
            ram_used: ram_total.saturating_sub(system.available_memory()),
            ram_total,
            swap_used: swap_total.saturating_sub(system.free_swap()),
            swap_total,
        }
    }

    pub fn ram_ratio(&self) -> f64 {
        ratio(self.ram_used, self.ram_total)
    }

    pub fn swap_ratio(&self) -> f64 {
        ratio(self.swap_used, self.swap_total)
    }
}

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64).clamp(0.0, 1.0)
    }
}

fn gigabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

impl GroupConfiguration {
    /// Ratios to draw, in renderer order.
    fn values(&self, stats: &MemStats) -> Vec<f64> {
        let mut values = Vec::new();
        if self.show_ram {
            values.push(stats.ram_ratio());
        }
        if self.show_swap {
            values.push(stats.swap_ratio());
        }
        values
    }

    fn short_text(&self, stats: &MemStats) -> String {
        let mut parts = Vec::new();
        if self.show_ram {
            parts.push(format!("{:.0}%", stats.ram_ratio() * 100.0));
        }
        if self.show_swap {
            parts.push(format!("{:.0}%", stats.swap_ratio() * 100.0));
        }
        parts.join("\n")
    }
}

fn info_text(stats: &MemStats) -> String {
    format!(
        "Memory: {:.1} GB used of {:.1} GB ({:.0}%)\nSwap: {:.1} GB used of {:.1} GB ({:.0}%)",
        gigabytes(stats.ram_used),
        gigabytes(stats.ram_total),
        stats.ram_ratio() * 100.0,
        gigabytes(stats.swap_used),
        gigabytes(stats.swap_total),
        stats.swap_ratio() * 100.0,
    )
}

pub struct MemApplet {
    ctx: AppletContext,
    conf: RwLock<MemConf>,
    system: Mutex<System>,
    last: Mutex<MemStats>,
}

impl MemApplet {
    pub fn create(ctx: AppletContext) -> anyhow::Result<Arc<dyn Applet>> {
        Ok(Arc::new(MemApplet {
            ctx,
            conf: RwLock::default(),
            system: Mutex::new(System::new()),
            last: Mutex::default(),
        }))
    }

    fn conf(&self) -> MemConf {
        self.conf.read().unwrap().clone() // unwrap: lock poisoning is okay
    }

    async fn poll(&self) {
        let stats = {
            let mut system = self.system.lock().unwrap(); // unwrap: lock poisoning is okay
            MemStats::read(&mut system)
        };
        self.show(stats).await;
    }

    /// Draw the stats the way the config asks.
    async fn show(&self, stats: MemStats) {
        *self.last.lock().unwrap() = stats; // unwrap: lock poisoning is okay
        let conf = self.conf().configuration;
        let icon = &self.ctx.icon;
        let log = &self.ctx.log;

        if conf.display_values > 0 {
            log.err(icon.render_values(&conf.values(&stats)).await, "Failed to render values");
        }
        match TextDisplay::from_repr(conf.display_text) {
            Some(TextDisplay::QuickInfo) => log.err(icon.set_quick_info(&conf.short_text(&stats)).await, "Failed to set quick-info"),
            Some(TextDisplay::Label) => {
                let label = info_text(&stats).replace('\n', " - ");
                log.err(icon.set_label(&label).await, "Failed to set label")
            }
            Some(TextDisplay::None) | None => false,
        };
        log.debug(format_args!("RAM {:.2} swap {:.2}", stats.ram_ratio(), stats.swap_ratio()));
    }

    async fn show_info(&self) {
        let stats = *self.last.lock().unwrap(); // unwrap: lock poisoning is okay
        let dialog = DialogData { message: info_text(&stats), time_length: 8, ..Default::default() };
        self.ctx.log.err(self.ctx.icon.popup_dialog(dialog).await, "Failed to show the info dialog");
    }

    async fn open_monitor(&self) {
        self.ctx.log.err(self.ctx.launch_command(COMMAND_LEFT).await, "Failed to open the system monitor");
    }

    async fn on_click(&self, action: i32, command: usize) {
        match ClickAction::from_repr(action) {
            Some(ClickAction::ShowInfo) => self.show_info().await,
            Some(ClickAction::Command) => {
                self.ctx.log.err(self.ctx.launch_command(command).await, "Failed to launch the command");
            }
            Some(ClickAction::None) | None => {}
        }
    }
}

impl Applet for MemApplet {
    fn define_events(self: Arc<Self>, events: &mut Events) {
        let show_info = {
            let applet = self.clone();
            Handler::new(move |()| {
                let applet = applet.clone();
                async move { applet.show_info().await }
            })
        };
        let open_monitor = {
            let applet = self.clone();
            Handler::new(move |()| {
                let applet = applet.clone();
                async move { applet.open_monitor().await }
            })
        };
        self.ctx.log.err(
            self.ctx.actions.add([
                Action::new(ACTION_SHOW_INFO, "Memory info", show_info).icon("dialog-information"),
                Action::new(ACTION_OPEN_MONITOR, "Open system monitor", open_monitor).icon("utilities-system-monitor"),
            ]),
            "Failed to register actions",
        );

        events.on_click = Some(Handler::new({
            let applet = self.clone();
            move |_state: i32| {
                let applet = applet.clone();
                async move {
                    let action = applet.conf().actions.left_action;
                    applet.on_click(action, COMMAND_LEFT).await
                }
            }
        }));
        events.on_middle_click = Some(Handler::new({
            let applet = self.clone();
            move |()| {
                let applet = applet.clone();
                async move {
                    let action = applet.conf().actions.middle_action;
                    applet.on_click(action, COMMAND_MIDDLE).await
                }
            }
        }));
        events.on_build_menu = Some(Arc::new({
            let actions = self.ctx.actions.clone();
            move |menu: &mut Menu| actions.build_menu(menu, &[ACTION_SHOW_INFO, ACTION_OPEN_MONITOR])
        }));
    }

    fn load_config(&self) -> anyhow::Result<Defaults> {
        let bound = groupconf::load::<MemConf>(&self.ctx.paths.config_file, KeyStrategy::ByTag)?;
        for err in &bound.errors {
            self.ctx.log.debug(format_args!("config: {}", err));
        }
        let mut conf = bound.record;
        conf.configuration.update_delay.set_default(3);
        conf.configuration.update_delay.set_min(1);
        let unit = conf.configuration.update_delay_unit.clone();
        if let Err(e) = conf.configuration.update_delay.set_unit(&unit) {
            self.ctx.log.warn(format_args!("config: {}, counting UpdateDelay in seconds", e));
        }
        if conf.configuration.gauge_name.is_empty() {
            conf.configuration.gauge_name = DEFAULT_GAUGE.to_owned();
        }
        if conf.actions.left_command.trim().is_empty() {
            conf.actions.left_command = DEFAULT_MONITOR.to_owned();
        }

        let mut commands = Commands::new();
        commands.insert(COMMAND_LEFT, Command::from_config(&conf.actions.left_command).monitored(&conf.actions.left_class));
        if !conf.actions.middle_command.trim().is_empty() {
            commands.insert(COMMAND_MIDDLE, Command::from_config(&conf.actions.middle_command));
        }

        let defaults = Defaults {
            label: conf.icon.name.clone(),
            icon: conf.icon.icon.clone(),
            commands,
            poller_interval: Some(Duration::from_secs(conf.configuration.update_delay.seconds())),
            debug: conf.icon.debug,
            ..Default::default()
        };
        *self.conf.write().unwrap() = conf; // unwrap: lock poisoning is okay
        Ok(defaults)
    }

    fn init(self: Arc<Self>, defaults: Defaults, _load_conf: bool) -> BoxFuture<'static, anyhow::Result<Defaults>> {
        Box::pin(async move {
            let conf = self.conf().configuration;
            let icon = &self.ctx.icon;
            let nb_values = usize::from(conf.show_ram) + usize::from(conf.show_swap);
            if conf.display_values > 0 && nb_values > 0 {
                icon.add_data_renderer(RendererKind::Gauge, nb_values, &conf.gauge_name).await?;
            } else {
                icon.remove_data_renderer().await?;
            }
            Ok(defaults)
        })
    }

    fn poller(self: Arc<Self>) -> Option<PollerSpec> {
        Some(PollerSpec::new(Handler::new(move |()| {
            let applet = self.clone();
            async move { applet.poll().await }
        })))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        applet::AppletRegistry,
        lifecycle::AppletManager,
        test_util::{start_args, FakeDock},
    };
    use dock_bus::WireValue;
    use dock_shared_util::AppletName;
    use pretty_assertions::assert_eq;
    use tokio_util::task::TaskTracker;

    const GIB: u64 = 1024 * 1024 * 1024;

    const CONF: &str = "
[Icon]
name=Memory
debug=false

[Configuration]
DisplayText=1
DisplayValues=1
UpdateDelay=5
ShowRAM=true
ShowSwap=true

[Actions]
LeftAction=1
MiddleAction=2
MiddleCommand=xterm -e top
";

    async fn start(dock: &Arc<FakeDock>, conf: &str) -> (AppletManager, tempfile::NamedTempFile) {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), conf).unwrap();
        let (send, _recv) = tokio::sync::mpsc::unbounded_channel();
        let mut manager =
            AppletManager::new(AppletRegistry::builtin(), dock.clone(), TaskTracker::new(), Duration::from_secs(1), send, false);
        manager.spawn(start_args("Mem", file.path())).await.unwrap();
        (manager, file)
    }

    #[test]
    fn test_stats_text_and_values() {
        let stats = MemStats { ram_used: 2 * GIB, ram_total: 8 * GIB, swap_used: 0, swap_total: 0 };
        let conf = GroupConfiguration { show_ram: true, show_swap: true, ..Default::default() };
        assert_eq!(conf.values(&stats), vec![0.25, 0.0]);
        assert_eq!(conf.short_text(&stats), "25%\n0%");
        assert_eq!(info_text(&stats), "Memory: 2.0 GB used of 8.0 GB (25%)\nSwap: 0.0 GB used of 0.0 GB (0%)");

        let ram_only = GroupConfiguration { show_ram: true, ..Default::default() };
        assert_eq!(ram_only.values(&stats), vec![0.25]);
    }

    #[tokio::test]
    async fn test_config_is_applied() {
        let dock = FakeDock::new();
        let (manager, _file) = start(&dock, CONF).await;

        assert_eq!(dock.calls_to("SetLabel"), vec![vec![WireValue::from("Memory")]]);
        assert_eq!(
            dock.calls_to("AddDataRenderer"),
            vec![vec![WireValue::from("gauge"), WireValue::from(2i32), WireValue::from(DEFAULT_GAUGE)]]
        );
        assert_eq!(dock.calls_to("ControlAppli"), vec![vec![WireValue::from(DEFAULT_MONITOR)]]);

        let instance = manager.get(&AppletName::from("Mem")).unwrap();
        assert_eq!(instance.ctx.poller.period(), 5);
        assert_eq!(instance.ctx.commands().get(COMMAND_MIDDLE), Some(&Command::new("xterm -e top")));
        assert_eq!(instance.ctx.actions.menu_names(&[ACTION_SHOW_INFO, ACTION_OPEN_MONITOR]), vec![
            "Memory info",
            "Open system monitor"
        ]);
    }

    #[tokio::test]
    async fn test_middle_location_is_opened() {
        let dock = FakeDock::new();
        let conf = CONF.replace("MiddleCommand=xterm -e top", "MiddleCommand=https://example.org/mem");
        let (manager, _file) = start(&dock, &conf).await;
        let commands = manager.get(&AppletName::from("Mem")).unwrap().ctx.commands();
        assert_eq!(commands.get(COMMAND_MIDDLE), Some(&Command::new("https://example.org/mem").with_open()));
        assert!(!commands.get(COMMAND_LEFT).unwrap().use_open);
    }

    #[tokio::test]
    async fn test_update_delay_unit() {
        let dock = FakeDock::new();
        let conf = CONF.replace("UpdateDelay=5", "UpdateDelay=2\nUpdateDelayUnit=m");
        let (manager, _file) = start(&dock, &conf).await;
        assert_eq!(manager.get(&AppletName::from("Mem")).unwrap().ctx.poller.period(), 120);

        let dock = FakeDock::new();
        let conf = CONF.replace("UpdateDelay=5", "UpdateDelay=2\nUpdateDelayUnit=fortnight");
        let (manager, _file) = start(&dock, &conf).await;
        assert_eq!(manager.get(&AppletName::from("Mem")).unwrap().ctx.poller.period(), 2);
    }

    #[tokio::test]
    async fn test_show_draws_gauge_and_quick_info() {
        let dock = FakeDock::new();
        let (manager, _file) = start(&dock, CONF).await;
        let instance = manager.get(&AppletName::from("Mem")).unwrap();
        let applet = MemApplet {
            ctx: instance.ctx.clone(),
            conf: RwLock::default(),
            system: Mutex::new(System::new()),
            last: Mutex::default(),
        };
        applet.load_config().unwrap();
        dock.clear();

        applet.show(MemStats { ram_used: GIB, ram_total: 4 * GIB, swap_used: GIB, swap_total: 2 * GIB }).await;
        assert_eq!(dock.calls_to("RenderValues"), vec![vec![WireValue::from(vec![0.25, 0.5])]]);
        assert_eq!(dock.calls_to("SetQuickInfo"), vec![vec![WireValue::from("25%\n50%")]]);

        applet.show_info().await;
        assert_eq!(dock.members(), vec!["RenderValues", "SetQuickInfo", "PopupDialog"]);
    }
}
