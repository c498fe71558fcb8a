//! Live applet instances: spawn, (re)initialisation and stop.

use std::{
    collections::BTreeMap,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use dock_bus::{names, DockTransport};
use dock_shared_util::{AppletName, SubIconId};
use itertools::Itertools;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::task::TaskTracker;

use crate::{
    actions::Actions,
    applet::{Applet, AppletContext, AppletLog, AppletRegistry, Defaults, Events, Handler, Shortkey},
    error::{HostError, HostResult},
    icon::Icon,
    menu::Menu,
    paths::{AppletPaths, StartArgs},
    poller::{PollerHandle, Scheduler},
    router::{self, DockEvent},
    templates::Templates,
    util::{catch_panic, panic_message},
};

/// One running applet.
pub struct AppletInstance {
    pub ctx: AppletContext,
    pub applet: Arc<dyn Applet>,
    pub events: Events,
    /// Callbacks of the last menu sent to the dock, per icon. `None` is the main icon.
    pub(crate) menus: Mutex<BTreeMap<Option<SubIconId>, Menu>>,
    pub(crate) shortkeys: RwLock<Vec<Shortkey>>,
    /// Settings read by the last Init that loaded the config.
    last_defaults: Mutex<Option<Defaults>>,
}

impl std::fmt::Debug for AppletInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppletInstance").field("ctx", &self.ctx).field("events", &self.events).finish_non_exhaustive()
    }
}

impl AppletInstance {
    pub fn name(&self) -> &AppletName {
        self.ctx.name()
    }

    pub(crate) fn menu_callback(&self, icon: Option<&SubIconId>, id: i32) -> Option<Handler<()>> {
        let menus = self.menus.lock().unwrap(); // unwrap: lock poisoning is okay
        menus.get(&icon.cloned()).and_then(|menu| menu.callback(id))
    }

    /// Action bound to a shortkey, if the key is one of ours.
    pub(crate) fn shortkey_action(&self, key: &str) -> Option<usize> {
        let shortkeys = self.shortkeys.read().unwrap(); // unwrap: lock poisoning is okay
        shortkeys.iter().find(|sk| !sk.shortkey.is_empty() && sk.shortkey == key && sk.action_id > 0).map(|sk| sk.action_id)
    }
}

/// Initialise an applet. With `load_conf`, the config file is read again and sub-icons are
/// cleared. Otherwise the settings of the previous load are reused.
pub async fn init_instance(instance: &AppletInstance, load_conf: bool) -> anyhow::Result<()> {
    let ctx = &instance.ctx;
    let loaded = if load_conf {
        ctx.log.err(ctx.icon.remove_all_sub_icons().await, "Failed to clear sub-icons");
        let applet = instance.applet.clone();
        let loaded = match tokio::task::spawn_blocking(move || applet.load_config()).await {
            Ok(loaded) => loaded?,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => return Err(e.into()),
        };
        *instance.last_defaults.lock().unwrap() = Some(loaded.clone()); // unwrap: lock poisoning is okay
        loaded
    } else {
        instance.last_defaults.lock().unwrap().clone().unwrap_or_default() // unwrap: lock poisoning is okay
    };

    let defaults = instance.applet.clone().init(loaded, load_conf).await?;
    apply_defaults(instance, &defaults).await;
    ctx.log.debug(format_args!("Init done (load_conf={})", load_conf));
    Ok(())
}

/// Push every setting to the dock, even the empty ones. Failures are logged and skipped.
async fn apply_defaults(instance: &AppletInstance, defaults: &Defaults) {
    let ctx = &instance.ctx;
    let icon = &ctx.icon;

    let label = if defaults.label.is_empty() { ctx.name().to_string() } else { defaults.label.clone() };
    ctx.log.err(icon.set_label(&label).await, "Failed to set the label");

    let image = if defaults.icon.is_empty() {
        ctx.paths.default_icon().display().to_string()
    } else {
        let path = ctx.paths.share_file(&defaults.icon);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            path.display().to_string()
        } else {
            defaults.icon.clone()
        }
    };
    ctx.log.err(icon.set_icon(&image).await, "Failed to set the icon");
    ctx.log.err(icon.set_quick_info(&defaults.quick_info).await, "Failed to set the quick-info");

    let keys = defaults.shortkeys.iter().map(|sk| sk.shortkey.as_str()).collect::<Vec<_>>();
    ctx.log.err(icon.bind_shortkey(&keys).await, "Failed to bind shortkeys");
    *instance.shortkeys.write().unwrap() = defaults.shortkeys.clone(); // unwrap: lock poisoning is okay

    *ctx.commands.write().unwrap() = defaults.commands.clone(); // unwrap: lock poisoning is okay
    ctx.log.err(icon.control_appli(&defaults.commands.find_monitor()).await, "Failed to control the application");

    if let Some(interval) = defaults.poller_interval {
        ctx.poller.set_interval(interval);
    }

    let templates = if defaults.templates.is_empty() {
        Ok(Templates::default())
    } else {
        let dir = ctx.paths.templates_dir();
        let names = defaults.templates.clone();
        tokio::task::spawn_blocking(move || Templates::load(&dir, &names))
            .await
            .unwrap_or_else(|e| Err(HostError::Lifecycle(format!("template loading failed: {}", e))))
    };
    match templates {
        Ok(templates) => *ctx.templates.write().unwrap() = templates, // unwrap: lock poisoning is okay
        Err(e) => ctx.log.error(format_args!("Failed to load templates: {}", e)),
    }

    ctx.log.set_debug(defaults.debug);
}

/// What the dock asks on `on_reload_module`: Init with its flag, then an immediate poll.
pub async fn reload(instance: &AppletInstance, load_conf: bool) {
    if let Err(e) = init_instance(instance, load_conf).await {
        instance.ctx.log.error(format_args!("Reload failed: {:?}", e));
    }
    instance.ctx.poller.restart();
}

/// Owns the running instances and the poller clock. Lives in the loader task.
pub struct AppletManager {
    instances: BTreeMap<AppletName, Arc<AppletInstance>>,
    registry: AppletRegistry,
    scheduler: Scheduler,
    transport: Arc<dyn DockTransport>,
    tracker: TaskTracker,
    restart_send: UnboundedSender<AppletName>,
    /// Forces debug logs on for every applet.
    debug: bool,
}

impl std::fmt::Debug for AppletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppletManager")
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl AppletManager {
    pub fn new(
        registry: AppletRegistry,
        transport: Arc<dyn DockTransport>,
        tracker: TaskTracker,
        tick: Duration,
        restart_send: UnboundedSender<AppletName>,
        debug: bool,
    ) -> Self {
        AppletManager {
            instances: BTreeMap::new(),
            registry,
            scheduler: Scheduler::new(tick, tracker.clone()),
            transport,
            tracker,
            restart_send,
            debug,
        }
    }

    pub fn get(&self, name: &AppletName) -> Option<&Arc<AppletInstance>> {
        self.instances.get(name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &AppletName> {
        self.instances.keys()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn tick(&mut self) {
        self.scheduler.tick();
    }

    pub fn restart_poller(&mut self, name: &AppletName) {
        self.scheduler.restart(name);
    }

    /// Start an applet from the six dock arguments and run its first Init.
    pub async fn spawn(&mut self, args: StartArgs) -> HostResult<AppletName> {
        let name = args
            .bus_path
            .applet_name(names::DOCK_ROOT_PATH)
            .ok_or_else(|| HostError::Lifecycle(format!("Invalid applet path {}", args.bus_path)))?;
        if self.instances.contains_key(&name) {
            return Err(HostError::Lifecycle(format!("Applet {} is already running", name)));
        }
        let factory = self.registry.get(&name).ok_or_else(|| HostError::not_found("applet", &name))?.clone();

        let paths = Arc::new(AppletPaths::new(name.clone(), args));
        let ctx = AppletContext {
            icon: Arc::new(Icon::new(self.transport.clone(), name.clone(), paths.bus_path.clone())),
            actions: Arc::new(Actions::new(name.clone(), self.tracker.clone())),
            poller: PollerHandle::new(name.clone(), self.scheduler.tick_duration(), self.restart_send.clone()),
            log: AppletLog::new(&name, self.debug),
            tracker: self.tracker.clone(),
            commands: Arc::default(),
            templates: Arc::default(),
            paths,
        };
        let built = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let applet = factory(ctx.clone())?;
            let mut events = Events::default();
            applet.clone().define_events(&mut events);
            anyhow::Ok((applet, events))
        }));
        let (applet, events) = match built {
            Ok(Ok(built)) => built,
            Ok(Err(e)) => return Err(HostError::Lifecycle(format!("Failed to build {}: {:?}", name, e))),
            Err(panic) => return Err(HostError::Lifecycle(format!("{} panicked while building: {}", name, panic_message(&panic)))),
        };

        let instance = Arc::new(AppletInstance {
            ctx,
            applet,
            events,
            menus: Mutex::default(),
            shortkeys: RwLock::default(),
            last_defaults: Mutex::default(),
        });
        match catch_panic(init_instance(&instance, true)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => instance.ctx.log.error(format_args!("Init failed: {:?}", e)),
            Err(msg) => return Err(HostError::Lifecycle(format!("{} panicked during Init: {}", name, msg))),
        }
        if let Some(spec) = instance.applet.clone().poller() {
            self.scheduler.register(&instance.ctx.poller, spec);
        }
        self.instances.insert(name.clone(), instance);
        log::info!("Started applet {}", name);
        Ok(name)
    }

    /// Stop an applet: run its stop callback, then forget it. Nothing of it is started afterwards.
    pub fn stop(&mut self, name: &AppletName) -> HostResult<()> {
        let instance = self.instances.get(name).cloned().ok_or_else(|| HostError::not_found("applet", name))?;
        router::dispatch(instance, DockEvent::StopModule);
        self.scheduler.deregister(name);
        self.instances.remove(name);
        log::info!("Stopped applet {}", name);
        Ok(())
    }

    pub fn stop_all(&mut self) {
        let names = self.instances.keys().cloned().collect::<Vec<_>>();
        for name in names {
            crate::print_result_err!("stopping applet", self.stop(&name));
        }
    }

    /// Listing of the known applets and how many instances of each are running.
    pub fn list_services(&self) -> String {
        let header = format!("Applets services: active {}/{}", self.instances.len(), self.registry.len());
        let lines = self
            .registry
            .names()
            .map(|name| format!("  {}: {}", name, usize::from(self.instances.contains_key(name))))
            .join("\n");
        if lines.is_empty() {
            header
        } else {
            format!("{}\n{}", header, lines)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{register_broken, start_args, test_registry, wait_until, FakeDock, PanicAt, Recorder};
    use dock_bus::WireValue;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn manager(dock: &Arc<FakeDock>, recorder: &Recorder) -> (AppletManager, mpsc::UnboundedReceiver<AppletName>) {
        let (send, recv) = mpsc::unbounded_channel();
        let manager =
            AppletManager::new(test_registry(recorder), dock.clone(), TaskTracker::new(), Duration::from_secs(1), send, false);
        (manager, recv)
    }

    #[tokio::test]
    async fn test_spawn_applies_defaults() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let (mut manager, _recv) = manager(&dock, &recorder);
        let conf = recorder.write_config("first");

        let name = manager.spawn(start_args("Foo", conf.path())).await.unwrap();
        assert_eq!(name, AppletName::from("Foo"));
        assert_eq!(dock.calls_to("SetLabel"), vec![vec![WireValue::from("first")]]);
        assert_eq!(dock.calls_to("SetIcon"), vec![vec![WireValue::from("/share/Foo/icon")]]);
        assert_eq!(dock.calls_to("ControlAppli"), vec![vec![WireValue::from("none")]]);
        assert_eq!(dock.calls_to("BindShortkey"), vec![vec![WireValue::StrList(vec!["<Ctrl>F1".to_owned()])]]);
        assert!(manager.scheduler().contains(&name));
        assert_eq!(manager.get(&name).unwrap().ctx.poller.period(), 2);
    }

    #[tokio::test]
    async fn test_spawn_errors_leave_state_alone() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let (mut manager, _recv) = manager(&dock, &recorder);
        let conf = recorder.write_config("first");

        manager.spawn(start_args("Foo", conf.path())).await.unwrap();
        dock.clear();
        assert!(matches!(manager.spawn(start_args("Foo", conf.path())).await, Err(HostError::Lifecycle(_))));
        assert!(dock.calls().is_empty());
        assert!(matches!(manager.spawn(start_args("Bar", conf.path())).await, Err(HostError::NotFound { .. })));

        let mut bad_path = start_args("Foo", conf.path());
        bad_path.bus_path = "/somewhere/else".into();
        assert!(matches!(manager.spawn(bad_path).await, Err(HostError::Lifecycle(_))));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_applet_is_refused() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let mut registry = test_registry(&recorder);
        for (name, at) in
            [("Factory", PanicAt::Factory), ("Events", PanicAt::DefineEvents), ("Load", PanicAt::LoadConfig), ("Init", PanicAt::Init)]
        {
            register_broken(&mut registry, name, at);
        }
        let (send, _recv) = mpsc::unbounded_channel();
        let mut manager = AppletManager::new(registry, dock.clone(), TaskTracker::new(), Duration::from_secs(1), send, false);
        let conf = recorder.write_config("first");

        for name in ["Factory", "Events", "Load", "Init"] {
            let result = manager.spawn(start_args(name, conf.path())).await;
            assert!(matches!(result, Err(HostError::Lifecycle(_))), "{name}: {result:?}");
        }
        assert!(manager.is_empty());
        assert_eq!(manager.scheduler().len(), 0);

        manager.spawn(start_args("Foo", conf.path())).await.unwrap();
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_templates_come_from_the_share_directory() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let (mut manager, _recv) = manager(&dock, &recorder);
        let conf = recorder.write_config("first");
        let share = tempfile::tempdir().unwrap();
        std::fs::create_dir(share.path().join("templates")).unwrap();
        std::fs::write(share.path().join("templates/info.tmpl"), r#"{{define "line"}}used {{.ram}}{{end}}"#).unwrap();

        let mut args = start_args("Foo", conf.path());
        args.share_data_dir = share.path().to_path_buf();
        let name = manager.spawn(args).await.unwrap();
        let instance = manager.get(&name).unwrap().clone();
        assert!(instance.ctx.template("info").is_err());

        let defaults = Defaults { templates: vec!["info".to_owned()], ..Default::default() };
        apply_defaults(&instance, &defaults).await;
        let template = instance.ctx.template("info").unwrap();
        assert_eq!(template.to_string("line", &serde_json::json!({"ram": "42%"})).unwrap(), "used 42%");
    }

    #[tokio::test]
    async fn test_init_without_conf_gives_same_icon_state() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let (mut manager, _recv) = manager(&dock, &recorder);
        let conf = recorder.write_config("first");
        let name = manager.spawn(start_args("Foo", conf.path())).await.unwrap();
        let instance = manager.get(&name).unwrap().clone();

        let state = |dock: &FakeDock| {
            dock.calls().into_iter().filter(|call| call.member != "RemoveSubIcon").collect::<Vec<_>>()
        };
        let after_load = state(&dock);
        dock.clear();
        init_instance(&instance, false).await.unwrap();
        assert_eq!(state(&dock), after_load);
    }

    #[tokio::test]
    async fn test_reload_rebinds_config() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let (mut manager, mut restarts) = manager(&dock, &recorder);
        let conf = recorder.write_config("first");
        let name = manager.spawn(start_args("Foo", conf.path())).await.unwrap();
        let instance = manager.get(&name).unwrap().clone();

        reload(&instance, true).await;
        assert_eq!(recorder.value(), "first");
        assert_eq!(restarts.recv().await, Some(name.clone()));

        std::fs::write(conf.path(), "[Configuration]\nvalue=second\n").unwrap();
        reload(&instance, true).await;
        assert_eq!(recorder.value(), "second");
        assert_eq!(dock.calls_to("SetLabel").last().unwrap(), &vec![WireValue::from("second")]);
    }

    #[tokio::test]
    async fn test_stop_runs_callback_and_forgets_instance() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let (mut manager, _recv) = manager(&dock, &recorder);
        let conf = recorder.write_config("first");
        let name = manager.spawn(start_args("Foo", conf.path())).await.unwrap();

        manager.stop(&name).unwrap();
        assert!(manager.is_empty());
        assert!(!manager.scheduler().contains(&name));
        wait_until("the stop callback", || recorder.events().contains(&"stop".to_owned())).await;

        // The poller is gone with the instance.
        for _ in 0..3 {
            manager.tick();
        }
        tokio::task::yield_now().await;
        assert!(!recorder.events().contains(&"poll".to_owned()));
        assert!(matches!(manager.stop(&name), Err(HostError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_services() {
        let dock = FakeDock::new();
        let recorder = Recorder::default();
        let (mut manager, _recv) = manager(&dock, &recorder);
        assert_eq!(manager.list_services(), "Applets services: active 0/1\n  Foo: 0");
        let conf = recorder.write_config("first");
        manager.spawn(start_args("Foo", conf.path())).await.unwrap();
        assert_eq!(manager.list_services(), "Applets services: active 1/1\n  Foo: 1");
    }
}
