//! The contract between the host and the applets it runs.
//!
//! An applet is built by its factory from an [`AppletContext`], fills its [`Events`] table once,
//! then goes through [`Applet::load_config`] and [`Applet::init`] every time it is (re)loaded.

use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};

use dock_bus::WireValue;
use dock_shared_util::{AppletName, SubIconId};
use futures::{future::BoxFuture, FutureExt};
use tokio_util::task::TaskTracker;

use crate::{
    actions::Actions,
    commands::Commands,
    error::{HostError, HostResult},
    icon::Icon,
    menu::Menu,
    paths::AppletPaths,
    poller::{PollerHandle, PollerSpec},
    templates::{Template, Templates},
};

/// An async callback. Cheap to clone, called on a worker task.
pub struct Handler<T>(Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>);

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Handler(self.0.clone())
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler")
    }
}

impl<T: Send + 'static> Handler<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Handler(Arc::new(move |arg| f(arg).boxed()))
    }

    pub fn call(&self, arg: T) -> BoxFuture<'static, ()> {
        (self.0)(arg)
    }
}

/// Fills the menu the dock is about to show.
pub type MenuHandler = Arc<dyn Fn(&mut Menu) + Send + Sync>;
/// Fills the menu of one sub-icon.
pub type SubMenuHandler = Arc<dyn Fn(&mut Menu, &SubIconId) + Send + Sync>;

/// Callbacks an applet wants to receive. Missing entries are ignored.
#[derive(Default, Clone)]
pub struct Events {
    pub on_click: Option<Handler<i32>>,
    pub on_middle_click: Option<Handler<()>>,
    pub on_build_menu: Option<MenuHandler>,
    pub on_menu_select: Option<Handler<i32>>,
    pub on_scroll: Option<Handler<bool>>,
    pub on_drop_data: Option<Handler<String>>,
    pub on_answer: Option<Handler<WireValue>>,
    pub on_answer_dialog: Option<Handler<(i32, WireValue)>>,
    pub on_shortkey: Option<Handler<String>>,
    pub on_change_focus: Option<Handler<bool>>,
    /// Called after the host reloaded the applet, with the flag the dock sent.
    pub on_reload_module: Option<Handler<bool>>,
    pub on_stop_module: Option<Handler<()>>,

    pub on_click_sub_icon: Option<Handler<(i32, SubIconId)>>,
    pub on_middle_click_sub_icon: Option<Handler<SubIconId>>,
    pub on_scroll_sub_icon: Option<Handler<(bool, SubIconId)>>,
    pub on_drop_data_sub_icon: Option<Handler<(String, SubIconId)>>,
    pub on_build_menu_sub_icon: Option<SubMenuHandler>,
    pub on_menu_select_sub_icon: Option<Handler<(i32, SubIconId)>>,
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("on_click", &self.on_click.is_some())
            .field("on_build_menu", &self.on_build_menu.is_some())
            .field("on_reload_module", &self.on_reload_module.is_some())
            .field("on_stop_module", &self.on_stop_module.is_some())
            .finish_non_exhaustive()
    }
}

/// A keyboard shortcut read from the applet config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shortkey {
    /// Config group holding the key.
    pub group: String,
    pub key: String,
    /// The shortcut itself, e.g. `<Control>F8`. Empty when unset.
    pub shortkey: String,
    pub desc: String,
    /// Action launched when triggered, 0 for none.
    pub action_id: usize,
}

/// Settings produced by an applet's config and applied by the host after each Init.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    /// Falls back to the applet name when empty.
    pub label: String,
    /// Falls back to the `icon` file of the share directory when empty.
    pub icon: String,
    pub quick_info: String,
    pub shortkeys: Vec<Shortkey>,
    pub commands: Commands,
    pub poller_interval: Option<Duration>,
    /// Names of the templates to load from the share directory.
    pub templates: Vec<String>,
    pub debug: bool,
}

/// Logger of one applet. Messages use `applet::<name>` as target, and debug messages are only
/// emitted while the applet's debug flag is set.
#[derive(Debug, Clone)]
pub struct AppletLog {
    target: Arc<str>,
    debug: Arc<AtomicBool>,
    forced: bool,
}

impl AppletLog {
    /// `forced` keeps debug messages on whatever the applet config says.
    pub fn new(name: &AppletName, forced: bool) -> Self {
        AppletLog { target: format!("applet::{}", name).into(), debug: Arc::new(AtomicBool::new(forced)), forced }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug || self.forced, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        if self.is_debug() {
            log::debug!(target: &*self.target, "{}", msg);
        }
    }

    pub fn info(&self, msg: impl fmt::Display) {
        log::info!(target: &*self.target, "{}", msg);
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        log::warn!(target: &*self.target, "{}", msg);
    }

    pub fn error(&self, msg: impl fmt::Display) {
        log::error!(target: &*self.target, "{}", msg);
    }

    /// Log the error of a result, if any. Returns true when there was one.
    pub fn err<T, E: fmt::Debug>(&self, result: Result<T, E>, context: &str) -> bool {
        match result {
            Ok(_) => false,
            Err(e) => {
                log::error!(target: &*self.target, "{}: {:?}", context, e);
                true
            }
        }
    }
}

/// Everything the host hands to an applet when building it.
#[derive(Clone)]
pub struct AppletContext {
    pub paths: Arc<AppletPaths>,
    pub icon: Arc<Icon>,
    pub actions: Arc<Actions>,
    pub poller: PollerHandle,
    pub log: AppletLog,
    pub tracker: TaskTracker,
    pub(crate) commands: Arc<RwLock<Commands>>,
    pub(crate) templates: Arc<RwLock<Templates>>,
}

impl fmt::Debug for AppletContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppletContext").field("paths", &self.paths).finish_non_exhaustive()
    }
}

impl AppletContext {
    pub fn name(&self) -> &AppletName {
        &self.paths.name
    }

    /// Launch one of the commands of the last applied [`Defaults`].
    pub async fn launch_command(&self, key: usize) -> anyhow::Result<()> {
        let command = {
            let commands = self.commands.read().unwrap(); // unwrap: lock poisoning is okay
            commands.get(key).cloned()
        };
        match command {
            Some(command) => command.launch(&self.icon).await,
            None => Err(HostError::not_found("command", key).into()),
        }
    }

    pub fn commands(&self) -> Commands {
        self.commands.read().unwrap().clone() // unwrap: lock poisoning is okay
    }

    pub fn template(&self, name: &str) -> HostResult<Template> {
        let templates = self.templates.read().unwrap(); // unwrap: lock poisoning is okay
        templates.get(name).cloned()
    }

    /// Spawn work on the host's tracked workers, so shutdown waits for it.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(fut);
    }
}

/// An applet implementation. Built once per started instance.
pub trait Applet: Send + Sync + 'static {
    /// Register the callbacks of this applet. Called once, right after construction.
    fn define_events(self: Arc<Self>, events: &mut Events);

    /// Read the config file and turn it into the settings the host applies.
    /// A config file that cannot be parsed fails the Init.
    fn load_config(&self) -> anyhow::Result<Defaults>;

    /// Applet specific (re)initialisation, called after the config was read, or with the
    /// previous settings when `load_conf` is false. The returned settings are applied.
    fn init(self: Arc<Self>, defaults: Defaults, _load_conf: bool) -> BoxFuture<'static, anyhow::Result<Defaults>> {
        Box::pin(async move { Ok(defaults) })
    }

    /// The periodic task of this applet, if it has one.
    fn poller(self: Arc<Self>) -> Option<PollerSpec> {
        None
    }
}

pub type AppletFactory = Arc<dyn Fn(AppletContext) -> anyhow::Result<Arc<dyn Applet>> + Send + Sync>;

/// Applets this host knows how to start, by name.
#[derive(Clone, Default)]
pub struct AppletRegistry {
    factories: BTreeMap<String, AppletFactory>,
}

impl fmt::Debug for AppletRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

impl AppletRegistry {
    /// The applets shipped with the host.
    pub fn builtin() -> Self {
        let mut registry = AppletRegistry::default();
        registry.register("Mem", crate::applets::mem::MemApplet::create);
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(AppletContext) -> anyhow::Result<Arc<dyn Applet>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_owned(), Arc::new(factory));
    }

    pub fn get(&self, name: &AppletName) -> Option<&AppletFactory> {
        self.factories.get(name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_handler_is_shared_between_clones() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = Handler::new({
            let hits = hits.clone();
            move |n: usize| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(n, Ordering::SeqCst);
                }
            }
        });
        handler.call(2).await;
        handler.clone().call(3).await;
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_applet_log_debug_flag() {
        let log = AppletLog::new(&"Mem".into(), false);
        assert_eq!(log.target(), "applet::Mem");
        assert!(!log.is_debug());
        log.set_debug(true);
        assert!(log.is_debug());

        let forced = AppletLog::new(&"Mem".into(), true);
        forced.set_debug(false);
        assert!(forced.is_debug());
    }

    #[test]
    fn test_builtin_registry() {
        let registry = AppletRegistry::builtin();
        assert!(registry.get(&"Mem".into()).is_some());
        assert!(registry.get(&"Nope".into()).is_none());
    }
}
