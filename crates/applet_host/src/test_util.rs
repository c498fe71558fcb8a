//! In-memory stand-in for the dock, used by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use dock_bus::{names, DockTransport, MethodCall, TransportError, WireValue};
use dock_shared_util::BusPath;
use futures::future::BoxFuture;
use groupconf::KeyStrategy;

use crate::{
    actions::Action,
    applet::{Applet, AppletContext, AppletRegistry, Defaults, Events, Handler, Shortkey},
    menu::Menu,
    paths::StartArgs,
    poller::PollerSpec,
};

/// Records every call and answers with canned replies, empty by default.
#[derive(Debug, Default)]
pub struct FakeDock {
    calls: Mutex<Vec<MethodCall>>,
    replies: Mutex<HashMap<&'static str, Vec<WireValue>>>,
    failing: Mutex<HashSet<&'static str>>,
    closed: AtomicBool,
}

impl FakeDock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, member: &'static str, args: Vec<WireValue>) {
        self.replies.lock().unwrap().insert(member, args);
    }

    pub fn fail(&self, member: &'static str) {
        self.failing.lock().unwrap().insert(member);
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn members(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|call| call.member).collect()
    }

    /// Arguments of every call to `member`, in order.
    pub fn calls_to(&self, member: &str) -> Vec<Vec<WireValue>> {
        self.calls.lock().unwrap().iter().filter(|call| call.member == member).map(|call| call.args.clone()).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl DockTransport for FakeDock {
    fn call(&self, call: MethodCall) -> BoxFuture<'_, dock_bus::Result<Vec<WireValue>>> {
        Box::pin(async move {
            if self.is_closed() {
                return Err(TransportError::Closed);
            }
            let member = call.member;
            self.calls.lock().unwrap().push(call);
            if self.failing.lock().unwrap().contains(member) {
                return Err(TransportError::Rejected { member: member.to_owned(), reason: "refused by test".to_owned() });
            }
            Ok(self.replies.lock().unwrap().get(member).cloned().unwrap_or_default())
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Poll `check` until it holds, failing the test after a second.
pub async fn wait_until(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Shared log of what a [`TestApplet`] saw, plus the last config value it read.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    value: Arc<Mutex<String>>,
}

impl Recorder {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn value(&self) -> String {
        self.value.lock().unwrap().clone()
    }

    pub fn handler(&self, event: &'static str) -> Handler<()> {
        let recorder = self.clone();
        Handler::new(move |()| {
            let recorder = recorder.clone();
            async move { recorder.push(event) }
        })
    }

    /// Records `prefix:{arg:?}`.
    pub fn handler_fmt<T: std::fmt::Debug + Send + 'static>(&self, prefix: &'static str) -> Handler<T> {
        let recorder = self.clone();
        Handler::new(move |arg: T| {
            let recorder = recorder.clone();
            async move { recorder.push(format!("{}:{:?}", prefix, arg)) }
        })
    }

    /// A config file for the test applet.
    pub fn write_config(&self, value: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), format!("[Configuration]\nvalue={}\n", value)).unwrap();
        file
    }
}

groupconf::conf_group! {
    #[group = "Configuration"]
    pub struct TestGroup {
        pub value: String,
    }
}

groupconf::conf_record! {
    pub struct TestConf {
        pub configuration: TestGroup,
    }
}

/// Applet recording every event it gets. Action 3 is `Open`, bound to clicks and `<Ctrl>F1`.
pub struct TestApplet {
    ctx: AppletContext,
    recorder: Recorder,
}

impl Applet for TestApplet {
    fn define_events(self: Arc<Self>, events: &mut Events) {
        let recorder = &self.recorder;
        self.ctx
            .actions
            .add([Action::new(1, "One", recorder.handler("one")), Action::separator(2), Action::new(3, "Open", recorder.handler("open"))])
            .unwrap();

        events.on_click = Some(Handler::new({
            let applet = self.clone();
            move |state: i32| {
                let applet = applet.clone();
                async move {
                    applet.recorder.push(format!("click:{}", state));
                    applet.ctx.actions.launch_logged(3).await;
                }
            }
        }));
        events.on_build_menu = Some(Arc::new({
            let recorder = recorder.clone();
            move |menu: &mut Menu| {
                menu.add_entry("Open", "", Some(recorder.handler("menu-open")));
            }
        }));
        events.on_menu_select = Some(recorder.handler_fmt("select"));
        events.on_shortkey = Some(recorder.handler_fmt("shortkey"));
        events.on_answer_dialog = Some(recorder.handler_fmt("dialog"));
        events.on_reload_module = Some(recorder.handler_fmt("reload"));
        events.on_stop_module = Some(recorder.handler("stop"));
        events.on_click_sub_icon = Some(recorder.handler_fmt("click-sub"));
        events.on_build_menu_sub_icon = Some(Arc::new({
            let recorder = recorder.clone();
            move |menu: &mut Menu, _id: &dock_shared_util::SubIconId| {
                menu.add_entry("Sub", "", Some(recorder.handler("menu-sub")));
            }
        }));
        events.on_menu_select_sub_icon = Some(recorder.handler_fmt("select-sub"));
    }

    fn load_config(&self) -> anyhow::Result<Defaults> {
        let bound = groupconf::load::<TestConf>(&self.ctx.paths.config_file, KeyStrategy::ByName)?;
        let value = bound.record.configuration.value;
        *self.recorder.value.lock().unwrap() = value.clone();
        Ok(Defaults {
            label: value,
            shortkeys: vec![Shortkey { shortkey: "<Ctrl>F1".to_owned(), action_id: 3, ..Default::default() }],
            poller_interval: Some(Duration::from_secs(2)),
            ..Default::default()
        })
    }

    fn poller(self: Arc<Self>) -> Option<PollerSpec> {
        Some(PollerSpec::new(self.recorder.handler("poll")))
    }
}

/// Registry knowing only `Foo`, a [`TestApplet`] feeding `recorder`.
pub fn test_registry(recorder: &Recorder) -> AppletRegistry {
    let mut registry = AppletRegistry::default();
    let recorder = recorder.clone();
    registry.register("Foo", move |ctx| Ok(Arc::new(TestApplet { ctx, recorder: recorder.clone() }) as Arc<dyn Applet>));
    registry
}

pub fn start_args(name: &str, config_file: &Path) -> StartArgs {
    StartArgs {
        reserved: name.to_owned(),
        parent_app: "cairo-dock".to_owned(),
        bus_path: BusPath::new(names::DOCK_ROOT_PATH, &name.into()),
        config_file: config_file.to_path_buf(),
        root_data_dir: PathBuf::from("/root-data"),
        share_data_dir: PathBuf::from(format!("/share/{}", name)),
    }
}

/// Where a [`BrokenApplet`] panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicAt {
    Factory,
    DefineEvents,
    LoadConfig,
    Init,
    /// Starts fine, then panics on every click.
    OnClick,
}

pub struct BrokenApplet(PanicAt);

impl Applet for BrokenApplet {
    fn define_events(self: Arc<Self>, events: &mut Events) {
        if self.0 == PanicAt::DefineEvents {
            panic!("applet bug in define_events");
        }
        if self.0 == PanicAt::OnClick {
            events.on_click = Some(Handler::new(|_state: i32| async { panic!("applet bug in on_click") }));
        }
    }

    fn load_config(&self) -> anyhow::Result<Defaults> {
        if self.0 == PanicAt::LoadConfig {
            panic!("applet bug in load_config");
        }
        Ok(Defaults::default())
    }

    fn init(self: Arc<Self>, defaults: Defaults, _load_conf: bool) -> BoxFuture<'static, anyhow::Result<Defaults>> {
        Box::pin(async move {
            if self.0 == PanicAt::Init {
                panic!("applet bug in init");
            }
            Ok(defaults)
        })
    }
}

/// Add an applet that panics at `at` when started.
pub fn register_broken(registry: &mut AppletRegistry, name: &str, at: PanicAt) {
    registry.register(name, move |_ctx| {
        if at == PanicAt::Factory {
            panic!("applet bug in the factory");
        }
        Ok(Arc::new(BrokenApplet(at)) as Arc<dyn Applet>)
    });
}
