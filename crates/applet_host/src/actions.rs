//! Named actions of an applet, used by its menus, shortkeys and clicks.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, RwLock,
};

use dock_shared_util::AppletName;
use tokio_util::task::TaskTracker;

use crate::{
    applet::Handler,
    error::{HostError, HostResult},
    menu::Menu,
    util::run_guarded,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuRole {
    #[default]
    Entry,
    Separator,
    CheckBox,
    RadioButton,
    SubMenu,
}

#[derive(Debug, Clone, Default)]
pub struct Action {
    pub id: usize,
    pub name: String,
    pub icon: String,
    pub menu: MenuRole,
    /// Run on a worker behind the busy slot instead of being awaited.
    pub background: bool,
    pub tooltip: String,
    pub checked: bool,
    pub group: i32,
    pub call: Option<Handler<()>>,
}

impl Action {
    pub fn new(id: usize, name: &str, call: Handler<()>) -> Self {
        Action { id, name: name.to_owned(), call: Some(call), ..Default::default() }
    }

    pub fn separator(id: usize) -> Self {
        Action { id, menu: MenuRole::Separator, ..Default::default() }
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_owned();
        self
    }

    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }

    pub fn role(mut self, menu: MenuRole) -> Self {
        self.menu = menu;
        self
    }

    pub fn tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = tooltip.to_owned();
        self
    }
}

/// The actions of one applet, with ids following insertion order.
///
/// Id 0 is a reserved stub added on creation, so applet actions start at 1.
/// At most one background action of the applet runs at a time: launching another while the slot
/// is taken drops the launch.
#[derive(Debug)]
pub struct Actions {
    name: AppletName,
    list: RwLock<Vec<Action>>,
    busy: Arc<AtomicBool>,
    dropped: AtomicUsize,
    indicators: RwLock<(Option<Handler<()>>, Option<Handler<()>>)>,
    tracker: TaskTracker,
}

impl Actions {
    pub fn new(name: AppletName, tracker: TaskTracker) -> Self {
        Actions {
            name,
            list: RwLock::new(vec![Action::separator(0)]),
            busy: Arc::default(),
            dropped: AtomicUsize::new(0),
            indicators: RwLock::default(),
            tracker,
        }
    }

    /// Append actions. Each id must be the next free one.
    pub fn add(&self, actions: impl IntoIterator<Item = Action>) -> HostResult<()> {
        let mut list = self.list.write().unwrap(); // unwrap: lock poisoning is okay
        for action in actions {
            if action.id != list.len() {
                return Err(HostError::Lifecycle(format!(
                    "action {} of {} has id {}, expected {}",
                    action.name,
                    self.name,
                    action.id,
                    list.len()
                )));
            }
            list.push(action);
        }
        Ok(())
    }

    pub fn get(&self, id: usize) -> HostResult<Action> {
        let list = self.list.read().unwrap(); // unwrap: lock poisoning is okay
        list.get(id).cloned().ok_or_else(|| HostError::not_found("action", id))
    }

    /// Id of the named action, 0 when there is none.
    pub fn id_of(&self, name: &str) -> usize {
        let list = self.list.read().unwrap(); // unwrap: lock poisoning is okay
        list.iter().skip(1).find(|action| action.name == name).map_or(0, |action| action.id)
    }

    pub fn len(&self) -> usize {
        self.list.read().unwrap().len() // unwrap: lock poisoning is okay
    }

    pub fn set_checked(&self, id: usize, checked: bool) -> HostResult<()> {
        let mut list = self.list.write().unwrap(); // unwrap: lock poisoning is okay
        let action = list.get_mut(id).ok_or_else(|| HostError::not_found("action", id))?;
        action.checked = checked;
        Ok(())
    }

    /// Hooks run around every background action, to show the applet is working.
    pub fn set_indicators(&self, pre: Option<Handler<()>>, post: Option<Handler<()>>) {
        *self.indicators.write().unwrap() = (pre, post); // unwrap: lock poisoning is okay
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Background launches dropped because the slot was taken.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Run an action. Foreground actions are awaited, background ones only started.
    /// Launching id 0 does nothing.
    pub async fn launch(&self, id: usize) -> HostResult<()> {
        if id == 0 {
            return Ok(());
        }
        let action = self.get(id)?;
        let Some(call) = action.call else {
            return Ok(());
        };
        let context = format!("running action {} of {}", action.name, self.name);

        if !action.background {
            run_guarded(&context, call.call(())).await;
            return Ok(());
        }

        if self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            log::debug!("{} busy, dropping action {}", self.name, action.name);
            self.dropped.fetch_add(1, Ordering::SeqCst);
            return Err(HostError::Busy(self.name.clone()));
        }

        let (pre, post) = self.indicators.read().unwrap().clone(); // unwrap: lock poisoning is okay
        let busy = self.busy.clone();
        self.tracker.spawn(async move {
            if let Some(pre) = pre {
                run_guarded("showing the busy indicator", pre.call(())).await;
            }
            run_guarded(&context, call.call(())).await;
            busy.store(false, Ordering::SeqCst);
            if let Some(post) = post {
                run_guarded("hiding the busy indicator", post.call(())).await;
            }
        });
        Ok(())
    }

    /// Same as [`Actions::launch`], logging failures. A dropped launch is only worth a debug line,
    /// and was already logged.
    pub async fn launch_logged(&self, id: usize) {
        match self.launch(id).await {
            Ok(()) | Err(HostError::Busy(_)) => {}
            Err(e) => log::error!("Failed to launch action {} of {}: {}", id, self.name, e),
        }
    }

    /// Labels of a simple menu made of the given actions. Separators are blank.
    pub fn menu_names(&self, ids: &[usize]) -> Vec<String> {
        let list = self.list.read().unwrap(); // unwrap: lock poisoning is okay
        ids.iter()
            .filter_map(|id| list.get(*id))
            .map(|action| match action.menu {
                MenuRole::Separator => String::new(),
                _ => action.name.clone(),
            })
            .collect()
    }

    /// Add the given actions to a menu, each entry launching its action.
    pub fn build_menu(self: &Arc<Self>, menu: &mut Menu, ids: &[usize]) {
        for id in ids {
            let Ok(action) = self.get(*id) else {
                log::warn!("{}: no action {} to put in the menu", self.name, id);
                continue;
            };
            let call = Some(self.launcher(action.id));
            let item = match action.menu {
                MenuRole::Separator => {
                    menu.add_separator();
                    continue;
                }
                MenuRole::Entry => menu.add_entry(&action.name, &action.icon, call),
                MenuRole::CheckBox => menu.add_check_entry(&action.name, action.checked, call),
                MenuRole::RadioButton => menu.add_radio_entry(&action.name, action.checked, action.group, call),
                MenuRole::SubMenu => {
                    menu.add_sub_menu(&action.name, &action.icon, |_| {});
                    continue;
                }
            };
            if !action.tooltip.is_empty() {
                item.tooltip(&action.tooltip);
            }
        }
    }

    fn launcher(self: &Arc<Self>, id: usize) -> Handler<()> {
        let actions = self.clone();
        Handler::new(move |()| {
            let actions = actions.clone();
            async move { actions.launch_logged(id).await }
        })
    }
}
