//! Dispatch of dock signals to the applet they address.

use std::sync::Arc;

use dock_bus::{names, EventDescriptor, EventInterface, TransportError, WireValue};
use dock_shared_util::{AppletName, SubIconId};

use crate::{
    applet::Handler,
    lifecycle::{self, AppletInstance, AppletManager},
    menu::Menu,
    util::run_guarded,
};

/// A decoded dock signal.
#[derive(Debug, Clone, PartialEq)]
pub enum DockEvent {
    Click(i32),
    MiddleClick,
    BuildMenu,
    MenuSelect(i32),
    Scroll(bool),
    DropData(String),
    Answer(WireValue),
    AnswerDialog(i32, WireValue),
    Shortkey(String),
    ChangeFocus(bool),
    ReloadModule(bool),
    StopModule,

    ClickSubIcon(i32, SubIconId),
    MiddleClickSubIcon(SubIconId),
    ScrollSubIcon(bool, SubIconId),
    DropDataSubIcon(String, SubIconId),
    BuildMenuSubIcon(SubIconId),
    MenuSelectSubIcon(i32, SubIconId),
}

type Decoder = fn(&[WireValue]) -> Option<DockEvent>;

fn sub_id(value: &WireValue) -> Option<SubIconId> {
    value.as_str().map(SubIconId::from)
}

fn text(value: &WireValue) -> Option<String> {
    value.as_str().map(str::to_owned)
}

#[rustfmt::skip]
static DECODERS: &[(EventInterface, &str, Decoder)] = &[
    // The click state is forwarded when present, but the dock does not always send it.
    (EventInterface::Applet, "on_click", |args| match args {
        [] => Some(DockEvent::Click(0)),
        [state, ..] => Some(DockEvent::Click(state.as_i32()?)),
    }),
    (EventInterface::Applet, "on_middle_click", |_| Some(DockEvent::MiddleClick)),
    (EventInterface::Applet, "on_build_menu", |_| Some(DockEvent::BuildMenu)),
    (EventInterface::Applet, "on_menu_select", |args| match args {
        [id, ..] => Some(DockEvent::MenuSelect(id.as_i32()?)),
        _ => None,
    }),
    (EventInterface::Applet, "on_scroll", |args| match args {
        [up, ..] => Some(DockEvent::Scroll(up.as_bool()?)),
        _ => None,
    }),
    (EventInterface::Applet, "on_drop_data", |args| match args {
        [data, ..] => Some(DockEvent::DropData(text(data)?)),
        _ => None,
    }),
    (EventInterface::Applet, "on_answer", |args| match args {
        [answer, ..] => Some(DockEvent::Answer(answer.clone().into_inner())),
        _ => None,
    }),
    (EventInterface::Applet, "on_answer_dialog", |args| match args {
        [button, answer, ..] => Some(DockEvent::AnswerDialog(button.as_i32()?, answer.clone().into_inner())),
        _ => None,
    }),
    (EventInterface::Applet, "on_shortkey", |args| match args {
        [key, ..] => Some(DockEvent::Shortkey(text(key)?)),
        _ => None,
    }),
    (EventInterface::Applet, "on_change_focus", |args| match args {
        [focus, ..] => Some(DockEvent::ChangeFocus(focus.as_bool()?)),
        _ => None,
    }),
    (EventInterface::Applet, "on_reload_module", |args| match args {
        [changed, ..] => Some(DockEvent::ReloadModule(changed.as_bool()?)),
        _ => None,
    }),
    (EventInterface::Applet, "on_stop_module", |_| Some(DockEvent::StopModule)),

    (EventInterface::SubApplet, "on_click_sub_icon", |args| match args {
        [state, id] => Some(DockEvent::ClickSubIcon(state.as_i32()?, sub_id(id)?)),
        _ => None,
    }),
    (EventInterface::SubApplet, "on_middle_click_sub_icon", |args| match args {
        [id] => Some(DockEvent::MiddleClickSubIcon(sub_id(id)?)),
        _ => None,
    }),
    (EventInterface::SubApplet, "on_scroll_sub_icon", |args| match args {
        [up, id] => Some(DockEvent::ScrollSubIcon(up.as_bool()?, sub_id(id)?)),
        _ => None,
    }),
    (EventInterface::SubApplet, "on_drop_data_sub_icon", |args| match args {
        [data, id] => Some(DockEvent::DropDataSubIcon(text(data)?, sub_id(id)?)),
        _ => None,
    }),
    (EventInterface::SubApplet, "on_build_menu_sub_icon", |args| match args {
        [id] => Some(DockEvent::BuildMenuSubIcon(sub_id(id)?)),
        _ => None,
    }),
    (EventInterface::SubApplet, "on_menu_select_sub_icon", |args| match args {
        [menu_id, id] => Some(DockEvent::MenuSelectSubIcon(menu_id.as_i32()?, sub_id(id)?)),
        _ => None,
    }),
];

impl DockEvent {
    /// Decode a signal. Unknown members give `Ok(None)`, malformed arguments an error.
    pub fn decode(event: &EventDescriptor) -> Result<Option<DockEvent>, TransportError> {
        let Some((_, _, decoder)) =
            DECODERS.iter().find(|(interface, member, _)| *interface == event.interface && *member == event.member)
        else {
            return Ok(None);
        };
        match decoder(&event.args) {
            Some(decoded) => Ok(Some(decoded)),
            None => Err(TransportError::decode(&event.member, format!("unexpected arguments {:?}", event.args))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A callback was started on a worker.
    Dispatched,
    Dropped,
    /// The dock stops the applet. The caller removes the instance.
    Stop(AppletName),
}

/// Route a dock signal to the applet named by its path.
pub fn route(manager: &AppletManager, event: EventDescriptor) -> RouteOutcome {
    let Some(name) = event.path.applet_name(names::DOCK_ROOT_PATH) else {
        log::debug!("Signal {} on {} does not address an applet", event.member, event.path);
        return RouteOutcome::Dropped;
    };
    let Some(instance) = manager.get(&name) else {
        log::debug!("Dropping {} for unknown applet {}", event.member, name);
        return RouteOutcome::Dropped;
    };
    let decoded = match DockEvent::decode(&event) {
        Ok(Some(decoded)) => decoded,
        Ok(None) => {
            log::debug!("Ignoring unknown signal {} for {}", event.member, name);
            return RouteOutcome::Dropped;
        }
        Err(e) => {
            log::warn!("Dropping signal for {}: {}", name, e);
            return RouteOutcome::Dropped;
        }
    };
    if decoded == DockEvent::StopModule {
        return RouteOutcome::Stop(name);
    }
    dispatch(instance.clone(), decoded);
    RouteOutcome::Dispatched
}

/// Run the handling of an event on a worker of the instance.
pub fn dispatch(instance: Arc<AppletInstance>, event: DockEvent) {
    let tracker = instance.ctx.tracker.clone();
    tracker.spawn(async move {
        let context = format!("handling {:?} for {}", event, instance.ctx.name());
        run_guarded(&context, handle(instance, event)).await;
    });
}

async fn call<T: Send + 'static>(handler: &Option<Handler<T>>, arg: T) {
    if let Some(handler) = handler {
        handler.call(arg).await;
    }
}

async fn handle(instance: Arc<AppletInstance>, event: DockEvent) {
    let events = &instance.events;
    match event {
        DockEvent::Click(state) => call(&events.on_click, state).await,
        DockEvent::MiddleClick => call(&events.on_middle_click, ()).await,
        DockEvent::BuildMenu => {
            if let Some(fill) = &events.on_build_menu {
                send_menu(&instance, None, |menu| fill(menu)).await;
            }
        }
        DockEvent::MenuSelect(id) => match instance.menu_callback(None, id) {
            Some(callback) => callback.call(()).await,
            None => call(&events.on_menu_select, id).await,
        },
        DockEvent::Scroll(up) => call(&events.on_scroll, up).await,
        DockEvent::DropData(data) => call(&events.on_drop_data, data).await,
        DockEvent::Answer(answer) => call(&events.on_answer, answer).await,
        DockEvent::AnswerDialog(button, answer) => match instance.ctx.icon.dialog_callback() {
            Some(callback) => callback.call((button, answer)).await,
            None => call(&events.on_answer_dialog, (button, answer)).await,
        },
        DockEvent::Shortkey(key) => match instance.shortkey_action(&key) {
            Some(action) => instance.ctx.actions.launch_logged(action).await,
            None => call(&events.on_shortkey, key).await,
        },
        DockEvent::ChangeFocus(focus) => call(&events.on_change_focus, focus).await,
        DockEvent::ReloadModule(load_conf) => {
            lifecycle::reload(&instance, load_conf).await;
            call(&events.on_reload_module, load_conf).await;
        }
        DockEvent::StopModule => call(&events.on_stop_module, ()).await,

        DockEvent::ClickSubIcon(state, id) => call(&events.on_click_sub_icon, (state, id)).await,
        DockEvent::MiddleClickSubIcon(id) => call(&events.on_middle_click_sub_icon, id).await,
        DockEvent::ScrollSubIcon(up, id) => call(&events.on_scroll_sub_icon, (up, id)).await,
        DockEvent::DropDataSubIcon(data, id) => call(&events.on_drop_data_sub_icon, (data, id)).await,
        DockEvent::BuildMenuSubIcon(id) => {
            if let Some(fill) = &events.on_build_menu_sub_icon {
                send_menu(&instance, Some(id.clone()), |menu| fill(menu, &id)).await;
            }
        }
        DockEvent::MenuSelectSubIcon(menu_id, id) => match instance.menu_callback(Some(&id), menu_id) {
            Some(callback) => callback.call(()).await,
            None => call(&events.on_menu_select_sub_icon, (menu_id, id)).await,
        },
    }
}

/// Rebuild the menu of one icon of the instance and send it to the dock. Menus of plain entries
/// go out as a list of labels, the others as tagged items.
async fn send_menu(instance: &AppletInstance, icon: Option<SubIconId>, fill: impl FnOnce(&mut Menu)) {
    let (items, labels) = {
        let mut menus = instance.menus.lock().unwrap(); // unwrap: lock poisoning is okay
        let menu = menus.entry(icon).or_default();
        menu.clear();
        fill(menu);
        (menu.items().to_vec(), menu.plain_labels())
    };
    if items.is_empty() {
        return;
    }
    let sent = match labels {
        Some(labels) => instance.ctx.icon.populate_menu(&labels).await,
        None => instance.ctx.icon.add_menu_items(&items).await,
    };
    instance.ctx.log.err(sent, "Failed to send the menu");
}
