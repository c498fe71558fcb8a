//! The calls an applet makes on its icon in the dock, and on its sub-icons.

use std::{
    collections::BTreeMap,
    fmt,
    ops::Deref,
    sync::{Arc, Mutex},
};

use dock_bus::{names, DockTransport, MethodCall, WireDict, WireValue};
use dock_shared_util::{AppletName, BusPath, SubIconId};
use maplit::{btreemap, convert_args};

use crate::{
    applet::Handler,
    error::{HostError, HostResult},
};

/// Sub-icon id the dock reads as "all of them".
const ALL_SUB_ICONS: &str = "any";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum EmblemPosition {
    TopLeft = 0,
    BottomLeft = 1,
    BottomRight = 2,
    #[default]
    TopRight = 3,
    Middle = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum RendererKind {
    Gauge,
    Graph,
    ProgressBar,
}

/// Actions on the window controlled by the icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum WindowAction {
    Minimize,
    Show,
    ToggleVisibility,
    Maximize,
    Restore,
    ToggleSize,
    Close,
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerKind {
    #[default]
    Dock,
    Desklet,
}

/// Placement of the icon, as returned by `GetAll`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockProperties {
    /// Window controlled by the icon, 0 when there is none.
    pub xid: u64,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub container: ContainerKind,
    /// Screen side of the container: bottom, top, right, left.
    pub orientation: u32,
    pub has_focus: bool,
}

impl DockProperties {
    fn from_dict(dict: &WireDict) -> Self {
        let int = |key: &str| dict.get(key).and_then(WireValue::as_i32).unwrap_or_default();
        DockProperties {
            xid: dict.get("Xid").and_then(WireValue::as_u64).unwrap_or_default(),
            x: int("x"),
            y: int("y"),
            width: int("width"),
            height: int("height"),
            container: match dict.get("container").and_then(WireValue::as_u32) {
                Some(1) => ContainerKind::Desklet,
                _ => ContainerKind::Dock,
            },
            orientation: dict.get("orientation").and_then(WireValue::as_u32).unwrap_or_default(),
            has_focus: dict.get("has_focus").and_then(WireValue::as_bool).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogText {
    pub multi_lines: bool,
    pub editable: bool,
    /// False hides the typed text, for passwords.
    pub visible: bool,
    pub nb_chars: i32,
    pub initial_value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogScale {
    pub min_value: f64,
    pub max_value: f64,
    pub nb_digit: i32,
    pub initial_value: f64,
    pub min_label: String,
    pub max_label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogList {
    pub editable: bool,
    pub values: Vec<String>,
    /// Index of the selected value, or the text itself when editable.
    pub initial_value: Option<WireValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogWidget {
    #[default]
    None,
    Text(DialogText),
    Scale(DialogScale),
    List(DialogList),
}

impl DialogWidget {
    fn to_dict(&self) -> WireDict {
        match self {
            DialogWidget::None => WireDict::new(),
            DialogWidget::Text(text) => convert_args!(keys = String::from, values = WireValue::from, btreemap!(
                "widget-type" => "text-entry",
                "multi-lines" => text.multi_lines,
                "editable" => text.editable,
                "visible" => text.visible,
                "nb-chars" => text.nb_chars,
                "initial-value" => text.initial_value.clone(),
            )),
            DialogWidget::Scale(scale) => convert_args!(keys = String::from, values = WireValue::from, btreemap!(
                "widget-type" => "scale",
                "min-value" => scale.min_value,
                "max-value" => scale.max_value,
                "nb-digit" => scale.nb_digit,
                "initial-value" => scale.initial_value,
                "min-label" => scale.min_label.clone(),
                "max-label" => scale.max_label.clone(),
            )),
            DialogWidget::List(list) => {
                let mut dict: WireDict = convert_args!(keys = String::from, values = WireValue::from, btreemap!(
                    "widget-type" => "list",
                    "editable" => list.editable,
                    "values" => list.values.join(";"),
                ));
                if let Some(initial) = &list.initial_value {
                    dict.insert("initial-value".to_owned(), initial.clone());
                }
                dict
            }
        }
    }
}

/// A popup dialog with an optional widget.
#[derive(Debug, Clone, Default)]
pub struct DialogData {
    pub message: String,
    pub icon: String,
    /// Seconds before the dialog closes itself, 0 to keep it open.
    pub time_length: i32,
    pub force_above: bool,
    pub use_markup: bool,
    /// Button images or stock names, `;` separated.
    pub buttons: String,
    pub widget: DialogWidget,
    /// Receives the clicked button and the widget value. Replaces the one of the previous dialog.
    pub callback: Option<Handler<(i32, WireValue)>>,
}

impl DialogData {
    fn to_dict(&self) -> WireDict {
        convert_args!(keys = String::from, values = WireValue::from, btreemap!(
            "message" => self.message.clone(),
            "icon" => self.icon.clone(),
            "time-length" => self.time_length,
            "force-above" => self.force_above,
            "use-markup" => self.use_markup,
            "buttons" => self.buttons.clone(),
        ))
    }
}

/// One sub-icon to add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubIconSpec {
    pub label: String,
    pub icon: String,
    pub id: SubIconId,
}

/// The calls shared by the main icon and its sub-icons.
#[derive(Clone)]
pub struct IconBase {
    transport: Arc<dyn DockTransport>,
    path: BusPath,
    interface: &'static str,
    /// Appended to every call of a sub-icon.
    sub_id: Option<SubIconId>,
}

impl fmt::Debug for IconBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconBase").field("path", &self.path).field("sub_id", &self.sub_id).finish()
    }
}

impl IconBase {
    async fn call(&self, member: &'static str, mut args: Vec<WireValue>) -> HostResult<Vec<WireValue>> {
        if let Some(id) = &self.sub_id {
            args.push(id.as_str().into());
        }
        let reply = self.transport.call(MethodCall::new(self.path.clone(), self.interface, member, args)).await?;
        Ok(reply)
    }

    pub fn path(&self) -> &BusPath {
        &self.path
    }

    pub async fn set_label(&self, label: &str) -> HostResult<()> {
        self.call("SetLabel", vec![label.into()]).await.map(drop)
    }

    /// An empty text clears the quick-info.
    pub async fn set_quick_info(&self, info: &str) -> HostResult<()> {
        self.call("SetQuickInfo", vec![info.into()]).await.map(drop)
    }

    pub async fn set_icon(&self, icon: &str) -> HostResult<()> {
        self.call("SetIcon", vec![icon.into()]).await.map(drop)
    }

    /// An empty path or `none` clears the emblem at that position.
    pub async fn set_emblem(&self, path: &str, position: EmblemPosition) -> HostResult<()> {
        let path = if path.is_empty() { "none" } else { path };
        self.call("SetEmblem", vec![path.into(), (position as i32).into()]).await.map(drop)
    }

    pub async fn animate(&self, animation: &str, rounds: i32) -> HostResult<()> {
        self.call("Animate", vec![animation.into(), rounds.into()]).await.map(drop)
    }

    pub async fn show_dialog(&self, message: &str, seconds: i32) -> HostResult<()> {
        self.call("ShowDialog", vec![message.into(), seconds.into()]).await.map(drop)
    }
}

/// A sub-icon, created by [`Icon::add_sub_icons`].
#[derive(Debug, Clone)]
pub struct SubIcon {
    pub label: String,
    pub icon: String,
    base: IconBase,
}

impl Deref for SubIcon {
    type Target = IconBase;

    fn deref(&self) -> &IconBase {
        &self.base
    }
}

/// The main icon of an applet. Derefs to the calls shared with sub-icons.
pub struct Icon {
    name: AppletName,
    base: IconBase,
    /// Calls on the sub-icons object itself, without an id.
    sub_bus: IconBase,
    sub_icons: Mutex<BTreeMap<SubIconId, SubIcon>>,
    renderer: Mutex<Option<usize>>,
    dialog_callback: Mutex<Option<Handler<(i32, WireValue)>>>,
}

impl fmt::Debug for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Icon").field("name", &self.name).field("path", &self.base.path).finish_non_exhaustive()
    }
}

impl Deref for Icon {
    type Target = IconBase;

    fn deref(&self) -> &IconBase {
        &self.base
    }
}

impl Icon {
    pub fn new(transport: Arc<dyn DockTransport>, name: AppletName, path: BusPath) -> Self {
        let sub_bus =
            IconBase { transport: transport.clone(), path: path.sub_icons(), interface: names::SUB_APPLET_INTERFACE, sub_id: None };
        Icon {
            name,
            base: IconBase { transport, path, interface: names::APPLET_INTERFACE, sub_id: None },
            sub_bus,
            sub_icons: Mutex::default(),
            renderer: Mutex::default(),
            dialog_callback: Mutex::default(),
        }
    }

    pub fn name(&self) -> &AppletName {
        &self.name
    }

    pub async fn popup_dialog(&self, data: DialogData) -> HostResult<()> {
        *self.dialog_callback.lock().unwrap() = data.callback.clone(); // unwrap: lock poisoning is okay
        let args = vec![WireValue::Dict(data.to_dict()), WireValue::Dict(data.widget.to_dict())];
        self.call("PopupDialog", args).await.map(drop)
    }

    /// Callback of the last popup dialog, if it had one.
    pub fn dialog_callback(&self) -> Option<Handler<(i32, WireValue)>> {
        self.dialog_callback.lock().unwrap().clone() // unwrap: lock poisoning is okay
    }

    /// Replace the icon drawing with a renderer showing `nb_values` values.
    pub async fn add_data_renderer(&self, kind: RendererKind, nb_values: usize, theme: &str) -> HostResult<()> {
        let kind: &'static str = kind.into();
        self.call("AddDataRenderer", vec![kind.into(), (nb_values as i32).into(), theme.into()]).await?;
        *self.renderer.lock().unwrap() = Some(nb_values); // unwrap: lock poisoning is okay
        Ok(())
    }

    pub async fn remove_data_renderer(&self) -> HostResult<()> {
        self.call("AddDataRenderer", vec!["".into(), 0i32.into(), "".into()]).await?;
        *self.renderer.lock().unwrap() = None; // unwrap: lock poisoning is okay
        Ok(())
    }

    /// Send new values to the data renderer. Needs one value per renderer slot, each in `[0, 1]`.
    pub async fn render_values(&self, values: &[f64]) -> HostResult<()> {
        let expected = *self.renderer.lock().unwrap(); // unwrap: lock poisoning is okay
        match expected {
            None => return Err(HostError::Renderer("no data renderer on this icon".to_owned())),
            Some(n) if n != values.len() => {
                return Err(HostError::Renderer(format!("expected {} values, got {}", n, values.len())))
            }
            _ => {}
        }
        if let Some(bad) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(HostError::Renderer(format!("value {} out of [0, 1]", bad)));
        }
        self.call("RenderValues", vec![values.to_vec().into()]).await.map(drop)
    }

    /// Simple menu of plain entries. Empty names are separators.
    pub async fn populate_menu<S: AsRef<str>>(&self, names: &[S]) -> HostResult<()> {
        let names = names.iter().map(|name| name.as_ref().to_owned()).collect::<Vec<_>>();
        self.call("PopulateMenu", vec![names.into()]).await.map(drop)
    }

    pub async fn add_menu_items(&self, items: &[WireDict]) -> HostResult<()> {
        self.call("AddMenuItems", vec![items.to_vec().into()]).await.map(drop)
    }

    /// Grab keyboard shortcuts for the applet. Empty ones are skipped.
    pub async fn bind_shortkey<S: AsRef<str>>(&self, keys: &[S]) -> HostResult<()> {
        let keys = keys.iter().map(|key| key.as_ref()).filter(|key| !key.is_empty()).map(str::to_owned).collect::<Vec<_>>();
        self.call("BindShortkey", vec![keys.into()]).await.map(drop)
    }

    /// Make the icon control the windows of the given class. `none` releases them.
    pub async fn control_appli(&self, class: &str) -> HostResult<()> {
        self.call("ControlAppli", vec![class.into()]).await.map(drop)
    }

    pub async fn show_appli(&self, show: bool) -> HostResult<()> {
        self.call("ShowAppli", vec![show.into()]).await.map(drop)
    }

    pub async fn act_on_appli(&self, action: WindowAction) -> HostResult<()> {
        let action: &'static str = action.into();
        self.call("ActOnAppli", vec![action.into()]).await.map(drop)
    }

    pub async fn demands_attention(&self, start: bool, animation: &str) -> HostResult<()> {
        self.call("DemandsAttention", vec![start.into(), animation.into()]).await.map(drop)
    }

    /// The answer comes back through `on_answer`.
    pub async fn ask_text(&self, message: &str, initial: &str) -> HostResult<()> {
        self.call("AskText", vec![message.into(), initial.into()]).await.map(drop)
    }

    pub async fn ask_value(&self, message: &str, initial: f64, max: f64) -> HostResult<()> {
        self.call("AskValue", vec![message.into(), initial.into(), max.into()]).await.map(drop)
    }

    pub async fn ask_question(&self, message: &str) -> HostResult<()> {
        self.call("AskQuestion", vec![message.into()]).await.map(drop)
    }

    /// Read one property of the icon, see [`DockProperties`] for the names.
    pub async fn get(&self, property: &str) -> HostResult<WireValue> {
        let reply = self.call("Get", vec![property.into()]).await?;
        reply.into_iter().next().map(WireValue::into_inner).ok_or_else(|| HostError::not_found("property", property))
    }

    pub async fn get_all(&self) -> HostResult<DockProperties> {
        let reply = self.call("GetAll", Vec::new()).await?;
        let dict = reply.first().and_then(WireValue::as_dict).ok_or_else(|| HostError::not_found("property", "GetAll"))?;
        Ok(DockProperties::from_dict(dict))
    }

    /// Window id of the controlled application, 0 when none is open.
    pub async fn xid(&self) -> HostResult<u64> {
        Ok(self.get("Xid").await?.as_u64().unwrap_or_default())
    }

    pub async fn add_sub_icons(&self, icons: &[SubIconSpec]) -> HostResult<()> {
        let fields = icons
            .iter()
            .flat_map(|icon| [icon.label.clone(), icon.icon.clone(), icon.id.to_string()])
            .collect::<Vec<_>>();
        self.sub_bus.call("AddSubIcons", vec![fields.into()]).await?;

        let mut sub_icons = self.sub_icons.lock().unwrap(); // unwrap: lock poisoning is okay
        for spec in icons {
            let base = IconBase { sub_id: Some(spec.id.clone()), ..self.sub_bus.clone() };
            sub_icons.insert(spec.id.clone(), SubIcon { label: spec.label.clone(), icon: spec.icon.clone(), base });
        }
        Ok(())
    }

    pub async fn remove_sub_icon(&self, id: &SubIconId) -> HostResult<()> {
        if !self.sub_icons.lock().unwrap().contains_key(id) { // unwrap: lock poisoning is okay
            return Err(HostError::not_found("sub-icon", id));
        }
        self.sub_bus.call("RemoveSubIcon", vec![id.as_str().into()]).await?;
        self.sub_icons.lock().unwrap().remove(id); // unwrap: lock poisoning is okay
        Ok(())
    }

    pub async fn remove_all_sub_icons(&self) -> HostResult<()> {
        self.sub_bus.call("RemoveSubIcon", vec![ALL_SUB_ICONS.into()]).await?;
        self.sub_icons.lock().unwrap().clear(); // unwrap: lock poisoning is okay
        Ok(())
    }

    pub fn sub_icon(&self, id: &SubIconId) -> HostResult<SubIcon> {
        let sub_icons = self.sub_icons.lock().unwrap(); // unwrap: lock poisoning is okay
        sub_icons.get(id).cloned().ok_or_else(|| HostError::not_found("sub-icon", id))
    }

    pub fn sub_icon_ids(&self) -> Vec<SubIconId> {
        self.sub_icons.lock().unwrap().keys().cloned().collect() // unwrap: lock poisoning is okay
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::FakeDock;
    use pretty_assertions::assert_eq;

    const PATH: &str = "/org/cairodock/CairoDock/Foo";

    fn icon(dock: &Arc<FakeDock>) -> Icon {
        Icon::new(dock.clone(), "Foo".into(), BusPath::from(PATH))
    }

    fn spec(label: &str, icon: &str, id: &str) -> SubIconSpec {
        SubIconSpec { label: label.to_owned(), icon: icon.to_owned(), id: id.into() }
    }

    #[tokio::test]
    async fn test_sub_icon_lifecycle() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        icon.add_sub_icons(&[spec("l1", "i1", "s1"), spec("l2", "i2", "s2")]).await.unwrap();
        assert_eq!(
            dock.calls_to("AddSubIcons"),
            vec![vec![WireValue::StrList(["l1", "i1", "s1", "l2", "i2", "s2"].map(String::from).to_vec())]]
        );

        icon.remove_sub_icon(&"s1".into()).await.unwrap();
        assert_eq!(icon.sub_icon_ids(), vec![SubIconId::from("s2")]);

        dock.clear();
        let err = icon.remove_sub_icon(&"s1".into()).await.unwrap_err();
        assert!(matches!(err, HostError::NotFound { kind: "sub-icon", .. }));
        assert_eq!(icon.sub_icon_ids(), vec![SubIconId::from("s2")]);
        assert!(dock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sub_icon_calls_carry_their_id() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        icon.add_sub_icons(&[spec("l1", "i1", "s1")]).await.unwrap();
        icon.sub_icon(&"s1".into()).unwrap().set_label("hello").await.unwrap();

        let call = dock.calls().pop().unwrap();
        assert_eq!(call.path, BusPath::from("/org/cairodock/CairoDock/Foo/sub_icons"));
        assert_eq!(call.interface, names::SUB_APPLET_INTERFACE);
        assert_eq!(call.args, vec![WireValue::from("hello"), WireValue::from("s1")]);

        icon.remove_all_sub_icons().await.unwrap();
        assert!(icon.sub_icon_ids().is_empty());
        assert_eq!(dock.calls_to("RemoveSubIcon"), vec![vec![WireValue::from("any")]]);
    }

    #[tokio::test]
    async fn test_bind_shortkey_skips_empty_keys() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        icon.bind_shortkey(&["", "A", ""]).await.unwrap();
        icon.bind_shortkey(&["A"]).await.unwrap();
        let calls = dock.calls_to("BindShortkey");
        assert_eq!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn test_render_values_checks_renderer() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        assert!(matches!(icon.render_values(&[0.5]).await, Err(HostError::Renderer(_))));

        icon.add_data_renderer(RendererKind::Gauge, 2, "Turbo-night").await.unwrap();
        assert!(matches!(icon.render_values(&[0.5]).await, Err(HostError::Renderer(_))));
        assert!(matches!(icon.render_values(&[0.5, 1.5]).await, Err(HostError::Renderer(_))));
        icon.render_values(&[0.5, 1.0]).await.unwrap();
        assert_eq!(dock.calls_to("RenderValues"), vec![vec![WireValue::F64List(vec![0.5, 1.0])]]);
        assert_eq!(
            dock.calls_to("AddDataRenderer")[0],
            vec![WireValue::from("gauge"), WireValue::I32(2), WireValue::from("Turbo-night")]
        );
    }

    #[test]
    fn test_renderer_kind_wire_names() {
        let names: Vec<&'static str> =
            [RendererKind::Gauge, RendererKind::Graph, RendererKind::ProgressBar].into_iter().map(Into::into).collect();
        assert_eq!(names, vec!["gauge", "graph", "progressbar"]);
    }

    #[tokio::test]
    async fn test_emblem_and_window_actions() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        icon.set_emblem("", EmblemPosition::Middle).await.unwrap();
        icon.act_on_appli(WindowAction::ToggleVisibility).await.unwrap();
        assert_eq!(dock.calls_to("SetEmblem"), vec![vec![WireValue::from("none"), WireValue::I32(4)]]);
        assert_eq!(dock.calls_to("ActOnAppli"), vec![vec![WireValue::from("toggle-visibility")]]);
    }

    #[tokio::test]
    async fn test_icon_calls_reach_the_dock() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        icon.animate("bounce", 2).await.unwrap();
        icon.show_dialog("hello", 4).await.unwrap();
        icon.show_appli(true).await.unwrap();
        icon.demands_attention(true, "pulse").await.unwrap();
        icon.populate_menu(&["Open", "", "Close"]).await.unwrap();
        icon.ask_text("Name?", "foo").await.unwrap();
        icon.ask_value("Volume?", 20.0, 100.0).await.unwrap();
        icon.ask_question("Sure?").await.unwrap();

        assert_eq!(
            dock.members(),
            vec!["Animate", "ShowDialog", "ShowAppli", "DemandsAttention", "PopulateMenu", "AskText", "AskValue", "AskQuestion"]
        );
        assert_eq!(dock.calls_to("Animate"), vec![vec![WireValue::from("bounce"), WireValue::I32(2)]]);
        assert_eq!(dock.calls_to("ShowDialog"), vec![vec![WireValue::from("hello"), WireValue::I32(4)]]);
        assert_eq!(dock.calls_to("ShowAppli"), vec![vec![WireValue::Bool(true)]]);
        assert_eq!(dock.calls_to("DemandsAttention"), vec![vec![WireValue::Bool(true), WireValue::from("pulse")]]);
        assert_eq!(
            dock.calls_to("PopulateMenu"),
            vec![vec![WireValue::StrList(["Open", "", "Close"].map(String::from).to_vec())]]
        );
        assert_eq!(dock.calls_to("AskText"), vec![vec![WireValue::from("Name?"), WireValue::from("foo")]]);
        assert_eq!(
            dock.calls_to("AskValue"),
            vec![vec![WireValue::from("Volume?"), WireValue::F64(20.0), WireValue::F64(100.0)]]
        );
        assert_eq!(dock.calls_to("AskQuestion"), vec![vec![WireValue::from("Sure?")]]);
    }

    #[tokio::test]
    async fn test_get_unwraps_the_variant() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        assert!(matches!(icon.get("Xid").await, Err(HostError::NotFound { kind: "property", .. })));

        dock.reply("Get", vec![WireValue::Variant(Box::new(WireValue::I32(48)))]);
        assert_eq!(icon.get("width").await.unwrap(), WireValue::I32(48));
        assert_eq!(dock.calls_to("Get").last().unwrap(), &vec![WireValue::from("width")]);
    }

    #[tokio::test]
    async fn test_get_all() {
        let dock = FakeDock::new();
        let props = convert_args!(keys = String::from, values = WireValue::from, btreemap!(
            "Xid" => 42u64,
            "x" => 10i32,
            "y" => 20i32,
            "width" => 48i32,
            "height" => 48i32,
            "orientation" => 1u32,
            "container" => 1u32,
            "has_focus" => true,
        ));
        dock.reply("GetAll", vec![WireValue::Dict(props)]);
        let props = icon(&dock).get_all().await.unwrap();
        assert_eq!(
            props,
            DockProperties {
                xid: 42,
                x: 10,
                y: 20,
                width: 48,
                height: 48,
                container: ContainerKind::Desklet,
                orientation: 1,
                has_focus: true
            }
        );
    }

    #[tokio::test]
    async fn test_popup_dialog_keeps_callback() {
        let dock = FakeDock::new();
        let icon = icon(&dock);
        let data = DialogData {
            message: "Volume?".to_owned(),
            widget: DialogWidget::Scale(DialogScale { max_value: 100.0, ..Default::default() }),
            callback: Some(Handler::new(|_: (i32, WireValue)| async {})),
            ..Default::default()
        };
        icon.popup_dialog(data).await.unwrap();
        assert!(icon.dialog_callback().is_some());

        let args = dock.calls_to("PopupDialog").remove(0);
        assert_eq!(args[0].as_dict().unwrap()["message"], WireValue::from("Volume?"));
        assert_eq!(args[1].as_dict().unwrap()["widget-type"], WireValue::from("scale"));
    }

    #[tokio::test]
    async fn test_closed_transport() {
        let dock = FakeDock::new();
        dock.close();
        let err = icon(&dock).set_label("x").await.unwrap_err();
        assert!(err.is_closed());
    }
}
