use dock_bus::{WireDict, WireValue};

use crate::applet::Handler;

/// Id of the root menu, the one the dock opens.
pub const MAIN_MENU_ID: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MenuItemType {
    Entry = 0,
    SubMenu = 1,
    Separator = 2,
    CheckBox = 3,
    RadioButton = 4,
}

/// A menu being built for the dock. Every entry gets the index of its callback as id, so the
/// answer of the dock can be matched with the callback even if the applet state changed.
#[derive(Debug, Default)]
pub struct Menu {
    items: Vec<WireDict>,
    callbacks: Vec<Option<Handler<()>>>,
    parent: i32,
}

/// The entry just added, for the optional settings.
pub struct MenuItem<'a>(&'a mut WireDict);

impl MenuItem<'_> {
    pub fn tooltip(self, text: &str) -> Self {
        self.0.insert("tooltip".to_owned(), text.into());
        self
    }
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Menu::default();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[WireDict] {
        &self.items
    }

    pub fn add_entry(&mut self, label: &str, icon: &str, call: Option<Handler<()>>) -> MenuItem<'_> {
        let mut item = self.item(MenuItemType::Entry);
        item.insert("label".to_owned(), label.into());
        item.insert("icon".to_owned(), icon.into());
        self.push(item, call)
    }

    pub fn add_separator(&mut self) {
        let item = self.item(MenuItemType::Separator);
        self.push(item, None);
    }

    pub fn add_check_entry(&mut self, label: &str, active: bool, call: Option<Handler<()>>) -> MenuItem<'_> {
        let mut item = self.item(MenuItemType::CheckBox);
        item.insert("label".to_owned(), label.into());
        item.insert("state".to_owned(), active.into());
        self.push(item, call)
    }

    pub fn add_radio_entry(&mut self, label: &str, active: bool, group: i32, call: Option<Handler<()>>) -> MenuItem<'_> {
        let mut item = self.item(MenuItemType::RadioButton);
        item.insert("label".to_owned(), label.into());
        item.insert("state".to_owned(), active.into());
        item.insert("group".to_owned(), group.into());
        self.push(item, call)
    }

    /// Add a sub-menu, filled by `fill` with the same builder.
    pub fn add_sub_menu(&mut self, label: &str, icon: &str, fill: impl FnOnce(&mut Menu)) {
        let mut item = self.item(MenuItemType::SubMenu);
        item.insert("label".to_owned(), label.into());
        item.insert("icon".to_owned(), icon.into());
        let id = self.next_id();
        self.push(item, None);

        let parent = std::mem::replace(&mut self.parent, id);
        fill(self);
        self.parent = parent;
    }

    /// Labels for the dock's plain menu call, when the menu only holds top-level entries
    /// without icon or tooltip, and separators. Separators are empty labels.
    pub fn plain_labels(&self) -> Option<Vec<String>> {
        self.items
            .iter()
            .map(|item| {
                if item.get("menu") != Some(&WireValue::I32(MAIN_MENU_ID)) || item.contains_key("tooltip") {
                    return None;
                }
                match item.get("widget-type")?.as_i32()? {
                    kind if kind == MenuItemType::Separator as i32 => Some(String::new()),
                    kind if kind == MenuItemType::Entry as i32 => {
                        let icon = item.get("icon").and_then(WireValue::as_str).unwrap_or_default();
                        let label = item.get("label").and_then(WireValue::as_str).unwrap_or_default();
                        (icon.is_empty() && !label.is_empty()).then(|| label.to_owned())
                    }
                    _ => None,
                }
            })
            .collect()
    }

    /// Callback of the entry with the given id, if it has one.
    pub fn callback(&self, id: i32) -> Option<Handler<()>> {
        let index = usize::try_from(id).ok()?;
        self.callbacks.get(index).cloned().flatten()
    }

    fn next_id(&self) -> i32 {
        self.callbacks.len() as i32
    }

    fn item(&self, kind: MenuItemType) -> WireDict {
        let mut item = WireDict::new();
        item.insert("widget-type".to_owned(), WireValue::I32(kind as i32));
        item.insert("menu".to_owned(), WireValue::I32(self.parent));
        item.insert("id".to_owned(), WireValue::I32(self.next_id()));
        item
    }

    fn push(&mut self, item: WireDict, call: Option<Handler<()>>) -> MenuItem<'_> {
        self.items.push(item);
        self.callbacks.push(call);
        // the vec can't be empty, an item was just pushed
        let last = self.items.len() - 1;
        MenuItem(&mut self.items[last])
    }
}
