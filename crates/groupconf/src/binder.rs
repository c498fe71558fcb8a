use std::path::Path;

use crate::{
    document::Document,
    error::{ConfError, ConfResult},
};

/// How a record field is matched with a key of its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// The field identifier is the key.
    ByName,
    /// Only the `conf = "key"` annotation is used. Fields without one are left alone.
    ByTag,
    /// The annotation when present, the field identifier otherwise.
    #[default]
    ByBoth,
}

impl KeyStrategy {
    pub fn resolve<'a>(self, name: &'a str, tag: Option<&'a str>) -> Option<&'a str> {
        match self {
            KeyStrategy::ByName => Some(name),
            KeyStrategy::ByTag => tag,
            KeyStrategy::ByBoth => tag.or(Some(name)),
        }
    }
}

/// A scalar that can be read from the raw text of a value.
pub trait FromConfValue: Sized {
    /// Human readable kind, used in type mismatch errors.
    const KIND: &'static str;

    fn from_conf_value(raw: &str) -> Option<Self>;
}

impl FromConfValue for bool {
    const KIND: &'static str = "boolean";

    fn from_conf_value(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Some(!(raw.is_empty() || raw == "0" || raw.eq_ignore_ascii_case("false") || raw.eq_ignore_ascii_case("no")))
    }
}

macro_rules! impl_from_conf_value_parse {
    ($kind:literal => $($t:ty),*) => {
        $(
            impl FromConfValue for $t {
                const KIND: &'static str = $kind;

                fn from_conf_value(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

impl_from_conf_value_parse!("integer" => i32, i64, u32, u64, usize);
impl_from_conf_value_parse!("float" => f32, f64);

impl FromConfValue for String {
    const KIND: &'static str = "string";

    fn from_conf_value(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

impl FromConfValue for Vec<String> {
    const KIND: &'static str = "string list";

    fn from_conf_value(raw: &str) -> Option<Self> {
        let raw = raw.strip_suffix(';').unwrap_or(raw);
        if raw.is_empty() {
            return Some(Vec::new());
        }
        Some(raw.split(';').map(str::to_owned).collect())
    }
}

/// A struct bound from one `[group]` of the file. Implemented by [`crate::conf_group!`].
pub trait ConfGroup: Default {
    const GROUP: &'static str;

    fn bind_fields(&mut self, binder: &mut Binder<'_>);
}

/// A record made of groups. Implemented by [`crate::conf_record!`].
pub trait ConfRecord: Default {
    fn bind_groups(&mut self, binder: &mut Binder<'_>);
}

/// Fills records from a [`Document`], collecting every non-fatal error on the way.
#[derive(Debug)]
pub struct Binder<'a> {
    doc: &'a Document,
    strategy: KeyStrategy,
    errors: Vec<ConfError>,
}

impl<'a> Binder<'a> {
    pub fn new(doc: &'a Document, strategy: KeyStrategy) -> Self {
        Binder { doc, strategy, errors: Vec::new() }
    }

    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    pub fn errors(&self) -> &[ConfError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ConfError> {
        self.errors
    }

    /// Bind a whole group. A group absent from the file leaves every field at its zero value.
    pub fn bind_group<G: ConfGroup>(&mut self, group: &mut G) {
        if self.doc.group(G::GROUP).is_none() {
            self.errors.push(ConfError::MissingGroup { group: G::GROUP.to_owned() });
            return;
        }
        group.bind_fields(self);
    }

    /// Bind a single field. Missing keys and unreadable values leave `target` untouched.
    pub fn bind_field<T: FromConfValue>(&mut self, group: &str, name: &str, tag: Option<&str>, target: &mut T) {
        let Some(key) = self.strategy.resolve(name, tag) else {
            return;
        };
        match self.doc.get(group, key) {
            None => self.errors.push(ConfError::MissingKey { group: group.to_owned(), key: key.to_owned() }),
            Some(raw) => match T::from_conf_value(raw) {
                Some(value) => *target = value,
                None => self.errors.push(ConfError::WrongType {
                    group: group.to_owned(),
                    key: key.to_owned(),
                    expected: T::KIND,
                    value: raw.to_owned(),
                }),
            },
        }
    }
}

/// A record filled from a file, with the non-fatal errors met while binding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound<R> {
    pub record: R,
    pub errors: Vec<ConfError>,
}

/// Fill a fresh record from an already parsed document.
pub fn bind<R: ConfRecord>(doc: &Document, strategy: KeyStrategy) -> Bound<R> {
    let mut record = R::default();
    let mut binder = Binder::new(doc, strategy);
    record.bind_groups(&mut binder);
    Bound { record, errors: binder.into_errors() }
}

pub fn from_str<R: ConfRecord>(input: &str, strategy: KeyStrategy) -> ConfResult<Bound<R>> {
    let doc = crate::parse_str(input)?;
    Ok(bind(&doc, strategy))
}

/// Read, parse and bind a file. Only an unreadable or unparsable file is an error.
pub fn load<R: ConfRecord>(path: impl AsRef<Path>, strategy: KeyStrategy) -> ConfResult<Bound<R>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfError::Io { path: path.to_path_buf(), message: e.to_string() })?;
    log::debug!("Binding config file {}", path.display());
    from_str(&content, strategy)
}

/// A time interval read as a count, with a unit applied afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    value: u64,
    multiplier: u64,
}

impl Default for Duration {
    fn default() -> Self {
        Duration { value: 0, multiplier: 1 }
    }
}

impl FromConfValue for Duration {
    const KIND: &'static str = "duration";

    fn from_conf_value(raw: &str) -> Option<Self> {
        let value = raw.trim().parse().ok()?;
        Some(Duration { value, multiplier: 1 })
    }
}

impl Duration {
    pub fn new(value: u64) -> Self {
        Duration { value: value.max(1), multiplier: 1 }
    }

    /// Total length in seconds.
    pub fn seconds(&self) -> u64 {
        self.value * self.multiplier
    }

    pub fn set_default(&mut self, default: u64) {
        if self.value == 0 {
            self.value = default;
        }
    }

    pub fn set_min(&mut self, min: u64) {
        self.value = self.value.max(min.max(1));
    }

    pub fn set_unit(&mut self, unit: &str) -> ConfResult<()> {
        self.multiplier = match unit.to_lowercase().as_str() {
            "" => return Ok(()),
            "s" | "second" => 1,
            "m" | "minute" => 60,
            "h" | "hour" => 3600,
            _ => return Err(ConfError::UnknownUnit(unit.to_owned())),
        };
        Ok(())
    }
}
