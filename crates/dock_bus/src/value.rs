use std::collections::{BTreeMap, HashMap};

use zbus::zvariant::{Array, Dict, OwnedValue, Structure, StructureBuilder, Value};

/// String keyed map, sent as `a{sv}`.
pub type WireDict = BTreeMap<String, WireValue>;

/// The subset of bus values that the dock and its applets exchange.
///
/// Dictionaries always carry variant values, so the values of a [`WireValue::Dict`] are not
/// wrapped in [`WireValue::Variant`] themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Bool(bool),
    I32(i32),
    U32(u32),
    U64(u64),
    F64(f64),
    Str(String),
    StrList(Vec<String>),
    F64List(Vec<f64>),
    Dict(WireDict),
    DictList(Vec<WireDict>),
    Variant(Box<WireValue>),
}

impl WireValue {
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Bool(_) => "bool",
            WireValue::I32(_) => "int32",
            WireValue::U32(_) => "uint32",
            WireValue::U64(_) => "uint64",
            WireValue::F64(_) => "double",
            WireValue::Str(_) => "string",
            WireValue::StrList(_) => "string list",
            WireValue::F64List(_) => "double list",
            WireValue::Dict(_) => "dict",
            WireValue::DictList(_) => "dict list",
            WireValue::Variant(_) => "variant",
        }
    }

    /// Strip any number of variant wrappers.
    pub fn into_inner(self) -> WireValue {
        match self {
            WireValue::Variant(inner) => inner.into_inner(),
            other => other,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(x) => Some(*x),
            WireValue::Variant(inner) => inner.as_bool(),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            WireValue::I32(x) => Some(*x),
            WireValue::Variant(inner) => inner.as_i32(),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            WireValue::U32(x) => Some(*x),
            WireValue::Variant(inner) => inner.as_u32(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            WireValue::U64(x) => Some(*x),
            WireValue::Variant(inner) => inner.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::F64(x) => Some(*x),
            WireValue::Variant(inner) => inner.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Str(x) => Some(x),
            WireValue::Variant(inner) => inner.as_str(),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&WireDict> {
        match self {
            WireValue::Dict(x) => Some(x),
            WireValue::Variant(inner) => inner.as_dict(),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value<'static> {
        match self {
            WireValue::Bool(x) => Value::from(*x),
            WireValue::I32(x) => Value::from(*x),
            WireValue::U32(x) => Value::from(*x),
            WireValue::U64(x) => Value::from(*x),
            WireValue::F64(x) => Value::from(*x),
            WireValue::Str(x) => Value::from(x.clone()),
            WireValue::StrList(x) => Value::from(x.clone()),
            WireValue::F64List(x) => Value::from(x.clone()),
            WireValue::Dict(x) => Value::from(dict_to_map(x)),
            WireValue::DictList(x) => Value::from(x.iter().map(dict_to_map).collect::<Vec<_>>()),
            WireValue::Variant(x) => Value::Value(Box::new(x.to_value())),
        }
    }
}

fn dict_to_map(dict: &WireDict) -> HashMap<String, Value<'static>> {
    dict.iter().map(|(k, v)| (k.clone(), v.to_value())).collect()
}

macro_rules! impl_wire_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for WireValue {
                fn from(x: $t) -> Self {
                    WireValue::$variant(x)
                }
            }
        )*
    };
}

impl_wire_from! {
    bool => Bool,
    i32 => I32,
    u32 => U32,
    u64 => U64,
    f64 => F64,
    String => Str,
    Vec<String> => StrList,
    Vec<f64> => F64List,
    WireDict => Dict,
    Vec<WireDict> => DictList,
}

impl From<&str> for WireValue {
    fn from(x: &str) -> Self {
        WireValue::Str(x.to_owned())
    }
}

impl TryFrom<Value<'_>> for WireValue {
    type Error = String;

    fn try_from(value: Value<'_>) -> std::result::Result<Self, String> {
        Ok(match value {
            Value::Bool(x) => WireValue::Bool(x),
            Value::U8(x) => WireValue::U32(x.into()),
            Value::U16(x) => WireValue::U32(x.into()),
            Value::I16(x) => WireValue::I32(x.into()),
            Value::I32(x) => WireValue::I32(x),
            Value::U32(x) => WireValue::U32(x),
            Value::U64(x) => WireValue::U64(x),
            Value::F64(x) => WireValue::F64(x),
            Value::Str(x) => WireValue::Str(x.as_str().to_owned()),
            Value::ObjectPath(x) => WireValue::Str(x.as_str().to_owned()),
            Value::Value(inner) => WireValue::Variant(Box::new(WireValue::try_from(*inner)?)),
            Value::Array(array) => array_to_wire(array)?,
            Value::Dict(dict) => WireValue::Dict(dict_to_wire(dict)?),
            other => return Err(format!("unsupported value of signature {}", other.value_signature().as_str())),
        })
    }
}

fn array_to_wire(array: Array<'_>) -> std::result::Result<WireValue, String> {
    let element = array.element_signature().as_str().to_owned();
    let items = Vec::<OwnedValue>::try_from(array).map_err(|e| e.to_string())?;
    let items = items.into_iter().map(|item| WireValue::try_from(Value::from(item))).collect::<Result<Vec<_>, _>>()?;

    let mismatch = |item: &WireValue| format!("{} in an array of {}", item.kind(), element);
    match element.as_str() {
        "s" => items
            .into_iter()
            .map(|item| match item {
                WireValue::Str(x) => Ok(x),
                other => Err(mismatch(&other)),
            })
            .collect::<Result<_, _>>()
            .map(WireValue::StrList),
        "d" => items
            .into_iter()
            .map(|item| match item {
                WireValue::F64(x) => Ok(x),
                other => Err(mismatch(&other)),
            })
            .collect::<Result<_, _>>()
            .map(WireValue::F64List),
        "a{sv}" => items
            .into_iter()
            .map(|item| match item {
                WireValue::Dict(x) => Ok(x),
                other => Err(mismatch(&other)),
            })
            .collect::<Result<_, _>>()
            .map(WireValue::DictList),
        _ => Err(format!("unsupported array of {element}")),
    }
}

fn dict_to_wire(dict: Dict<'_, '_>) -> std::result::Result<WireDict, String> {
    let map = HashMap::<String, OwnedValue>::try_from(dict).map_err(|e| e.to_string())?;
    map.into_iter().map(|(k, v)| Ok((k, WireValue::try_from(Value::from(v))?.into_inner()))).collect()
}

/// Pack method arguments into a single structure. Returns `None` when there are no arguments,
/// since an empty structure is not a valid body.
pub fn args_to_structure(args: &[WireValue]) -> Option<Structure<'static>> {
    if args.is_empty() {
        return None;
    }
    let builder = args.iter().fold(StructureBuilder::new(), |builder, arg| builder.append_field(arg.to_value()));
    Some(builder.build())
}

pub fn structure_to_args(structure: Structure<'_>) -> std::result::Result<Vec<WireValue>, String> {
    structure.into_fields().into_iter().map(WireValue::try_from).collect()
}
