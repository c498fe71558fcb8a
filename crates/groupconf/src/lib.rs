//! Grouped key/value configuration files, bound into typed records.
//!
//! A record is a struct of group structs. Each group struct is matched with the `[Group]`
//! section of the same name, and each of its fields with a key of that section, either by the
//! field identifier or by a `conf = "key"` annotation (see [`KeyStrategy`]).
//!
//! Binding never fails on a single field: missing keys and unreadable values are collected in
//! [`Bound::errors`] and the field keeps its zero value. Only a file that cannot be read or
//! parsed is an error.

mod binder;
pub mod document;
pub mod error;
mod macros;

pub use binder::*;
pub use document::Document;
pub use error::{ConfError, ConfResult};

/// Parse a file without binding it, for callers that read keys dynamically.
pub fn parse_str(input: &str) -> ConfResult<Document> {
    Document::parse(input)
}
