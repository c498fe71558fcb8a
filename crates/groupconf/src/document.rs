//! Raw access to a grouped key/value file.
//!
//! ```text
//! # comment
//! [Icon]
//! name = My applet
//! ; other comment
//! [Configuration]
//! Paths = /tmp;/home;
//! ```
//!
//! Keys are separated from their value by the first `=`. An indented line without `=` is
//! appended to the previous value, separated by a newline. Any other line is a parse error.

use crate::error::{ConfError, ConfResult};

/// Name of the implicit group holding keys found before the first header.
pub const DEFAULT_GROUP: &str = "";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    name: String,
    entries: Vec<(String, String)>,
}

impl Group {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    fn set(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, old)) => *old = value,
            None => self.entries.push((key.to_owned(), value)),
        }
    }

    fn append_to(&mut self, key: &str, continuation: &str) {
        if let Some((_, old)) = self.entries.iter_mut().find(|(k, _)| k == key) {
            old.push('\n');
            old.push_str(continuation);
        }
    }
}

/// A parsed file. Groups keep the order in which they first appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    groups: Vec<Group>,
}

impl Document {
    pub fn parse(input: &str) -> ConfResult<Self> {
        let mut doc = Document::default();
        let mut group = DEFAULT_GROUP.to_owned();
        let mut last_key: Option<String> = None;

        for (index, raw_line) in input.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                group = line[1..line.len() - 1].trim().to_owned();
                doc.group_mut(&group);
                last_key = None;
                continue;
            }

            let indented = raw_line.starts_with([' ', '\t']);
            match line.find('=') {
                Some(sep) if sep > 0 => {
                    let key = line[..sep].trim();
                    let value = strip_inline_comment(&line[sep + 1..]).trim().to_owned();
                    doc.group_mut(&group).set(key, value);
                    last_key = Some(key.to_owned());
                }
                _ => match &last_key {
                    Some(key) if indented && group != DEFAULT_GROUP => {
                        let continuation = strip_inline_comment(line).trim();
                        doc.group_mut(&group).append_to(key, continuation);
                    }
                    _ => return Err(ConfError::Parse { line: index + 1, text: line.to_owned() }),
                },
            }
        }
        Ok(doc)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.group(group).and_then(|g| g.get(key))
    }

    fn group_mut(&mut self, name: &str) -> &mut Group {
        let pos = match self.groups.iter().position(|g| g.name == name) {
            Some(pos) => pos,
            None => {
                self.groups.push(Group { name: name.to_owned(), entries: Vec::new() });
                self.groups.len() - 1
            }
        };
        &mut self.groups[pos]
    }
}

/// Inline comments need a blank before the marker, so `a;b;` lists survive.
fn strip_inline_comment(value: &str) -> &str {
    [" ;", "\t;", " #", "\t#"].iter().filter_map(|marker| value.find(marker)).min().map_or(value, |pos| &value[..pos])
}
