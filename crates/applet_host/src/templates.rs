//! Text templates shipped in the share directory of an applet.
//!
//! A template file holds named blocks:
//!
//! ```text
//! {{define "info"}}RAM: {{.ram}}%{{end}}
//! ```
//!
//! Rendering a block replaces every `{{.field}}` with the matching field of a JSON object.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
    error::{HostError, HostResult},
    regex,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    blocks: BTreeMap<String, String>,
}

impl Template {
    /// Parse a template. A text without any `define` block is one block named after the template.
    pub fn parse(name: &str, text: &str) -> Self {
        let pattern = regex!(r#"(?s)\{\{\s*define\s+"([^"]+)"\s*\}\}(.*?)\{\{\s*end\s*\}\}"#);
        let mut blocks: BTreeMap<String, String> =
            pattern.captures_iter(text).map(|caps| (caps[1].to_owned(), caps[2].to_owned())).collect();
        if blocks.is_empty() {
            blocks.insert(name.to_owned(), text.to_owned());
        }
        Template { name: name.to_owned(), blocks }
    }

    pub fn load(name: &str, path: &Path) -> HostResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|_| HostError::not_found("template", path.display()))?;
        Ok(Self::parse(name, &text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    /// Render one block with the fields of `data`.
    pub fn to_string(&self, block: &str, data: &Value) -> HostResult<String> {
        let text = self.blocks.get(block).ok_or_else(|| HostError::not_found("template block", block))?;
        let field = regex!(r"\{\{\s*\.(\w+)\s*\}\}");

        let mut missing = None;
        let out = field.replace_all(text, |caps: &::regex::Captures| match data.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| caps[1].to_owned());
                String::new()
            }
        });
        match missing {
            Some(name) => Err(HostError::not_found("template field", format!("{}.{}", block, name))),
            None => Ok(out.into_owned()),
        }
    }
}

/// Templates loaded for one applet, by name.
#[derive(Debug, Clone, Default)]
pub struct Templates(BTreeMap<String, Template>);

impl Templates {
    /// Load the named templates. Each is looked up as `<name>.tmpl`, then `<name>` in the
    /// templates directory, then as a path of its own.
    pub fn load<S: AsRef<str>>(dir: &Path, names: &[S]) -> HostResult<Self> {
        let mut templates = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let path = find_template(dir, name).ok_or_else(|| HostError::not_found("template", name))?;
            templates.insert(name.to_owned(), Template::load(name, &path)?);
        }
        Ok(Templates(templates))
    }

    pub fn get(&self, name: &str) -> HostResult<&Template> {
        self.0.get(name).ok_or_else(|| HostError::not_found("template", name))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

fn find_template(dir: &Path, name: &str) -> Option<PathBuf> {
    [dir.join(format!("{}.tmpl", name)), dir.join(name), PathBuf::from(name)].into_iter().find(|path| path.is_file())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_render_block() {
        let template = Template::parse(
            "mem",
            r#"{{define "info"}}RAM: {{.ram}}% of {{ .total }}{{end}}
{{define "title"}}{{.name}}{{end}}"#,
        );
        assert_eq!(template.block_names().collect::<Vec<_>>(), vec!["info", "title"]);
        assert_eq!(template.to_string("info", &json!({"ram": 42, "total": "8G"})).unwrap(), "RAM: 42% of 8G");
        assert!(matches!(template.to_string("info", &json!({"ram": 42})), Err(HostError::NotFound { .. })));
        assert!(matches!(template.to_string("nope", &json!({})), Err(HostError::NotFound { .. })));
    }

    #[test]
    fn test_lookup_order() {
        let share = tempfile::tempdir().unwrap();
        std::fs::create_dir(share.path().join("templates")).unwrap();
        std::fs::write(share.path().join("templates/info.tmpl"), r#"{{define "a"}}tmpl{{end}}"#).unwrap();
        std::fs::write(share.path().join("templates/info"), r#"{{define "a"}}plain{{end}}"#).unwrap();
        std::fs::write(share.path().join("templates/other"), "whole {{.x}}").unwrap();

        let dir = share.path().join("templates");
        let templates = Templates::load(&dir, &["info", "other"]).unwrap();
        assert_eq!(templates.get("info").unwrap().to_string("a", &json!({})).unwrap(), "tmpl");
        assert_eq!(templates.get("other").unwrap().to_string("other", &json!({"x": "file"})).unwrap(), "whole file");
        assert!(matches!(templates.get("missing"), Err(HostError::NotFound { .. })));
        assert!(matches!(Templates::load(&dir, &["missing"]), Err(HostError::NotFound { .. })));
    }
}
