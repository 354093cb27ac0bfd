//! Named transforms usable in a flow's `pipe`
//!
//! Names are looked up once when a flow is deserialized; an unknown name
//! fails the load instead of the execution.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::context::FlowContext;
use crate::error::{OpkgError, Result};
use crate::executor::content::Content;

pub type TransformFn = fn(Content, &FlowContext) -> Result<Content>;

const REGISTRY: &[(&str, TransformFn)] = &[
    ("filter-empty", filter_empty),
    ("filter-null", filter_null),
    ("sort-keys", sort_keys),
    ("platform-frontmatter", platform_frontmatter),
    ("markdown-to-toml", markdown_to_toml),
];

/// A resolved pipe step, serialized as its name
#[derive(Clone, Copy)]
pub struct Transform {
    name: &'static str,
    apply: TransformFn,
}

impl Transform {
    pub fn lookup(name: &str) -> Result<Self> {
        REGISTRY
            .iter()
            .find(|(known, _)| *known == name)
            .map(|&(name, apply)| Self { name, apply })
            .ok_or_else(|| OpkgError::UnknownTransform {
                name: name.to_string(),
            })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, content: Content, ctx: &FlowContext) -> Result<Content> {
        (self.apply)(content, ctx)
    }
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::lookup(&name).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transform").field(&self.name).finish()
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Apply `f` to the content's field mapping, leaving text and binaries alone
fn map_fields(mut content: Content, f: impl FnOnce(&mut Value)) -> Content {
    if let Some(fields) = content.fields_mut() {
        f(fields);
    }
    content
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn retain_recursive(value: &mut Value, drop: &dyn Fn(&Value) -> bool) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                retain_recursive(child, drop);
            }
            map.retain(|_, v| !drop(v));
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                retain_recursive(child, drop);
            }
        }
        _ => {}
    }
}

fn filter_empty(content: Content, _ctx: &FlowContext) -> Result<Content> {
    Ok(map_fields(content, |fields| {
        retain_recursive(fields, &is_empty_value);
    }))
}

fn filter_null(content: Content, _ctx: &FlowContext) -> Result<Content> {
    Ok(map_fields(content, |fields| {
        retain_recursive(fields, &Value::is_null);
    }))
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn sort_keys(content: Content, _ctx: &FlowContext) -> Result<Content> {
    Ok(map_fields(content, |fields| {
        *fields = sorted(std::mem::take(fields));
    }))
}

/// Keep common keys, overlay the active platform's block, drop other platforms' blocks
fn platform_frontmatter(content: Content, ctx: &FlowContext) -> Result<Content> {
    Ok(map_fields(content, |fields| {
        let Value::Object(map) = fields else {
            return;
        };

        let mut out = Map::new();
        let mut platform_block = None;
        for (key, value) in std::mem::take(map) {
            if ctx.platform_names().any(|name| name == key) {
                platform_block = Some(value);
            } else if !ctx.known_platforms.iter().any(|id| *id == key) {
                out.insert(key, value);
            }
        }

        if let Some(Value::Object(block)) = platform_block {
            for (key, value) in block {
                out.insert(key, value);
            }
        }
        *map = out;
    }))
}

/// Escape a string for use in TOML basic strings
pub fn escape_toml_string(s: &str) -> String {
    let mut escaped = String::new();

    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\x00'..='\x08' | '\x0B' | '\x0C' | '\x0E'..='\x1F' | '\x7F' => {
                escaped.push_str(&format!("\\u{:04X}", c as u32));
            }
            _ => escaped.push(c),
        }
    }

    format!("\"{escaped}\"")
}

/// Gemini command conversion: frontmatter `description` plus the body as `prompt`
fn markdown_to_toml(content: Content, ctx: &FlowContext) -> Result<Content> {
    let Content::Markdown { frontmatter, body } = content else {
        return Err(OpkgError::FlowExecution {
            source_path: ctx.package_name.clone(),
            reason: "markdown-to-toml expects a markdown source".to_string(),
        });
    };

    let mut toml_content = String::new();
    if let Some(description) = frontmatter
        .as_ref()
        .and_then(|fm| fm.get("description"))
        .and_then(Value::as_str)
    {
        toml_content.push_str(&format!("description = {}\n", escape_toml_string(description)));
    }

    let prompt = body.trim_matches('\n');
    if prompt.contains('\n') {
        let literal = prompt.replace('\\', "\\\\").replace("\"\"\"", "\"\"\\\"");
        toml_content.push_str(&format!("prompt = \"\"\"\n{literal}\n\"\"\"\n"));
    } else {
        toml_content.push_str(&format!("prompt = {}\n", escape_toml_string(prompt)));
    }

    Ok(Content::Text(toml_content))
}
