//! Structured document formats for merge targets
//!
//! Every supported format is parsed into a `serde_json::Value` tree (with
//! key order preserved) and serialized back into the same format.

use std::path::Path;

use serde_json::Value;

use crate::error::{Result, flow as flow_error};

/// File format of a structured document, inferred from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Jsonc,
    Yaml,
    Toml,
}

impl Format {
    /// Infer the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "jsonc" => Some(Self::Jsonc),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonc => "jsonc",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }

    /// Parse document text. Blank content parses as an empty object.
    pub fn parse(self, content: &str, path: &str) -> Result<Value> {
        if content.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        match self {
            Self::Json | Self::Jsonc => {
                let stripped = strip_jsonc_comments(content);
                serde_json::from_str(&stripped)
                    .map_err(|e| flow_error::parse_failed(path, self.name(), e))
            }
            Self::Yaml => {
                let value: Value = serde_yaml::from_str(content)
                    .map_err(|e| flow_error::parse_failed(path, self.name(), e))?;
                Ok(if value.is_null() {
                    Value::Object(serde_json::Map::new())
                } else {
                    value
                })
            }
            Self::Toml => toml::from_str(content)
                .map_err(|e| flow_error::parse_failed(path, self.name(), e)),
        }
    }

    /// Serialize a document. JSONC is written as plain JSON.
    pub fn serialize(self, value: &Value, path: &str) -> Result<String> {
        match self {
            Self::Json | Self::Jsonc => serde_json::to_string_pretty(value)
                .map(|mut s| {
                    s.push('\n');
                    s
                })
                .map_err(|e| flow_error::parse_failed(path, self.name(), e)),
            Self::Yaml => serde_yaml::to_string(value)
                .map_err(|e| flow_error::parse_failed(path, self.name(), e)),
            Self::Toml => toml::to_string_pretty(value)
                .map_err(|e| flow_error::parse_failed(path, self.name(), e)),
        }
    }
}

/// Strip JSONC comments from content
pub fn strip_jsonc_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut in_single_comment = false;
    let mut in_multi_comment = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_single_comment {
            if c == '\n' {
                in_single_comment = false;
                result.push(c);
            }
        } else if in_multi_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                in_multi_comment = false;
                chars.next();
            }
        } else if in_string {
            result.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            match (c, chars.peek()) {
                ('/', Some('/')) => {
                    in_single_comment = true;
                    chars.next();
                }
                ('/', Some('*')) => {
                    in_multi_comment = true;
                    chars.next();
                }
                ('"', _) => {
                    in_string = true;
                    result.push(c);
                }
                _ => result.push(c),
            }
        }
    }

    result
}
