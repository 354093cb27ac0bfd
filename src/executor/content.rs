//! In-memory source content moving through a flow pipeline

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Result, flow as flow_error};
use crate::merge::Format;

/// Loaded source content
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// A structured document (json, jsonc, yaml, toml)
    Document { value: Value, format: Format },
    /// Markdown with optional YAML frontmatter
    Markdown {
        frontmatter: Option<Value>,
        body: String,
    },
    Text(String),
    Binary(Vec<u8>),
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "md" | "mdc" | "markdown"))
}

/// Split `---` delimited frontmatter from the body, keeping the body byte-exact
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

impl Content {
    /// Interpret raw bytes using the source path's extension
    pub fn load(bytes: Vec<u8>, path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();

        if let Some(format) = Format::from_path(path) {
            let text = String::from_utf8(bytes)
                .map_err(|e| flow_error::parse_failed(&path_str, format.name(), e))?;
            let value = format.parse(&text, &path_str)?;
            return Ok(Self::Document { value, format });
        }

        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => return Ok(Self::Binary(e.into_bytes())),
        };

        if !is_markdown(path) {
            return Ok(Self::Text(text));
        }

        match split_frontmatter(&text) {
            Some((yaml, body)) => {
                let frontmatter: Value = serde_yaml::from_str(yaml)
                    .map_err(|e| flow_error::parse_failed(&path_str, "yaml frontmatter", e))?;
                Ok(Self::Markdown {
                    frontmatter: (!frontmatter.is_null()).then_some(frontmatter),
                    body: body.to_string(),
                })
            }
            None => Ok(Self::Markdown {
                frontmatter: None,
                body: text,
            }),
        }
    }

    /// The key/value mapping that field operations act on: the whole document,
    /// or a markdown file's frontmatter (created on demand)
    pub fn fields_mut(&mut self) -> Option<&mut Value> {
        match self {
            Self::Document { value, .. } => Some(value),
            Self::Markdown { frontmatter, .. } => {
                Some(frontmatter.get_or_insert_with(|| Value::Object(Map::new())))
            }
            Self::Text(_) | Self::Binary(_) => None,
        }
    }

    pub fn fields(&self) -> Option<&Value> {
        match self {
            Self::Document { value, .. } => Some(value),
            Self::Markdown { frontmatter, .. } => frontmatter.as_ref(),
            Self::Text(_) | Self::Binary(_) => None,
        }
    }

    /// Serialize for writing to `target`. Documents are converted to the
    /// target's format when it has one.
    pub fn render(&self, target: &Path) -> Result<Vec<u8>> {
        let target_str = target.display().to_string();
        match self {
            Self::Document { value, format } => {
                let format = Format::from_path(target).unwrap_or(*format);
                Ok(format.serialize(value, &target_str)?.into_bytes())
            }
            Self::Markdown { frontmatter, body } => {
                Ok(render_markdown(frontmatter.as_ref(), body, &target_str)?.into_bytes())
            }
            Self::Text(text) => Ok(text.clone().into_bytes()),
            Self::Binary(bytes) => Ok(bytes.clone()),
        }
    }

    /// Text used for a composite section
    pub fn render_text(&self, target: &Path) -> Result<String> {
        let bytes = self.render(target)?;
        String::from_utf8(bytes).map_err(|e| {
            flow_error::execution_failed(&target.display().to_string(), format!("not text: {e}"))
        })
    }
}

fn render_markdown(frontmatter: Option<&Value>, body: &str, path: &str) -> Result<String> {
    let has_fields = frontmatter.is_some_and(|fm| match fm {
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
        _ => true,
    });
    let Some(fm) = frontmatter.filter(|_| has_fields) else {
        return Ok(body.to_string());
    };

    let yaml = serde_yaml::to_string(fm)
        .map_err(|e| flow_error::parse_failed(path, "yaml frontmatter", e))?;
    Ok(format!("---\n{yaml}---\n{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_markdown_with_frontmatter() {
        let text = "---\ndescription: Deploy\n---\n# Deploy\n\nRun it.\n";
        let content = Content::load(text.as_bytes().to_vec(), Path::new("commands/deploy.md")).unwrap();

        match &content {
            Content::Markdown { frontmatter, body } => {
                assert_eq!(frontmatter.as_ref().unwrap()["description"], "Deploy");
                assert_eq!(body, "# Deploy\n\nRun it.\n");
            }
            other => panic!("unexpected content: {other:?}"),
        }

        let rendered = content.render(Path::new(".claude/commands/deploy.md")).unwrap();
        assert_eq!(String::from_utf8(rendered).unwrap(), text);
    }

    #[test]
    fn test_markdown_without_frontmatter() {
        let content = Content::load(b"just text\n".to_vec(), Path::new("AGENTS.md")).unwrap();
        assert_eq!(
            content,
            Content::Markdown {
                frontmatter: None,
                body: "just text\n".to_string()
            }
        );
    }

    #[test]
    fn test_document_converted_to_target_format() {
        let content = Content::load(br#"{"a": {"b": 1}}"#.to_vec(), Path::new("config.json")).unwrap();
        let yaml = content.render(Path::new("out.yaml")).unwrap();
        let value: Value = serde_yaml::from_slice(&yaml).unwrap();
        assert_eq!(value, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_non_utf8_is_binary() {
        let content = Content::load(vec![0xff, 0xfe, 0x00], Path::new("icon.png")).unwrap();
        assert!(matches!(content, Content::Binary(_)));
    }

    #[test]
    fn test_empty_frontmatter_is_dropped_on_render() {
        let mut content = Content::load(b"body\n".to_vec(), Path::new("x.md")).unwrap();
        assert!(content.fields_mut().is_some());
        let rendered = content.render(Path::new("x.md")).unwrap();
        assert_eq!(rendered, b"body\n");
    }
}
