//! Declarative flow rules
//!
//! A flow maps universal package paths to a platform layout (export flows,
//! used on install) or back (import flows, used on save):
//!
//! ```jsonc
//! {
//!   "from": "mcp.jsonc",
//!   "to": ".opencode/opencode.json",
//!   "merge": "deep",
//!   "extract": "mcpServers",
//!   "embed": "mcp",
//!   "pipe": ["filter-null"]
//! }
//! ```
//!
//! `from` and `to` may be switches over a context variable, and `to` may be a
//! map of alternate targets keyed by platform. Both collapse to one concrete
//! pattern per context before any path matching happens.

pub mod condition;
pub mod context;
pub mod switch;
pub mod transform;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use condition::Condition;
pub use context::{Direction, FlowContext};
pub use switch::Switch;
pub use transform::Transform;

use crate::error::{OpkgError, Result};
use crate::merge::MergeStrategy;

/// Source side of a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowSource {
    One(String),
    Many(Vec<String>),
    Switch { switch: Switch },
}

impl FlowSource {
    /// Concrete source patterns for this context
    pub fn resolve(&self, ctx: &FlowContext) -> Result<Vec<String>> {
        match self {
            Self::One(pattern) => Ok(vec![pattern.clone()]),
            Self::Many(patterns) => Ok(patterns.clone()),
            Self::Switch { switch } => Ok(vec![switch.resolve(ctx)?.to_string()]),
        }
    }
}

impl From<&str> for FlowSource {
    fn from(pattern: &str) -> Self {
        Self::One(pattern.to_string())
    }
}

/// Target side of a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowTarget {
    Pattern(String),
    Switch { switch: Switch },
    /// Alternate targets keyed by platform id or alias, with an optional `default`
    Named(BTreeMap<String, String>),
}

impl FlowTarget {
    /// The single target pattern governing this context
    pub fn resolve(&self, ctx: &FlowContext) -> Result<String> {
        match self {
            Self::Pattern(pattern) => Ok(pattern.clone()),
            Self::Switch { switch } => Ok(switch.resolve(ctx)?.to_string()),
            Self::Named(targets) => ctx
                .platform_names()
                .find_map(|name| targets.get(name))
                .or_else(|| targets.get("default"))
                .cloned()
                .ok_or_else(|| OpkgError::SwitchUnmatched {
                    variable: "platform".to_string(),
                    value: ctx.platform.clone(),
                }),
        }
    }
}

impl From<&str> for FlowTarget {
    fn from(pattern: &str) -> Self {
        Self::Pattern(pattern.to_string())
    }
}

/// Move the value at one dot path to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapping {
    pub from: String,
    pub to: String,
}

/// A declarative transformation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub from: FlowSource,
    pub to: FlowTarget,

    #[serde(default)]
    pub merge: MergeStrategy,

    /// Keep only these top-level fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pick: Vec<String>,

    /// Drop these top-level fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omit: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map: Vec<KeyMapping>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipe: Vec<Transform>,

    /// Nest the result under this dot path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<String>,

    /// Narrow the source to the subtree at this dot path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,

    /// Lower priorities run first; ties keep declared order
    #[serde(default)]
    pub priority: i32,
}

impl Flow {
    pub fn new(from: impl Into<FlowSource>, to: impl Into<FlowTarget>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            merge: MergeStrategy::Replace,
            pick: Vec::new(),
            omit: Vec::new(),
            map: Vec::new(),
            pipe: Vec::new(),
            embed: None,
            extract: None,
            when: None,
            priority: 0,
        }
    }

    pub fn with_merge(mut self, strategy: MergeStrategy) -> Self {
        self.merge = strategy;
        self
    }

    pub fn with_extract(mut self, path: impl Into<String>) -> Self {
        self.extract = Some(path.into());
        self
    }

    pub fn with_embed(mut self, key: impl Into<String>) -> Self {
        self.embed = Some(key.into());
        self
    }

    /// Append a named transform. Names come from the built-in registry.
    pub fn with_pipe(mut self, transform: Transform) -> Self {
        self.pipe.push(transform);
        self
    }

    pub fn with_when(mut self, condition: Condition) -> Self {
        self.when = Some(condition);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Whether the content passes through untouched
    pub fn is_passthrough(&self) -> bool {
        self.pick.is_empty()
            && self.omit.is_empty()
            && self.map.is_empty()
            && self.pipe.is_empty()
            && self.embed.is_none()
            && self.extract.is_none()
    }

    /// Whether the flow applies in this context
    pub fn applies(&self, ctx: &FlowContext) -> bool {
        self.when.as_ref().is_none_or(|c| c.evaluate(ctx))
    }
}
