//! Discriminated switches over a context variable
//!
//! ```jsonc
//! { "switch": { "on": "platform", "cases": { "cursor": ".cursor/mcp.json" }, "default": ".mcp.json" } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::context::FlowContext;
use crate::error::{OpkgError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    /// Context variable the switch is keyed on
    pub on: String,
    pub cases: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Switch {
    /// Collapse the switch to one pattern for this context
    pub fn resolve(&self, ctx: &FlowContext) -> Result<&str> {
        let value = ctx.variable(&self.on);

        if let Some(pattern) = value.as_deref().and_then(|v| self.cases.get(v)) {
            return Ok(pattern);
        }

        self.default
            .as_deref()
            .ok_or_else(|| OpkgError::SwitchUnmatched {
                variable: self.on.clone(),
                value: value.unwrap_or_else(|| "<unset>".to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch(default: Option<&str>) -> Switch {
        Switch {
            on: "platform".to_string(),
            cases: BTreeMap::from([("cursor".to_string(), ".cursor/mcp.json".to_string())]),
            default: default.map(str::to_string),
        }
    }

    #[test]
    fn test_matching_case() {
        let ctx = FlowContext::new("/ws", "/pkg", "cursor", "tools");
        assert_eq!(switch(None).resolve(&ctx).unwrap(), ".cursor/mcp.json");
    }

    #[test]
    fn test_default_case() {
        let ctx = FlowContext::new("/ws", "/pkg", "claude", "tools");
        assert_eq!(switch(Some(".mcp.json")).resolve(&ctx).unwrap(), ".mcp.json");
    }

    #[test]
    fn test_unmatched_without_default() {
        let ctx = FlowContext::new("/ws", "/pkg", "claude", "tools");
        let err = switch(None).resolve(&ctx).unwrap_err();
        assert!(matches!(err, OpkgError::SwitchUnmatched { ref value, .. } if value == "claude"));
    }
}
