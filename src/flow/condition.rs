//! `when` predicates over context variables
//!
//! ```jsonc
//! { "when": { "equals": { "var": "platform", "value": "claude" } } }
//! { "when": { "in": { "var": "direction", "values": ["install"] } } }
//! { "when": { "all": [ { "exists": { "var": "prefix" } }, { "not": { ... } } ] } }
//! ```

use serde::{Deserialize, Serialize};

use super::context::FlowContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Equals { var: String, value: String },
    In { var: String, values: Vec<String> },
    Exists { var: String },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn evaluate(&self, ctx: &FlowContext) -> bool {
        match self {
            Self::Equals { var, value } => ctx.variable(var).as_deref() == Some(value.as_str()),
            Self::In { var, values } => ctx
                .variable(var)
                .is_some_and(|actual| values.iter().any(|v| *v == actual)),
            Self::Exists { var } => ctx.variable(var).is_some(),
            Self::All(conditions) => conditions.iter().all(|c| c.evaluate(ctx)),
            Self::Any(conditions) => conditions.iter().any(|c| c.evaluate(ctx)),
            Self::Not(condition) => !condition.evaluate(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FlowContext {
        FlowContext::new("/ws", "/pkg", "cursor", "tools").with_variable("mode", "strict")
    }

    #[test]
    fn test_equals_and_in() {
        let cond: Condition =
            serde_json::from_str(r#"{"equals": {"var": "platform", "value": "cursor"}}"#).unwrap();
        assert!(cond.evaluate(&ctx()));

        let cond: Condition =
            serde_json::from_str(r#"{"in": {"var": "mode", "values": ["loose", "strict"]}}"#)
                .unwrap();
        assert!(cond.evaluate(&ctx()));
    }

    #[test]
    fn test_combinators() {
        let cond: Condition = serde_json::from_str(
            r#"{"all": [
                {"exists": {"var": "mode"}},
                {"not": {"equals": {"var": "platform", "value": "claude"}}}
            ]}"#,
        )
        .unwrap();
        assert!(cond.evaluate(&ctx()));

        let cond = Condition::Any(vec![Condition::Exists {
            var: "missing".to_string(),
        }]);
        assert!(!cond.evaluate(&ctx()));
    }
}
