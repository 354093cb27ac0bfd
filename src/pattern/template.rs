//! `{variable}` substitution in path patterns
//!
//! Only braces around a plain identifier are variables; anything else
//! (such as glob alternation `{a,b}`) is left untouched.

use crate::error::{Result, flow as flow_error};

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Substitute every `{identifier}` in `pattern` using `lookup`.
///
/// An identifier `lookup` cannot resolve is a resolution error.
pub fn render(pattern: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };

        let inner = &after[..close];
        if is_identifier(inner) {
            let value = lookup(inner).ok_or_else(|| flow_error::unresolved_variable(pattern, inner))?;
            out.push_str(&value);
        } else {
            out.push('{');
            out.push_str(inner);
            out.push('}');
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Whether the pattern references `{name}`
pub fn references(pattern: &str, variable: &str) -> bool {
    pattern.contains(&format!("{{{variable}}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpkgError;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "rootDir" => Some(".claude".to_string()),
            "name" => Some("deploy".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_render_variables() {
        assert_eq!(
            render("{rootDir}/commands/{name}.md", lookup).unwrap(),
            ".claude/commands/deploy.md"
        );
    }

    #[test]
    fn test_glob_alternation_untouched() {
        assert_eq!(
            render("rules/**/*.{md,mdc}", lookup).unwrap(),
            "rules/**/*.{md,mdc}"
        );
    }

    #[test]
    fn test_unresolved_variable_is_error() {
        let err = render(".x/{missing}/a.md", lookup).unwrap_err();
        assert!(matches!(
            err,
            OpkgError::PatternResolution { ref variable, .. } if variable == "missing"
        ));
    }

    #[test]
    fn test_unclosed_brace_kept() {
        assert_eq!(render("a/{b", lookup).unwrap(), "a/{b");
    }

    #[test]
    fn test_references() {
        assert!(references(".x/{name}/SKILL.md", "name"));
        assert!(!references(".x/*/SKILL.md", "name"));
    }
}
