//! Cross-platform path utilities
//!
//! Paths recorded in the workspace index are stored with forward slashes,
//! relative to the workspace when possible and relative to the home directory
//! (`~/...`) otherwise.

use std::path::{Path, PathBuf};

/// Characters that are unsafe in filesystem paths
/// Replaced with hyphens and collapsed: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`
const PATH_UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Convert a path to a string with forward slashes
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a package name safe for filesystem use.
///
/// Replaces unsafe characters (including `/`, `\`, and `:`) with hyphens.
/// Collapses consecutive hyphens into a single hyphen and removes leading/trailing hyphens.
/// Returns "unknown" if the result is empty.
///
/// # Examples
///
/// ```
/// use opkg::path_utils::make_path_safe;
///
/// assert_eq!(make_path_safe("@acme/tools"), "acme-tools");
/// assert_eq!(make_path_safe("@org/sub/repo"), "org-sub-repo");
/// assert_eq!(make_path_safe(":::"), "unknown");
/// ```
pub fn make_path_safe(name: &str) -> String {
    let key: String = name
        .trim_start_matches('@')
        .chars()
        .map(|c| {
            if PATH_UNSAFE_CHARS.contains(&c) {
                '-'
            } else {
                c
            }
        })
        .collect();

    let key = key
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if key.is_empty() {
        "unknown".to_string()
    } else {
        key
    }
}

/// Express `path` the way the index stores it.
///
/// Inside `workspace` this is the workspace-relative path; under the home
/// directory it is `~/...`; anything else is kept absolute.
pub fn to_index_path(path: &Path, workspace: &Path) -> String {
    if let Ok(relative) = path.strip_prefix(workspace) {
        return to_forward_slashes(relative);
    }
    if let Some(home) = dirs::home_dir()
        && let Ok(relative) = path.strip_prefix(&home)
    {
        return format!("~/{}", to_forward_slashes(relative));
    }
    to_forward_slashes(path)
}

/// Inverse of [`to_index_path`]
pub fn from_index_path(stored: &str, workspace: &Path) -> PathBuf {
    if let Some(rest) = stored.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    let path = Path::new(stored);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Canonicalize a directory without Windows `\\?\` prefixes, falling back to the input
pub fn canonical_dir(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_path_safe_basic() {
        assert_eq!(make_path_safe("@author/repo"), "author-repo");
        assert_eq!(make_path_safe("author/repo"), "author-repo");
    }

    #[test]
    fn test_make_path_safe_special_chars() {
        assert_eq!(
            make_path_safe("nested-repo:packages/pkg-a"),
            "nested-repo-packages-pkg-a"
        );
    }

    #[test]
    fn test_make_path_safe_empty() {
        assert_eq!(make_path_safe(":::"), "unknown");
        assert_eq!(make_path_safe("---"), "unknown");
    }

    #[test]
    fn test_make_path_safe_consecutive_hyphens() {
        assert_eq!(make_path_safe("a--b---c"), "a-b-c");
        assert_eq!(make_path_safe("--test--"), "test");
    }

    #[test]
    fn test_to_forward_slashes_windows() {
        let path = Path::new("C:\\Users\\file.txt");
        assert_eq!(to_forward_slashes(path), "C:/Users/file.txt");
    }

    #[test]
    fn test_index_path_inside_workspace() {
        let workspace = Path::new("/work/project");
        let target = workspace.join(".claude").join("commands").join("deploy.md");
        assert_eq!(to_index_path(&target, workspace), ".claude/commands/deploy.md");
        assert_eq!(
            from_index_path(".claude/commands/deploy.md", workspace),
            target
        );
    }

    #[test]
    fn test_index_path_under_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let workspace = Path::new("/definitely/not/home/ws");
        let target = home.join(".config").join("tool.json");

        let stored = to_index_path(&target, workspace);
        assert_eq!(stored, "~/.config/tool.json");
        assert_eq!(from_index_path(&stored, workspace), target);
    }
}
