//! Composite merge for shared root markdown files
//!
//! Each package's contribution to a file like `AGENTS.md` lives in its own
//! marker-delimited section:
//!
//! ```text
//! <!-- opkg:begin @acme/tools -->
//! ...package content...
//! <!-- opkg:end @acme/tools -->
//! ```
//!
//! Content outside sections (hand-written by the user) is never touched.

fn begin_marker(package: &str) -> String {
    format!("<!-- opkg:begin {package} -->")
}

fn end_marker(package: &str) -> String {
    format!("<!-- opkg:end {package} -->")
}

/// Byte range of a package's section, markers included
fn find_section(content: &str, package: &str) -> Option<(usize, usize)> {
    let begin = begin_marker(package);
    let end = end_marker(package);
    let start = content.find(&begin)?;
    let end_start = content[start..].find(&end)? + start;
    Some((start, end_start + end.len()))
}

fn render_section(package: &str, body: &str) -> String {
    format!(
        "{}\n{}\n{}",
        begin_marker(package),
        body.trim(),
        end_marker(package)
    )
}

/// Insert or replace a package's section.
///
/// An existing section is replaced in place so section order stays stable
/// across re-installs; a new section is appended.
pub fn upsert_section(existing: &str, package: &str, body: &str) -> String {
    let section = render_section(package, body);

    if let Some((start, end)) = find_section(existing, package) {
        let mut out = String::with_capacity(existing.len() + section.len());
        out.push_str(&existing[..start]);
        out.push_str(&section);
        out.push_str(&existing[end..]);
        return out;
    }

    let head = existing.trim_end();
    if head.is_empty() {
        format!("{section}\n")
    } else {
        format!("{head}\n\n{section}\n")
    }
}

/// Body of a package's section, trimmed
pub fn read_section(content: &str, package: &str) -> Option<String> {
    let (start, end) = find_section(content, package)?;
    let inner = &content[start + begin_marker(package).len()..end - end_marker(package).len()];
    Some(inner.trim().to_string())
}

/// Remove a package's section. Returns `None` when the package has no section.
pub fn remove_section(content: &str, package: &str) -> Option<String> {
    let (start, end) = find_section(content, package)?;
    let before = content[..start].trim_end();
    let after = content[end..].trim_start();

    let joined = match (before.is_empty(), after.is_empty()) {
        (true, true) => String::new(),
        (true, false) => after.to_string(),
        (false, true) => format!("{before}\n"),
        (false, false) => format!("{before}\n\n{after}"),
    };
    Some(joined)
}

/// Whether the file holds nothing but whitespace
pub fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}
