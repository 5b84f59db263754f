//! Fenced YAML frontmatter parsing and rendering
//!
//! Markdown-family artifacts carry their metadata in a `---` fenced YAML
//! block at the top of the file. We parse that block into a
//! [`Frontmatter`][crate::Frontmatter] (a `serde_json` map, which is what the
//! flow map pipeline manipulates) and can re-render it losslessly enough for
//! round-trips: same fields, same order, YAML-normalized formatting.

use crate::Frontmatter;

/// Split a document into its raw frontmatter YAML and body, if fenced
///
/// The opening fence must be the very first line. The body starts after the
/// closing fence line.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    // the opening fence must be a lone `---` line
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// The body of a document, with any frontmatter fence stripped
pub fn body_of(content: &str) -> &str {
    match split_frontmatter(content) {
        Some((_, body)) => body,
        None => content,
    }
}

/// Parse a document's frontmatter into a field map
///
/// Returns `Ok(None)` for documents without a fence, and for fences whose
/// YAML is something other than a mapping (those aren't metadata we can work
/// with, and passing them through untouched is the safe behavior).
pub fn parse_frontmatter(content: &str) -> Result<Option<Frontmatter>, serde_yml::Error> {
    let Some((yaml, _)) = split_frontmatter(content) else {
        return Ok(None);
    };
    if yaml.trim().is_empty() {
        return Ok(Some(Frontmatter::new()));
    }
    let value: serde_json::Value = serde_yml::from_str(yaml)?;
    match value {
        serde_json::Value::Object(map) => Ok(Some(map)),
        _ => Ok(None),
    }
}

/// Render a frontmatter map and body back into a fenced document
pub fn render_frontmatter(
    frontmatter: &Frontmatter,
    body: &str,
) -> Result<String, serde_yml::Error> {
    if frontmatter.is_empty() {
        return Ok(body.to_owned());
    }
    let yaml = serde_yml::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n{body}"))
}
