//! Tests for the format converter

use openpackage_project::detect::detect_format;
use openpackage_project::PackageFile;
use serde_json::json;

use crate::convert::{convert_to_universal, is_universal_file, validate_universal};

fn md(rel_path: &str, frontmatter: &str, body: &str) -> PackageFile {
    PackageFile::parse(rel_path, format!("---\n{frontmatter}---\n{body}")).unwrap()
}

#[test]
fn claude_agent_lifts_to_universal() {
    let files = vec![md(
        ".claude/agents/reviewer.md",
        "name: reviewer\ntools: Read, Write\npermissionMode: default\n",
        "# Reviewer\n",
    )];
    let detected = detect_format(&files);
    let outcome = convert_to_universal("reviewer", &files, &detected);

    assert!(outcome.files_converted >= 1);
    assert!(outcome.failed_files.is_empty());
    let converted = outcome
        .files
        .iter()
        .find(|file| file.rel_path == "agents/reviewer.md")
        .expect("converted agent missing");
    let fm = converted.frontmatter.as_ref().unwrap();
    assert_eq!(fm["tools"], json!(["read", "write"]));
    assert!(!fm.contains_key("permissionMode"));
    assert!(is_universal_file(converted));
}

#[test]
fn command_allowed_tools_renames() {
    let files = vec![md(
        ".claude/commands/fmt.md",
        "description: format\nallowed-tools: Bash, Edit\nargument-hint: '[path]'\n",
        "run fmt\n",
    )];
    let detected = detect_format(&files);
    let outcome = convert_to_universal("fmt", &files, &detected);
    let converted = outcome
        .files
        .iter()
        .find(|file| file.rel_path == "commands/fmt.md")
        .unwrap();
    let fm = converted.frontmatter.as_ref().unwrap();
    assert_eq!(fm["tools"], json!(["bash", "edit"]));
    assert!(!fm.contains_key("allowed-tools"));
    assert!(!fm.contains_key("argument-hint"));
}

#[test]
fn unknown_files_fail_without_aborting() {
    let files = vec![
        md(".claude/agents/a.md", "name: a\ntools: Read\n", "# A\n"),
        md("agents/u.md", "name: u\ntools:\n- read\n", "# U\n"),
        PackageFile::new("mystery/blob.txt", "???\n"),
    ];
    let detected = detect_format(&files);
    let outcome = convert_to_universal("demo", &files, &detected);
    assert_eq!(outcome.failed_files.len(), 1);
    assert!(outcome.failed_files.contains_key("mystery/blob.txt"));
    // the rest of the package still converted
    assert!(outcome
        .files
        .iter()
        .any(|file| file.rel_path == "agents/a.md"));
    assert!(outcome
        .files
        .iter()
        .any(|file| file.rel_path == "agents/u.md"));
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("mystery/blob.txt")));
}

#[test]
fn merge_conflict_prefers_universal_shape() {
    // both groups produce agents/a.md; the universal-shaped one must win
    let files = vec![
        md(".claude/agents/a.md", "name: a\ntools: Read\npermissionMode: default\n", "# C\n"),
        md("agents/a.md", "name: a\ntools:\n- read\n", "# U\n"),
    ];
    let detected = detect_format(&files);
    let outcome = convert_to_universal("demo", &files, &detected);
    let survivors: Vec<&PackageFile> = outcome
        .files
        .iter()
        .filter(|file| file.rel_path == "agents/a.md")
        .collect();
    assert_eq!(survivors.len(), 1);
    assert!(is_universal_file(survivors[0]));
}

#[test]
fn claude_md_merges_into_agents_md() {
    let files = vec![
        PackageFile::new("CLAUDE.md", "# Claude guidance\n"),
        md(".claude/agents/a.md", "name: a\ntools: Read\n", "# A\n"),
    ];
    let detected = detect_format(&files);
    let outcome = convert_to_universal("demo", &files, &detected);
    let agents_md = outcome
        .files
        .iter()
        .find(|file| file.rel_path == "AGENTS.md")
        .expect("AGENTS.md missing");
    assert!(agents_md.content.contains("Claude guidance"));
}

#[test]
fn opencode_object_tools_lift_to_arrays() {
    let files = vec![md(
        ".opencode/agent/scout.md",
        "description: scout\nmode: subagent\ntools:\n  Read: true\n  Write: false\n",
        "# Scout\n",
    )];
    let detected = detect_format(&files);
    let outcome = convert_to_universal("scout", &files, &detected);
    let converted = outcome
        .files
        .iter()
        .find(|file| file.rel_path == "agents/scout.md")
        .expect("converted opencode agent missing");
    let fm = converted.frontmatter.as_ref().unwrap();
    // only enabled tools survive, lowercased
    assert_eq!(fm["tools"], json!(["read"]));
    assert!(!fm.contains_key("mode"));
    assert!(is_universal_file(converted));
}

#[test]
fn windsurf_rules_drop_trigger() {
    let files = vec![md(
        ".windsurf/rules/style.md",
        "description: style rules\ntrigger: always_on\n",
        "Use tabs.\n",
    )];
    let detected = detect_format(&files);
    let outcome = convert_to_universal("styler", &files, &detected);
    let converted = outcome
        .files
        .iter()
        .find(|file| file.rel_path == "rules/style.md")
        .unwrap();
    assert!(!converted.frontmatter.as_ref().unwrap().contains_key("trigger"));
}

#[test]
fn validate_universal_flags_leftovers() {
    let good = md("agents/a.md", "tools:\n- read\n", "# A\n");
    let stringy = md("agents/b.md", "tools: Read\n", "# B\n");
    let vendor = md("agents/c.md", "permissionMode: default\n", "# C\n");
    assert!(validate_universal(&[good.clone()]).is_empty());
    assert_eq!(validate_universal(&[good, stringy, vendor]).len(), 2);
}
