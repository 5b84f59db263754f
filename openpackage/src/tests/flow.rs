//! Tests for the flow engine: patterns, switches, maps, targets

use camino::Utf8PathBuf;
use openpackage_project::flows::{FieldTransform, Flow, FlowPattern, MapOp, SwitchExpr};
use openpackage_project::PackageFile;
use serde_json::json;

use crate::flow::pattern::{match_with_captures, splice_captures};
use crate::flow::switch::eval_switch_on;
use crate::flow::target::{resolve_target, FlowContext};
use crate::flow::{plan_flows, FlowPlan};

fn md(rel_path: &str, frontmatter: &str, body: &str) -> PackageFile {
    PackageFile::parse(rel_path, format!("---\n{frontmatter}---\n{body}")).unwrap()
}

fn ctx() -> FlowContext {
    FlowContext::new("reviewer", "/src", "/workspace")
}

#[test]
fn captures_follow_wildcards() {
    let captures =
        match_with_captures(".claude/agents/**/*.md", ".claude/agents/deep/reviewer.md").unwrap();
    assert_eq!(captures, vec!["deep".to_owned(), "reviewer".to_owned()]);

    let captures = match_with_captures("agents/*.md", "agents/helper.md").unwrap();
    assert_eq!(captures, vec!["helper".to_owned()]);

    // `**` can match nothing
    let captures =
        match_with_captures(".claude/agents/**/*.md", ".claude/agents/reviewer.md").unwrap();
    assert_eq!(captures, vec!["".to_owned(), "reviewer".to_owned()]);

    assert!(match_with_captures("agents/*.md", "commands/helper.md").is_none());
}

#[test]
fn splice_carries_fragments_across() {
    assert_eq!(
        splice_captures("agents/**/*.md", &["deep".to_owned(), "reviewer".to_owned()]),
        "agents/deep/reviewer.md"
    );
    // an empty `**` capture collapses instead of leaving a double slash
    assert_eq!(
        splice_captures("agents/**/*.md", &["".to_owned(), "reviewer".to_owned()]),
        "agents/reviewer.md"
    );
}

#[test]
fn priority_uses_first_non_empty_and_warns_on_shadowing() {
    let files = vec![
        PackageFile::new(".cursor/rules/style.mdc", "style\n"),
        PackageFile::new(".cursorrules", "legacy\n"),
    ];
    let flows = vec![Flow {
        from: FlowPattern::Priority(vec![
            ".cursor/rules/**/*.mdc".to_owned(),
            ".cursorrules".to_owned(),
        ]),
        to: FlowPattern::Literal("rules/$$filename.md".to_owned()),
        map: Vec::new(),
        merge: false,
    }];
    let plan: FlowPlan = plan_flows(&files, &flows, &ctx());
    // only the modern form was taken
    assert_eq!(plan.writes.len(), 1);
    assert_eq!(plan.writes[0].target, Utf8PathBuf::from("rules/style.md"));
    // and the shadowed legacy pattern is called out
    assert!(plan.warnings.iter().any(|w| w.contains(".cursorrules")));
    assert_eq!(plan.unmatched, vec![Utf8PathBuf::from(".cursorrules")]);
}

#[test]
fn empty_priority_list_warns() {
    let files = vec![PackageFile::new("agents/a.md", "a\n")];
    let flows = vec![Flow {
        from: FlowPattern::Priority(Vec::new()),
        to: FlowPattern::Literal("agents/**".to_owned()),
        map: Vec::new(),
        merge: false,
    }];
    let plan = plan_flows(&files, &flows, &ctx());
    assert!(plan.writes.is_empty());
    assert!(plan.warnings.iter().any(|w| w.contains("empty priority")));
}

#[test]
fn switch_target_first_match_wins() {
    let files = vec![
        md("agents/main.md", "description: main\nmode: subagent\n", "# M\n"),
        md("agents/other.md", "description: other\n", "# O\n"),
    ];
    let flows = vec![Flow::new("agents/**/*.md", ".opencode/agent/**/*.md")
        .with_target_switch(
            SwitchExpr::on_field("mode")
                .case("subagent", ".opencode/agent/subagents/**/*.md")
                .default_to(".opencode/agent/**/*.md"),
        )];
    let plan = plan_flows(&files, &flows, &ctx());
    let targets: Vec<&str> = plan.writes.iter().map(|w| w.target.as_str()).collect();
    assert!(targets.contains(&".opencode/agent/subagents/main.md"));
    assert!(targets.contains(&".opencode/agent/other.md"));
}

#[test]
fn switch_shape_matching() {
    let expr = SwitchExpr::on_field("tools")
        .shape_case(
            serde_json::Map::from_iter([("read".to_owned(), json!(true))]),
            "readers".to_owned(),
        )
        .shape_case(
            serde_json::Map::from_iter([("*".to_owned(), json!(false))]),
            "disabled".to_owned(),
        )
        .default_to("mixed");

    let readers = json!({"read": true, "write": false});
    assert_eq!(eval_switch_on(&expr, Some(&readers)), Some("readers".to_owned()));

    let disabled = json!({"read": false, "write": false});
    assert_eq!(eval_switch_on(&expr, Some(&disabled)), Some("disabled".to_owned()));

    let neither = json!({"write": true});
    assert_eq!(eval_switch_on(&expr, Some(&neither)), Some("mixed".to_owned()));

    // no scrutinee and no matching case: the default still answers
    assert_eq!(eval_switch_on(&expr, None), Some("mixed".to_owned()));

    // without a default, no match leaves the value alone
    let bare = SwitchExpr::on_field("tools").case("x", "y");
    assert_eq!(eval_switch_on(&bare, None), None);
}

#[test]
fn switch_over_context_values() {
    // a from-switch keyed on a synthetic context value picks the pattern
    let files = vec![
        PackageFile::new(".claude/agents/a.md", "# A\n"),
        PackageFile::new(".cursor/rules/r.mdc", "# R\n"),
    ];
    let mut switched = ctx();
    switched
        .vars
        .insert("platform".to_owned(), "claude".to_owned());
    let flows = vec![Flow {
        from: FlowPattern::Switch(
            SwitchExpr::on_context("platform")
                .case("claude", ".claude/**")
                .case("cursor", ".cursor/**"),
        ),
        to: FlowPattern::Literal("picked/$$filename.md".to_owned()),
        map: Vec::new(),
        merge: false,
    }];
    let plan = plan_flows(&files, &flows, &switched);
    assert_eq!(plan.writes.len(), 1);
    assert_eq!(plan.writes[0].source, Utf8PathBuf::from(".claude/agents/a.md"));
    assert_eq!(plan.writes[0].target, Utf8PathBuf::from("picked/a.md"));
}

#[test]
fn map_pipeline_rewrites_frontmatter() {
    let mut frontmatter = Some(
        md(
            "a.md",
            "tools: Read, Write\npermissionMode: default\nname: reviewer\n",
            "",
        )
        .frontmatter
        .unwrap(),
    );
    crate::flow::map::apply_map(
        &[
            MapOp::Transform {
                field: "tools".to_owned(),
                transform: FieldTransform::ToolList,
            },
            MapOp::Unset {
                field: "permissionMode".to_owned(),
            },
            MapOp::Rename {
                from: "name".to_owned(),
                to: "title".to_owned(),
            },
            MapOp::Copy {
                from: "title".to_owned(),
                to: "slug".to_owned(),
            },
            MapOp::Set {
                field: "kind".to_owned(),
                value: json!("agent"),
            },
        ],
        &mut frontmatter,
    );
    let fm = frontmatter.unwrap();
    assert_eq!(fm["tools"], json!(["read", "write"]));
    assert!(!fm.contains_key("permissionMode"));
    assert!(!fm.contains_key("name"));
    assert_eq!(fm["title"], json!("reviewer"));
    assert_eq!(fm["slug"], json!("reviewer"));
    assert_eq!(fm["kind"], json!("agent"));
}

#[test]
fn tool_list_handles_every_input_shape() {
    let mut fm = Some(serde_json::Map::from_iter([(
        "tools".to_owned(),
        json!({"Read": true, "Write": false}),
    )]));
    crate::flow::map::apply_map(
        &[MapOp::Transform {
            field: "tools".to_owned(),
            transform: FieldTransform::ToolList,
        }],
        &mut fm,
    );
    assert_eq!(fm.unwrap()["tools"], json!(["read"]));

    let mut fm = Some(serde_json::Map::from_iter([(
        "tools".to_owned(),
        json!(["Read", "Grep"]),
    )]));
    crate::flow::map::apply_map(
        &[MapOp::Transform {
            field: "tools".to_owned(),
            transform: FieldTransform::CommaJoin,
        }],
        &mut fm,
    );
    assert_eq!(fm.unwrap()["tools"], json!("Read, Grep"));
}

#[test]
fn target_variables_substitute() {
    let target = resolve_target(
        Utf8PathBuf::from(".cursorrules").as_path(),
        &[],
        "rules/$$filename.md",
        &ctx(),
    );
    assert_eq!(target, Utf8PathBuf::from("rules/cursorrules.md"));

    let target = resolve_target(
        Utf8PathBuf::from("commands/deep/run.md").as_path(),
        &[],
        "out/$$dirname/$$filename.$$ext",
        &ctx(),
    );
    assert_eq!(target, Utf8PathBuf::from("out/deep/run.md"));
}

#[test]
fn prefixing_rules() {
    let mut prefixed = ctx();
    prefixed.with_prefix = true;

    // plain files get the short name on the filename
    let target = resolve_target(
        Utf8PathBuf::from("agents/helper.md").as_path(),
        &["".to_owned(), "helper".to_owned()],
        "agents/**/*.md",
        &prefixed,
    );
    assert_eq!(target, Utf8PathBuf::from("agents/reviewer-helper.md"));

    // in a skills tree the skill directory is prefixed, not the file
    let target = resolve_target(
        Utf8PathBuf::from("skills/lint/SKILL.md").as_path(),
        &["lint/SKILL.md".to_owned()],
        "skills/**",
        &prefixed,
    );
    assert_eq!(target, Utf8PathBuf::from("skills/reviewer-lint/SKILL.md"));

    // documented root files are never prefixed
    let target = resolve_target(
        Utf8PathBuf::from("AGENTS.md").as_path(),
        &[],
        "AGENTS.md",
        &prefixed,
    );
    assert_eq!(target, Utf8PathBuf::from("AGENTS.md"));

    // marketplace qualifiers are stripped down to the short name
    let mut scoped = prefixed.clone();
    scoped.package_name = "@acme/mega-market/reviewer".to_owned();
    let target = resolve_target(
        Utf8PathBuf::from("agents/helper.md").as_path(),
        &["".to_owned(), "helper".to_owned()],
        "agents/**/*.md",
        &scoped,
    );
    assert_eq!(target, Utf8PathBuf::from("agents/reviewer-helper.md"));
}

#[test]
fn first_matching_flow_claims_the_file() {
    let files = vec![md("agents/a.md", "name: a\n", "# A\n")];
    let flows = vec![
        Flow::new("agents/**/*.md", "first/**/*.md"),
        Flow::new("agents/**", "second/**"),
    ];
    let plan = plan_flows(&files, &flows, &ctx());
    assert_eq!(plan.writes.len(), 1);
    assert_eq!(plan.writes[0].target, Utf8PathBuf::from("first/a.md"));
}
