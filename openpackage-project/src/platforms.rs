//! The platform registry
//!
//! Everything openpackage knows about vendor layouts lives here: which
//! dot-directory each platform roots its files at, the marker globs that
//! identify a package as belonging to it, the frontmatter schemas its files
//! follow, and the import/export flows that lift its files into the
//! universal layout and back. The detector, the converter, and the install
//! strategies are all driven off this one table.

use std::sync::OnceLock;

use crate::flows::{FieldTransform, Flow, MapOp, SwitchExpr};
use crate::PackageFile;

/// The id of the neutral ("universal") format
pub const UNIVERSAL: &str = "universal";

/// The path of a marketplace manifest inside a content root
///
/// A package carrying one is a container listing sub-packages; it is terminal
/// in the dependency graph and never installed directly.
pub const MARKETPLACE_MANIFEST: &str = ".claude-plugin/plugin.json";

/// Top-level files that are documentation roots, never renamed or prefixed
pub const ROOT_FILES: &[&str] = &["AGENTS.md", "CLAUDE.md", "README.md"];

/// Files that describe a package rather than belong to it; skipped by
/// direct-copy installs
pub const METADATA_FILES: &[&str] = &["openpackage.yml", MARKETPLACE_MANIFEST];

/// What shape a schema field's value is expected to have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any value counts
    Any,
    /// A YAML string
    Text,
    /// A YAML array
    Array,
    /// A YAML mapping
    Object,
    /// A YAML boolean
    Bool,
}

/// One field of a frontmatter schema
#[derive(Debug, Clone)]
pub struct SchemaField {
    /// The field name as it appears in frontmatter
    pub name: &'static str,
    /// How strongly this field's presence indicates the schema
    pub weight: f32,
    /// The value shape required for the field to count
    pub kind: FieldKind,
    /// Whether this field exists *only* in this platform's dialect
    ///
    /// Exclusive fields get extra scoring weight, and their presence makes a
    /// file not-universal.
    pub exclusive: bool,
}

impl SchemaField {
    fn new(name: &'static str, weight: f32, kind: FieldKind) -> Self {
        SchemaField {
            name,
            weight,
            kind,
            exclusive: false,
        }
    }

    fn exclusive(name: &'static str, weight: f32, kind: FieldKind) -> Self {
        SchemaField {
            name,
            weight,
            kind,
            exclusive: true,
        }
    }
}

/// A frontmatter schema for one resource kind of one platform
#[derive(Debug, Clone)]
pub struct FileSchema {
    /// The resource kind this schema describes (`agents`, `rules`, ...)
    pub resource_kind: &'static str,
    /// The glob the platform's flows route these files through
    ///
    /// A file whose path matches gets a detection confidence boost.
    pub flow_glob: String,
    /// The fields of the schema
    pub fields: Vec<SchemaField>,
}

/// Everything we know about one platform's layout
#[derive(Debug, Clone)]
pub struct PlatformSpec {
    /// Stable id (`claude`, `cursor`, ...)
    pub id: &'static str,
    /// The dot-prefixed directory the layout roots at
    pub dir: &'static str,
    /// Marker globs: a file matching any of these identifies the package as
    /// carrying this platform's layout
    pub markers: Vec<String>,
    /// Frontmatter schemas for the platform's resource kinds
    pub schemas: Vec<FileSchema>,
    /// Flows lifting this layout into the universal layout
    pub import_flows: Vec<Flow>,
    /// Flows lowering the universal layout into this layout
    pub export_flows: Vec<Flow>,
}

impl PlatformSpec {
    /// Whether a file path matches any of this platform's markers
    pub fn matches_marker(&self, rel_path: &str) -> bool {
        self.markers.iter().any(|marker| {
            glob::Pattern::new(marker)
                .map(|pattern| pattern.matches(rel_path))
                .unwrap_or(false)
        })
    }

    /// Every field name that is exclusive to this platform
    pub fn exclusive_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas
            .iter()
            .flat_map(|schema| schema.fields.iter())
            .filter(|field| field.exclusive)
            .map(|field| field.name)
    }
}

/// All registered vendor platforms
pub fn platforms() -> &'static [PlatformSpec] {
    static PLATFORMS: OnceLock<Vec<PlatformSpec>> = OnceLock::new();
    PLATFORMS.get_or_init(|| vec![claude(), cursor(), opencode(), windsurf()])
}

/// Look up a vendor platform by id
pub fn platform(id: &str) -> Option<&'static PlatformSpec> {
    platforms().iter().find(|platform| platform.id == id)
}

/// Marker globs for the universal layout
pub fn universal_markers() -> &'static [&'static str] {
    &[
        "agents/**",
        "commands/**",
        "rules/**",
        "skills/**",
        "hooks/**",
        "AGENTS.md",
    ]
}

/// Frontmatter schemas for the universal layout
pub fn universal_schemas() -> &'static [FileSchema] {
    static SCHEMAS: OnceLock<Vec<FileSchema>> = OnceLock::new();
    SCHEMAS.get_or_init(|| {
        vec![
            FileSchema {
                resource_kind: "agents",
                flow_glob: "agents/**/*.md".into(),
                fields: vec![
                    SchemaField::new("name", 1.0, FieldKind::Text),
                    SchemaField::new("description", 1.0, FieldKind::Text),
                    SchemaField::new("tools", 1.5, FieldKind::Array),
                ],
            },
            FileSchema {
                resource_kind: "commands",
                flow_glob: "commands/**/*.md".into(),
                fields: vec![
                    SchemaField::new("description", 1.0, FieldKind::Text),
                    SchemaField::new("tools", 1.5, FieldKind::Array),
                ],
            },
            FileSchema {
                resource_kind: "rules",
                flow_glob: "rules/**/*.md".into(),
                fields: vec![SchemaField::new("description", 1.0, FieldKind::Text)],
            },
        ]
    })
}

/// Export flows for a universal-format target: the identity mapping over
/// the kind directories plus the documentation root
pub fn universal_export_flows() -> &'static [Flow] {
    static FLOWS: OnceLock<Vec<Flow>> = OnceLock::new();
    FLOWS.get_or_init(|| {
        vec![
            Flow::new("agents/**", "agents/**"),
            Flow::new("commands/**", "commands/**"),
            Flow::new("rules/**", "rules/**"),
            Flow::new("skills/**", "skills/**"),
            Flow::new("hooks/**", "hooks/**"),
            Flow::new("AGENTS.md", "AGENTS.md"),
        ]
    })
}

/// Every frontmatter field that is exclusive to some vendor platform
///
/// A universal-format file must carry none of these.
pub fn vendor_exclusive_fields() -> &'static [&'static str] {
    static FIELDS: OnceLock<Vec<&'static str>> = OnceLock::new();
    FIELDS.get_or_init(|| {
        let mut fields: Vec<&'static str> = platforms()
            .iter()
            .flat_map(|platform| platform.exclusive_fields())
            .collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    })
}

/// Whether a set of package files carries a marketplace manifest
pub fn is_marketplace(files: &[PackageFile]) -> bool {
    files
        .iter()
        .any(|file| file.rel_path.as_str() == MARKETPLACE_MANIFEST)
}

/// Whether a path names a documented root file (never prefixed or renamed)
pub fn is_root_file(rel_path: &str) -> bool {
    ROOT_FILES.contains(&rel_path)
}

fn claude() -> PlatformSpec {
    PlatformSpec {
        id: "claude",
        dir: ".claude",
        markers: vec![".claude/**".into(), "CLAUDE.md".into()],
        schemas: vec![
            FileSchema {
                resource_kind: "agents",
                flow_glob: ".claude/agents/**/*.md".into(),
                fields: vec![
                    SchemaField::new("name", 1.0, FieldKind::Text),
                    SchemaField::new("description", 1.0, FieldKind::Text),
                    SchemaField::new("tools", 1.0, FieldKind::Text),
                    SchemaField::new("model", 1.0, FieldKind::Text),
                    SchemaField::exclusive("permissionMode", 2.0, FieldKind::Text),
                ],
            },
            FileSchema {
                resource_kind: "commands",
                flow_glob: ".claude/commands/**/*.md".into(),
                fields: vec![
                    SchemaField::new("description", 1.0, FieldKind::Text),
                    SchemaField::exclusive("allowed-tools", 2.0, FieldKind::Text),
                    SchemaField::exclusive("argument-hint", 2.0, FieldKind::Text),
                ],
            },
            FileSchema {
                resource_kind: "skills",
                flow_glob: ".claude/skills/**/*.md".into(),
                fields: vec![
                    SchemaField::new("name", 1.0, FieldKind::Text),
                    SchemaField::new("description", 1.0, FieldKind::Text),
                ],
            },
        ],
        import_flows: vec![
            Flow::new(".claude/agents/**/*.md", "agents/**/*.md").with_map(vec![
                MapOp::Transform {
                    field: "tools".into(),
                    transform: FieldTransform::ToolList,
                },
                MapOp::Unset {
                    field: "permissionMode".into(),
                },
            ]),
            Flow::new(".claude/commands/**/*.md", "commands/**/*.md").with_map(vec![
                MapOp::Rename {
                    from: "allowed-tools".into(),
                    to: "tools".into(),
                },
                MapOp::Transform {
                    field: "tools".into(),
                    transform: FieldTransform::ToolList,
                },
                MapOp::Unset {
                    field: "argument-hint".into(),
                },
            ]),
            Flow::new(".claude/skills/**", "skills/**"),
            Flow::new(".claude/hooks/**", "hooks/**"),
            Flow::new("CLAUDE.md", "AGENTS.md").merged(),
        ],
        export_flows: vec![
            Flow::new("agents/**/*.md", ".claude/agents/**/*.md").with_map(vec![
                MapOp::Transform {
                    field: "tools".into(),
                    transform: FieldTransform::CommaJoin,
                },
            ]),
            Flow::new("commands/**/*.md", ".claude/commands/**/*.md").with_map(vec![
                MapOp::Rename {
                    from: "tools".into(),
                    to: "allowed-tools".into(),
                },
                MapOp::Transform {
                    field: "allowed-tools".into(),
                    transform: FieldTransform::CommaJoin,
                },
            ]),
            Flow::new("skills/**", ".claude/skills/**"),
            Flow::new("hooks/**", ".claude/hooks/**"),
            Flow::new("rules/**/*.md", "CLAUDE.md").merged(),
            Flow::new("AGENTS.md", "CLAUDE.md").merged(),
        ],
    }
}

fn cursor() -> PlatformSpec {
    PlatformSpec {
        id: "cursor",
        dir: ".cursor",
        markers: vec![".cursor/**".into(), ".cursorrules".into()],
        schemas: vec![
            FileSchema {
                resource_kind: "rules",
                flow_glob: ".cursor/rules/**/*.mdc".into(),
                fields: vec![
                    SchemaField::new("description", 1.0, FieldKind::Text),
                    SchemaField::exclusive("globs", 2.0, FieldKind::Any),
                    SchemaField::exclusive("alwaysApply", 2.0, FieldKind::Bool),
                ],
            },
            FileSchema {
                resource_kind: "commands",
                flow_glob: ".cursor/commands/**/*.md".into(),
                fields: vec![SchemaField::new("description", 1.0, FieldKind::Text)],
            },
        ],
        import_flows: vec![
            // modern rules dir first; the legacy single-file form only if no
            // rules dir exists
            Flow {
                from: crate::flows::FlowPattern::Priority(vec![
                    ".cursor/rules/**/*.mdc".into(),
                    ".cursorrules".into(),
                ]),
                to: crate::flows::FlowPattern::Literal("rules/$$filename.md".into()),
                map: vec![
                    MapOp::Unset {
                        field: "globs".into(),
                    },
                    MapOp::Unset {
                        field: "alwaysApply".into(),
                    },
                ],
                merge: false,
            },
            Flow::new(".cursor/commands/**/*.md", "commands/**/*.md"),
        ],
        export_flows: vec![
            Flow::new("rules/**/*.md", ".cursor/rules/**/*.mdc"),
            Flow::new("commands/**/*.md", ".cursor/commands/**/*.md"),
            Flow::new("AGENTS.md", "AGENTS.md"),
        ],
    }
}

fn opencode() -> PlatformSpec {
    PlatformSpec {
        id: "opencode",
        dir: ".opencode",
        markers: vec![".opencode/**".into()],
        schemas: vec![
            FileSchema {
                resource_kind: "agents",
                flow_glob: ".opencode/agent/**/*.md".into(),
                fields: vec![
                    SchemaField::new("description", 1.0, FieldKind::Text),
                    SchemaField::exclusive("mode", 2.0, FieldKind::Text),
                    SchemaField::new("tools", 1.0, FieldKind::Object),
                    SchemaField::new("model", 1.0, FieldKind::Text),
                ],
            },
            FileSchema {
                resource_kind: "commands",
                flow_glob: ".opencode/command/**/*.md".into(),
                fields: vec![
                    SchemaField::new("description", 1.0, FieldKind::Text),
                    SchemaField::exclusive("agent", 2.0, FieldKind::Text),
                ],
            },
        ],
        import_flows: vec![
            Flow::new(".opencode/agent/**/*.md", "agents/**/*.md").with_map(vec![
                MapOp::Unset {
                    field: "mode".into(),
                },
                MapOp::Transform {
                    field: "tools".into(),
                    transform: FieldTransform::ToolList,
                },
            ]),
            Flow::new(".opencode/command/**/*.md", "commands/**/*.md").with_map(vec![
                MapOp::Unset {
                    field: "agent".into(),
                },
            ]),
        ],
        export_flows: vec![
            // primary agents sit at the agent dir root, subagents one level
            // down; universal files without a mode are primary
            Flow::new("agents/**/*.md", ".opencode/agent/**/*.md").with_target_switch(
                SwitchExpr::on_field("mode")
                    .case("subagent", ".opencode/agent/subagents/**/*.md")
                    .default_to(".opencode/agent/**/*.md"),
            ),
            Flow::new("commands/**/*.md", ".opencode/command/**/*.md"),
            Flow::new("AGENTS.md", "AGENTS.md"),
        ],
    }
}

fn windsurf() -> PlatformSpec {
    PlatformSpec {
        id: "windsurf",
        dir: ".windsurf",
        markers: vec![".windsurf/**".into()],
        schemas: vec![FileSchema {
            resource_kind: "rules",
            flow_glob: ".windsurf/rules/**/*.md".into(),
            fields: vec![
                SchemaField::new("description", 1.0, FieldKind::Text),
                SchemaField::exclusive("trigger", 2.0, FieldKind::Text),
                SchemaField::new("globs", 1.0, FieldKind::Any),
            ],
        }],
        import_flows: vec![
            Flow::new(".windsurf/rules/**/*.md", "rules/**/*.md").with_map(vec![
                MapOp::Unset {
                    field: "trigger".into(),
                },
            ]),
        ],
        export_flows: vec![Flow::new("rules/**/*.md", ".windsurf/rules/**/*.md")],
    }
}
