//! The flow data model
//!
//! A flow maps source files to target paths, with optional frontmatter
//! rewriting along the way. `from` and `to` are *trees*, not strings: a
//! pattern is either a literal glob, an ordered priority list of globs, or a
//! switch expression. Evaluation (in `openpackage::flow`) does structural
//! case analysis on these; there is deliberately no implicit string
//! coercion.

use serde_json::Value;

/// A declarative source → target mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    /// What source files this flow covers
    pub from: FlowPattern,
    /// Where they land
    pub to: FlowPattern,
    /// Frontmatter rewrites applied to each covered file
    pub map: Vec<MapOp>,
    /// Whether the target is a shared file this flow merges into, rather
    /// than owning outright
    pub merge: bool,
}

impl Flow {
    /// A plain literal-to-literal flow with no rewrites
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Flow {
            from: FlowPattern::Literal(from.into()),
            to: FlowPattern::Literal(to.into()),
            map: Vec::new(),
            merge: false,
        }
    }

    /// Attach frontmatter rewrites
    pub fn with_map(mut self, map: Vec<MapOp>) -> Self {
        self.map = map;
        self
    }

    /// Use a switch expression for the target
    pub fn with_target_switch(mut self, switch: SwitchExpr) -> Self {
        self.to = FlowPattern::Switch(switch);
        self
    }

    /// Mark the target as a shared file to merge into
    pub fn merged(mut self) -> Self {
        self.merge = true;
        self
    }
}

/// A source or target pattern
#[derive(Debug, Clone, PartialEq)]
pub enum FlowPattern {
    /// One glob (or literal path)
    Literal(String),
    /// An ordered priority list: the first glob with any matches wins
    Priority(Vec<String>),
    /// A switch expression whose cases produce patterns
    Switch(SwitchExpr),
}

/// A first-match-wins switch over a frontmatter field or a context value
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchExpr {
    /// What the cases are matched against
    pub on: SwitchInput,
    /// The cases, tried in order
    pub cases: Vec<SwitchCase>,
    /// Fallback when no case matches; `None` leaves the value unchanged
    pub default: Option<String>,
}

/// The scrutinee of a switch
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchInput {
    /// A field of the current file's frontmatter
    Field(String),
    /// A synthetic context value (e.g. the detected platform id)
    Context(String),
}

/// One arm of a switch
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// What the scrutinee must look like
    pub pattern: SwitchPattern,
    /// The pattern/value this arm produces
    pub value: String,
}

/// How a switch arm matches its scrutinee
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchPattern {
    /// String glob over the scrutinee's string form
    Glob(String),
    /// Shape match over an object scrutinee: every listed key must match.
    ///
    /// The special key `"*"` means "every key of the scrutinee has this
    /// value".
    Shape(serde_json::Map<String, Value>),
}

impl SwitchExpr {
    /// A switch over a frontmatter field
    pub fn on_field(field: impl Into<String>) -> Self {
        SwitchExpr {
            on: SwitchInput::Field(field.into()),
            cases: Vec::new(),
            default: None,
        }
    }

    /// A switch over a context value
    pub fn on_context(key: impl Into<String>) -> Self {
        SwitchExpr {
            on: SwitchInput::Context(key.into()),
            cases: Vec::new(),
            default: None,
        }
    }

    /// Add a glob-matching case
    pub fn case(mut self, pattern: impl Into<String>, value: impl Into<String>) -> Self {
        self.cases.push(SwitchCase {
            pattern: SwitchPattern::Glob(pattern.into()),
            value: value.into(),
        });
        self
    }

    /// Add a shape-matching case
    pub fn shape_case(
        mut self,
        shape: serde_json::Map<String, Value>,
        value: impl Into<String>,
    ) -> Self {
        self.cases.push(SwitchCase {
            pattern: SwitchPattern::Shape(shape),
            value: value.into(),
        });
        self
    }

    /// Set the fallback value
    pub fn default_to(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One frontmatter rewrite step
#[derive(Debug, Clone, PartialEq)]
pub enum MapOp {
    /// Set a field to a fixed value
    Set {
        /// Field to set
        field: String,
        /// Value to set it to
        value: Value,
    },
    /// Rename a field, keeping its value
    Rename {
        /// Current field name
        from: String,
        /// New field name
        to: String,
    },
    /// Remove a field
    Unset {
        /// Field to remove
        field: String,
    },
    /// Replace a field's value via a switch over its current value
    Switch {
        /// Field to rewrite
        field: String,
        /// The switch to run; its `on` input is ignored in favor of `field`
        expr: SwitchExpr,
    },
    /// Apply a built-in transform to a field's value
    Transform {
        /// Field to transform
        field: String,
        /// Which transform
        transform: FieldTransform,
    },
    /// Copy a field's value to another field, keeping the original
    Copy {
        /// Source field
        from: String,
        /// Destination field
        to: String,
    },
}

/// Built-in field transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTransform {
    /// Lift a vendor tool list into the neutral form: a comma-separated
    /// string (`"Read, Write"`) or an array becomes a lowercase string array
    /// (`["read", "write"]`)
    ToolList,
    /// Join a string array into a comma-separated string (the reverse
    /// direction, for vendor layouts that want `"read, write"`)
    CommaJoin,
    /// Lowercase a string value
    Lowercase,
}
