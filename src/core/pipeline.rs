//! Typed aggregation pipeline stages
//!
//! A [`Pipeline`] is an ordered list of [`Stage`] descriptors. It says nothing
//! about the store that will run it: storage backends translate the stages
//! into their native query language at the boundary (see
//! `storage::mongodb::stage_to_document` and `storage::in_memory::evaluate`).
//!
//! # Example
//!
//! ```rust
//! use catalog_api::core::pipeline::{Accumulator, Expr, Group, Pipeline, SortOrder};
//!
//! let pipeline = Pipeline::new()
//!     .group(
//!         Group::by(Expr::field("category"))
//!             .accumulate("count", Accumulator::Count),
//!     )
//!     .sort_by("count", SortOrder::Descending)
//!     .limit(3);
//!
//! assert_eq!(pipeline.len(), 3);
//! ```

use serde_json::Value;

/// Name of the key field produced by a group stage
pub const GROUP_KEY: &str = "_id";

/// Largest skip or limit a page may carry; stores take signed 64-bit counts
pub const MAX_PAGE_OFFSET: u64 = i64::MAX as u64;

/// Sort direction for a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Numeric direction as used by document stores (`1` / `-1`)
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}

/// One key of a sort stage
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// A filter condition evaluated against a single document
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the given value
    Eq { field: String, value: Value },

    /// Field is strictly greater than the given value
    Gt { field: String, value: Value },

    /// Field is a string matching the regular expression
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },

    /// At least one of the conditions holds
    Any(Vec<Condition>),

    /// Every condition holds
    All(Vec<Condition>),
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive literal substring match
    ///
    /// The text is escaped, so regex metacharacters in user input match
    /// themselves.
    pub fn contains_ignore_case(field: impl Into<String>, text: &str) -> Self {
        Condition::Regex {
            field: field.into(),
            pattern: regex::escape(text),
            case_insensitive: true,
        }
    }
}

/// A value computed from a document
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Value of a (possibly dotted) field path
    Field(String),

    /// Product of the operands
    Multiply(Vec<Expr>),
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(name.into())
    }

    pub fn multiply(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Multiply(operands.into_iter().collect())
    }
}

/// Per-group aggregate function
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Number of documents in the group
    Count,
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
}

/// Group stage: partition by `key`, compute one output field per accumulator
///
/// The key value is emitted under [`GROUP_KEY`].
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Expr,
    pub fields: Vec<(String, Accumulator)>,
}

impl Group {
    pub fn by(key: Expr) -> Self {
        Self {
            key,
            fields: Vec::new(),
        }
    }

    pub fn accumulate(mut self, name: impl Into<String>, accumulator: Accumulator) -> Self {
        self.fields.push((name.into(), accumulator));
        self
    }
}

/// One output field of a project stage
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectField {
    /// Copy the field unchanged
    Keep(String),

    /// Emit `name` computed from `from`
    Rename { name: String, from: Expr },
}

impl ProjectField {
    pub fn keep(name: impl Into<String>) -> Self {
        ProjectField::Keep(name.into())
    }

    pub fn rename(name: impl Into<String>, from: Expr) -> Self {
        ProjectField::Rename {
            name: name.into(),
            from,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProjectField::Keep(name) | ProjectField::Rename { name, .. } => name,
        }
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Condition),
    Sort(Vec<SortKey>),
    Group(Group),
    /// Output only the listed fields; the store identifier is dropped unless listed
    Project(Vec<ProjectField>),
    Skip(u64),
    Limit(u64),
    /// Replace the stream by a single document `{ <name>: n }` (nothing when n = 0)
    Count(String),
}

/// Ordered sequence of stages, submitted to a store as a unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary stage
    pub fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn filter(self, condition: Condition) -> Self {
        self.push(Stage::Match(condition))
    }

    pub fn sort(self, key: SortKey) -> Self {
        self.push(Stage::Sort(vec![key]))
    }

    pub fn sort_by(self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort(SortKey {
            field: field.into(),
            order,
        })
    }

    pub fn group(self, group: Group) -> Self {
        self.push(Stage::Group(group))
    }

    pub fn project(self, fields: impl IntoIterator<Item = ProjectField>) -> Self {
        self.push(Stage::Project(fields.into_iter().collect()))
    }

    pub fn skip(self, n: u64) -> Self {
        self.push(Stage::Skip(n))
    }

    pub fn limit(self, n: u64) -> Self {
        self.push(Stage::Limit(n))
    }

    pub fn count(self, name: impl Into<String>) -> Self {
        self.push(Stage::Count(name.into()))
    }

    /// Copy of this pipeline restricted to one page
    ///
    /// `page` starts at 1; skip is `(page - 1) * limit`. Both counts are
    /// capped at [`MAX_PAGE_OFFSET`].
    pub fn paginated(&self, page: u64, limit: u64) -> Self {
        let skip = page.saturating_sub(1).saturating_mul(limit);
        self.clone()
            .skip(skip.min(MAX_PAGE_OFFSET))
            .limit(limit.min(MAX_PAGE_OFFSET))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Whether any stage filters documents
    pub fn has_match(&self) -> bool {
        self.stages.iter().any(|s| matches!(s, Stage::Match(_)))
    }
}
