//! Clause registry and clause accessors.
//!
//! A clause is an array whose first element is a registered tag:
//! `["field-id", 1]`, `["sum", ["field-id", 1]]`, `["and", F1, F2]`. The
//! registry is built once from [`ClauseKind::ALL`] and never changes; arrays
//! with an unknown tag stay generic sequences and still round-trip.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::LazyLock;

use crate::{
    error::ModelError,
    metadata::{Entity, Metadata},
    node::{Child, Key, Node},
    value::Value,
};

/// Every registered clause tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    // Field references
    FieldId,
    FieldLiteral,
    ForeignKey,
    JoinedField,
    DatetimeField,
    BinningStrategy,
    ExpressionRef,
    AggregationRef,

    // Aggregations
    Count,
    Sum,
    Average,
    CumulativeCount,
    CumulativeSum,
    Min,
    Max,
    Distinct,
    StdDev,
    Named,
    Metric,

    // Filters
    And,
    Or,
    Not,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Between,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    IsNull,
    NotNull,
    Inside,
    TimeInterval,
    Segment,

    // Sorts
    Ascending,
    Descending,

    // Expression arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Broad grouping of clause kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseCategory {
    FieldReference,
    Aggregation,
    Filter,
    Sort,
    Expression,
}

static REGISTRY: LazyLock<HashMap<&'static str, ClauseKind>> =
    LazyLock::new(|| ClauseKind::ALL.iter().map(|kind| (kind.tag(), *kind)).collect());

impl ClauseKind {
    pub const ALL: &'static [ClauseKind] = &[
        ClauseKind::FieldId,
        ClauseKind::FieldLiteral,
        ClauseKind::ForeignKey,
        ClauseKind::JoinedField,
        ClauseKind::DatetimeField,
        ClauseKind::BinningStrategy,
        ClauseKind::ExpressionRef,
        ClauseKind::AggregationRef,
        ClauseKind::Count,
        ClauseKind::Sum,
        ClauseKind::Average,
        ClauseKind::CumulativeCount,
        ClauseKind::CumulativeSum,
        ClauseKind::Min,
        ClauseKind::Max,
        ClauseKind::Distinct,
        ClauseKind::StdDev,
        ClauseKind::Named,
        ClauseKind::Metric,
        ClauseKind::And,
        ClauseKind::Or,
        ClauseKind::Not,
        ClauseKind::Equal,
        ClauseKind::NotEqual,
        ClauseKind::LessThan,
        ClauseKind::GreaterThan,
        ClauseKind::LessThanOrEqual,
        ClauseKind::GreaterThanOrEqual,
        ClauseKind::Between,
        ClauseKind::StartsWith,
        ClauseKind::EndsWith,
        ClauseKind::Contains,
        ClauseKind::DoesNotContain,
        ClauseKind::IsNull,
        ClauseKind::NotNull,
        ClauseKind::Inside,
        ClauseKind::TimeInterval,
        ClauseKind::Segment,
        ClauseKind::Ascending,
        ClauseKind::Descending,
        ClauseKind::Add,
        ClauseKind::Subtract,
        ClauseKind::Multiply,
        ClauseKind::Divide,
    ];

    pub fn from_tag(tag: &str) -> Option<ClauseKind> {
        REGISTRY.get(tag).copied()
    }

    pub fn tag(self) -> &'static str {
        use ClauseKind::*;
        match self {
            FieldId => "field-id",
            FieldLiteral => "field-literal",
            ForeignKey => "fk->",
            JoinedField => "joined-field",
            DatetimeField => "datetime-field",
            BinningStrategy => "binning-strategy",
            ExpressionRef => "expression",
            AggregationRef => "aggregation",
            Count => "count",
            Sum => "sum",
            Average => "avg",
            CumulativeCount => "cum-count",
            CumulativeSum => "cum-sum",
            Min => "min",
            Max => "max",
            Distinct => "distinct",
            StdDev => "stddev",
            Named => "named",
            Metric => "metric",
            And => "and",
            Or => "or",
            Not => "not",
            Equal => "=",
            NotEqual => "!=",
            LessThan => "<",
            GreaterThan => ">",
            LessThanOrEqual => "<=",
            GreaterThanOrEqual => ">=",
            Between => "between",
            StartsWith => "starts-with",
            EndsWith => "ends-with",
            Contains => "contains",
            DoesNotContain => "does-not-contain",
            IsNull => "is-null",
            NotNull => "not-null",
            Inside => "inside",
            TimeInterval => "time-interval",
            Segment => "segment",
            Ascending => "asc",
            Descending => "desc",
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
        }
    }

    pub fn category(self) -> ClauseCategory {
        use ClauseKind::*;
        match self {
            FieldId | FieldLiteral | ForeignKey | JoinedField | DatetimeField | BinningStrategy
            | ExpressionRef | AggregationRef => ClauseCategory::FieldReference,
            Count | Sum | Average | CumulativeCount | CumulativeSum | Min | Max | Distinct | StdDev
            | Named | Metric => ClauseCategory::Aggregation,
            Ascending | Descending => ClauseCategory::Sort,
            Add | Subtract | Multiply | Divide => ClauseCategory::Expression,
            _ => ClauseCategory::Filter,
        }
    }

    /// Label of aggregations that apply to a single dimension.
    fn aggregation_name(self) -> Option<&'static str> {
        use ClauseKind::*;
        match self {
            Sum => Some("Sum"),
            Average => Some("Average"),
            CumulativeCount => Some("Cumulative count"),
            CumulativeSum => Some("Cumulative sum"),
            Min => Some("Minimum"),
            Max => Some("Maximum"),
            Distinct => Some("Distinct values"),
            StdDev => Some("Standard deviation"),
            _ => None,
        }
    }

    fn infix(self) -> Option<&'static str> {
        use ClauseKind::*;
        match self {
            Equal | NotEqual | LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual => Some(self.tag()),
            StartsWith => Some("starts with"),
            EndsWith => Some("ends with"),
            Contains => Some("contains"),
            DoesNotContain => Some("does not contain"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn name(self) -> &'static str {
        match self {
            SortDirection::Ascending => "Ascending",
            SortDirection::Descending => "Descending",
        }
    }
}

/// A node of a registered clause kind, with positional accessors.
///
/// Accessors read fixed tuple slots (slot 0 is the tag). Reading a slot that
/// does not hold the expected shape is a [`ModelError::ShapeMismatch`].
#[derive(Debug, Clone)]
pub struct Clause {
    node: Node,
    kind: ClauseKind,
}

impl Deref for Clause {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl Clause {
    pub(crate) fn new(node: Node, kind: ClauseKind) -> Self {
        Clause { node, kind }
    }

    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// Arguments after the tag.
    pub fn operands(&self) -> Vec<Child> {
        (1..self.node.len()).filter_map(|i| self.node.get(i)).collect()
    }

    /// The field or expression a clause applies to.
    pub fn dimension(&self) -> Result<Node, ModelError> {
        self.node_at(1)
    }

    pub fn field_id(&self) -> Result<i64, ModelError> {
        self.int_at(1)
    }

    pub fn field(&self) -> Result<Entity, ModelError> {
        self.entity("field", self.field_id()?, |m, id| m.field(id))
    }

    pub fn foreign_key_dimension(&self) -> Result<Node, ModelError> {
        self.node_at(1)
    }

    pub fn target_dimension(&self) -> Result<Node, ModelError> {
        self.node_at(2)
    }

    pub fn unit(&self) -> Result<String, ModelError> {
        self.str_at(2)
    }

    pub fn strategy(&self) -> Result<String, ModelError> {
        self.str_at(2)
    }

    pub fn metric_id(&self) -> Result<i64, ModelError> {
        self.int_at(1)
    }

    pub fn segment_id(&self) -> Result<i64, ModelError> {
        self.int_at(1)
    }

    pub fn aggregation_index(&self) -> Result<usize, ModelError> {
        let index = self.int_at(1)?;
        usize::try_from(index).map_err(|_| ModelError::ShapeMismatch {
            expected: "non-negative index",
            key: Key::Index(1),
            found: "integer",
        })
    }

    /// The aggregation an `["aggregation", n]` reference points at: the nth
    /// entry of the enclosing query's aggregations.
    pub fn aggregation(&self) -> Result<Node, ModelError> {
        let index = self.aggregation_index()?;
        let query = self.node.query().ok_or(ModelError::Detached("query"))?;
        query.aggregations().node(index).ok_or(ModelError::ShapeMismatch {
            expected: "aggregation",
            key: Key::Index(index),
            found: "nothing",
        })
    }

    pub fn direction(&self) -> Option<SortDirection> {
        match self.kind {
            ClauseKind::Ascending => Some(SortDirection::Ascending),
            ClauseKind::Descending => Some(SortDirection::Descending),
            _ => None,
        }
    }

    pub fn display_name(&self) -> Result<String, ModelError> {
        use ClauseKind::*;
        let kind = self.kind;
        match kind {
            FieldId => Ok(self.field()?.display_name),
            FieldLiteral | ExpressionRef => self.str_at(1),
            ForeignKey => Ok(format!(
                "{} → {}",
                self.foreign_key_dimension()?.display_name()?,
                self.target_dimension()?.display_name()?
            )),
            JoinedField => Ok(format!("{} → {}", self.str_at(1)?, self.node_at(2)?.display_name()?)),
            DatetimeField => Ok(format!(
                "{}: {}",
                self.dimension()?.display_name()?,
                format_unit(&self.unit()?)
            )),
            BinningStrategy => Ok(format!("{}: {}", self.dimension()?.display_name()?, self.strategy()?)),
            AggregationRef => self.aggregation()?.display_name(),
            Count => Ok("Count".to_string()),
            Sum | Average | CumulativeCount | CumulativeSum | Min | Max | Distinct | StdDev => {
                let name = kind.aggregation_name().unwrap_or_default();
                Ok(format!("{} of {}", name, self.dimension()?.display_name()?))
            }
            Named => self.str_at(2),
            Metric => Ok(self.entity("metric", self.metric_id()?, |m, id| m.metric(id))?.display_name),
            Segment => Ok(self.entity("segment", self.segment_id()?, |m, id| m.segment(id))?.display_name),
            And | Or => {
                let names = self
                    .operands()
                    .into_iter()
                    .map(operand_name)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.join(if kind == And { " and " } else { " or " }))
            }
            Not => Ok(format!("not {}", self.operand_at(1)?)),
            Equal | NotEqual | LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual
            | StartsWith | EndsWith | Contains | DoesNotContain => Ok(format!(
                "{} {} {}",
                self.dimension()?.display_name()?,
                kind.infix().unwrap_or(kind.tag()),
                self.operand_at(2)?
            )),
            Between => Ok(format!(
                "{} between {} and {}",
                self.dimension()?.display_name()?,
                self.operand_at(2)?,
                self.operand_at(3)?
            )),
            IsNull => Ok(format!("{} is empty", self.dimension()?.display_name()?)),
            NotNull => Ok(format!("{} is not empty", self.dimension()?.display_name()?)),
            Inside => Ok(format!(
                "{} and {} inside bounds",
                self.dimension()?.display_name()?,
                self.node_at(2)?.display_name()?
            )),
            TimeInterval => self.time_interval_name(),
            Ascending | Descending => Ok(format!(
                "{}: {}",
                self.dimension()?.display_name()?,
                self.direction().map_or("", SortDirection::name)
            )),
            Add | Subtract | Multiply | Divide => {
                let names = self
                    .operands()
                    .into_iter()
                    .map(operand_name)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names.join(&format!(" {} ", kind.tag())))
            }
        }
    }

    fn time_interval_name(&self) -> Result<String, ModelError> {
        let field = self.dimension()?.display_name()?;
        let unit = self.str_at(3)?.replace('-', " ");
        let span = match self.node.value(2usize) {
            Some(Value::String(relative)) if relative == "current" => format!("is this {}", unit),
            Some(Value::String(relative)) => format!("is {} {}", relative, unit),
            Some(Value::Integer(0)) => format!("is this {}", unit),
            Some(Value::Integer(n)) if *n < 0 => format!("in the previous {} {}s", n.unsigned_abs(), unit),
            Some(Value::Integer(n)) => format!("in the next {} {}s", n, unit),
            other => return Err(mismatch("integer or relative string", 2, other)),
        };
        Ok(format!("{} {}", field, span))
    }

    fn entity(
        &self,
        kind: &'static str,
        id: i64,
        lookup: fn(&dyn Metadata, i64) -> Option<Entity>,
    ) -> Result<Entity, ModelError> {
        let metadata = self.node.metadata().ok_or(ModelError::MissingMetadata)?;
        lookup(metadata, id).ok_or(ModelError::UnknownEntity { kind, id })
    }

    fn node_at(&self, index: usize) -> Result<Node, ModelError> {
        match self.node.get(index) {
            Some(Child::Node(node)) => Ok(node),
            Some(Child::Value(value)) => Err(mismatch("clause", index, Some(&value))),
            None => Err(mismatch("clause", index, None)),
        }
    }

    fn int_at(&self, index: usize) -> Result<i64, ModelError> {
        let value = self.node.value(index);
        value.and_then(Value::as_int).ok_or_else(|| mismatch("integer", index, value))
    }

    fn str_at(&self, index: usize) -> Result<String, ModelError> {
        let value = self.node.value(index);
        value
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", index, value))
    }

    fn operand_at(&self, index: usize) -> Result<String, ModelError> {
        let operand = self.node.get(index).ok_or_else(|| mismatch("operand", index, None))?;
        operand_name(operand)
    }
}

/// Label for an operand: clauses by display name, literals as written.
fn operand_name(operand: Child) -> Result<String, ModelError> {
    match operand {
        Child::Node(node) => node.display_name(),
        Child::Value(value) => Ok(value.as_string()),
    }
}

fn mismatch(expected: &'static str, index: usize, found: Option<&Value>) -> ModelError {
    ModelError::ShapeMismatch {
        expected,
        key: Key::Index(index),
        found: found.map_or("nothing", Value::type_name),
    }
}

/// `"day-of-week"` → `"Day of week"`.
fn format_unit(unit: &str) -> String {
    let spaced = unit.replace('-', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
