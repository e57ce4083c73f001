//! # Query model
//!
//! Node classes for query documents, layered on the generic engine.
//!
//! - **[clauses]** - the tag registry and clause accessors (`display_name`,
//!   `dimension`, `field_id`, …)
//! - **[collections]** - canonical views over fields with several wire
//!   shapes, and how they are written back
//! - **[query]** - documents: questions, dataset queries and query stages
//!
//! ## Canonical collections
//!
//! ```text
//! wire "filter"                       canonical filters()
//! (absent)                        →   []
//! ["segment", 1]                  →   [["segment", 1]]
//! ["and", ["segment", 1], F2]     →   [["segment", 1], F2]
//! ```
//!
//! Writing back collapses the other way: no filters removes the field, one
//! filter is stored bare, two or more are wrapped in `"and"`.
pub mod clauses;
pub mod collections;
pub mod query;

pub use clauses::{Clause, ClauseCategory, ClauseKind, SortDirection};
pub use collections::ExpressionEntry;
pub use query::{Document, Query, Question, StructuredQuery, parse_document, parse_document_str};

use crate::{error::ModelError, metadata::Metadata, node::Key, node::Node, value::Value};

/// Runtime class of a node. Generic classes come from the data's shape; the
/// rest are assigned by the query model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// Any object without a more specific class
    Mapping,
    /// Any array without a more specific class
    Sequence,

    /// Saved question: a name plus a `dataset_query`
    Question,
    /// `{"type": "query", "query": …}`
    StructuredDatasetQuery,
    /// `{"type": "native", "native": …}`, passed through unwrapped
    NativeDatasetQuery,
    /// One stage of a structured query
    Query,
    /// Entry of a stage's `joins`
    Join,

    JoinList,
    AggregationList,
    BreakoutList,
    SortList,
    FieldList,
    /// `expressions` as stored: name → expression
    ExpressionMap,

    /// Canonical view of `filter`
    FilterList,
    /// Canonical view of `expressions` as `[name, expression]` entries
    ExpressionList,
    ExpressionEntry,

    Clause(ClauseKind),
}

impl NodeClass {
    /// Class a child of this class takes under `key`, if this class decides.
    pub(crate) fn child_class(self, data: &Value, key: &Key) -> Option<NodeClass> {
        match (self, key) {
            (NodeClass::Question, Key::Name(name)) if name == "dataset_query" => Some(dataset_query_class(data)),
            (NodeClass::StructuredDatasetQuery, Key::Name(name)) if name == "query" => Some(NodeClass::Query),
            (NodeClass::Query, Key::Name(name)) => query_field_class(name),
            (NodeClass::Join, Key::Name(name)) if name == "source-query" => Some(NodeClass::Query),
            (NodeClass::JoinList, _) if matches!(data, Value::Object(_)) => Some(NodeClass::Join),
            (NodeClass::ExpressionList, _) if matches!(data, Value::Array(_)) => Some(NodeClass::ExpressionEntry),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeClass::Mapping => "mapping",
            NodeClass::Sequence => "sequence",
            NodeClass::Question => "question",
            NodeClass::StructuredDatasetQuery => "structured dataset query",
            NodeClass::NativeDatasetQuery => "native dataset query",
            NodeClass::Query => "query",
            NodeClass::Join => "join",
            NodeClass::JoinList => "join list",
            NodeClass::AggregationList => "aggregation list",
            NodeClass::BreakoutList => "breakout list",
            NodeClass::SortList => "sort list",
            NodeClass::FieldList => "field list",
            NodeClass::ExpressionMap => "expression map",
            NodeClass::FilterList => "filter list",
            NodeClass::ExpressionList => "expression list",
            NodeClass::ExpressionEntry => "expression entry",
            NodeClass::Clause(kind) => kind.tag(),
        }
    }
}

fn dataset_query_class(data: &Value) -> NodeClass {
    match data.get("type").and_then(Value::as_str) {
        Some("native") => NodeClass::NativeDatasetQuery,
        _ => NodeClass::StructuredDatasetQuery,
    }
}

fn query_field_class(name: &str) -> Option<NodeClass> {
    match name {
        "source-query" => Some(NodeClass::Query),
        "joins" => Some(NodeClass::JoinList),
        "expressions" => Some(NodeClass::ExpressionMap),
        "aggregation" => Some(NodeClass::AggregationList),
        "breakout" => Some(NodeClass::BreakoutList),
        "order-by" => Some(NodeClass::SortList),
        "fields" => Some(NodeClass::FieldList),
        _ => None,
    }
}

impl Node {
    pub fn metadata(&self) -> Option<&dyn Metadata> {
        self.meta().metadata()
    }

    /// Nearest enclosing query stage, this node included.
    pub fn query(&self) -> Option<Query> {
        self.ancestor(NodeClass::Query).map(Query::new)
    }

    /// Nearest enclosing question, this node included.
    pub fn question(&self) -> Option<Question> {
        self.ancestor(NodeClass::Question).map(Question::new)
    }

    pub fn as_query(&self) -> Option<Query> {
        (self.class() == NodeClass::Query).then(|| Query::new(self.clone()))
    }

    pub fn as_clause(&self) -> Option<Clause> {
        match self.class() {
            NodeClass::Clause(kind) => Some(Clause::new(self.clone(), kind)),
            _ => None,
        }
    }

    pub fn as_expression_entry(&self) -> Option<ExpressionEntry> {
        (self.class() == NodeClass::ExpressionEntry).then(|| ExpressionEntry::new(self.clone()))
    }

    /// Human-readable label for clauses, expression entries and questions.
    pub fn display_name(&self) -> Result<String, ModelError> {
        match self.class() {
            NodeClass::Clause(kind) => Clause::new(self.clone(), kind).display_name(),
            NodeClass::ExpressionEntry => ExpressionEntry::new(self.clone()).name(),
            NodeClass::Question => Question::new(self.clone()).display_name(),
            class => Err(ModelError::NoDisplayName(class.name().to_string())),
        }
    }

    fn ancestor(&self, class: NodeClass) -> Option<Node> {
        let mut node = self.clone();
        while node.class() != class {
            node = node.parent()?;
        }
        Some(node)
    }
}
