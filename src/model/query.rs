//! Document views: questions, dataset queries and query stages.
//!
//! Every view is a thin wrapper over a [`Node`] and derefs to it, so the
//! generic navigation and edit operations stay available. Collection
//! accessors return canonical sequences that write themselves back in wire
//! shape when `parent()` is called on them.

use std::ops::Deref;

use tracing::{debug, instrument};

use super::NodeClass;
use crate::{
    convert,
    engine::Engine,
    error::{Error, ModelError},
    metadata::{Entity, Meta, Metadata},
    node::{Child, Key, Node},
    value::Value,
};

/// One stage of a structured query.
#[derive(Debug, Clone)]
pub struct Query {
    node: Node,
}

impl Deref for Query {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl Query {
    pub(crate) fn new(node: Node) -> Self {
        Query { node }
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// Filters as a flat sequence, whatever the wire shape of `filter`.
    pub fn filters(&self) -> Node {
        let filters = match self.node.value("filter") {
            None => Vec::new(),
            Some(Value::Array(items)) if items.first().and_then(Value::as_str) == Some("and") => {
                items.iter().skip(1).cloned().collect()
            }
            Some(filter) => vec![filter.clone()],
        };
        self.node
            .view(Key::from("filter"), Value::array(filters), NodeClass::FilterList)
    }

    pub fn aggregations(&self) -> Node {
        self.nullable("aggregation", NodeClass::AggregationList)
    }

    pub fn breakouts(&self) -> Node {
        self.nullable("breakout", NodeClass::BreakoutList)
    }

    pub fn sorts(&self) -> Node {
        self.nullable("order-by", NodeClass::SortList)
    }

    pub fn fields(&self) -> Node {
        self.nullable("fields", NodeClass::FieldList)
    }

    pub fn joins(&self) -> Node {
        self.nullable("joins", NodeClass::JoinList)
    }

    /// Named expressions as `[name, expression]` entries, in wire order.
    pub fn expressions(&self) -> Node {
        let entries = match self.node.value("expressions") {
            Some(Value::Object(members)) => members
                .iter()
                .map(|(name, expression)| Value::array(vec![Value::from(name.as_str()), expression.clone()]))
                .collect(),
            _ => Vec::new(),
        };
        self.node
            .view(Key::from("expressions"), Value::array(entries), NodeClass::ExpressionList)
    }

    pub fn source_query(&self) -> Option<Query> {
        self.node.node("source-query").and_then(|node| node.as_query())
    }

    /// Innermost stage of the pipeline.
    pub fn root_query(&self) -> Query {
        let mut query = self.clone();
        while let Some(next) = query.source_query() {
            query = next;
        }
        query
    }

    /// Every stage, innermost first and this stage last.
    pub fn queries(&self) -> Vec<Query> {
        let mut stages = Vec::new();
        let mut stage = Some(self.clone());
        while let Some(query) = stage {
            stage = query.source_query();
            stages.push(query);
        }
        stages.reverse();
        stages
    }

    pub fn source_table_id(&self) -> Option<i64> {
        self.node.value("source-table").and_then(Value::as_int)
    }

    /// Metadata table the pipeline reads from.
    pub fn table(&self) -> Result<Entity, ModelError> {
        let root = self.root_query();
        let id = root.source_table_id().ok_or_else(|| ModelError::ShapeMismatch {
            expected: "table id",
            key: Key::from("source-table"),
            found: root.value("source-table").map_or("nothing", Value::type_name),
        })?;
        let metadata = self.node.metadata().ok_or(ModelError::MissingMetadata)?;
        Metadata::table(metadata, id).ok_or(ModelError::UnknownEntity { kind: "table", id })
    }

    fn nullable(&self, name: &str, class: NodeClass) -> Node {
        match self.node.node(name) {
            Some(existing) if existing.is_sequence() => existing,
            _ => self.node.view(Key::from(name), Value::array(Vec::new()), class),
        }
    }
}

/// `{"type": "query", "database": …, "query": {…}}`
#[derive(Debug, Clone)]
pub struct StructuredQuery {
    node: Node,
}

impl Deref for StructuredQuery {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl StructuredQuery {
    pub(crate) fn new(node: Node) -> Self {
        StructuredQuery { node }
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// The outermost stage. A missing `query` reads as an empty stage.
    pub fn query(&self) -> Query {
        match self.node.node("query").and_then(|node| node.as_query()) {
            Some(query) => query,
            None => Query::new(
                self.node
                    .view(Key::from("query"), Value::object(Vec::new()), NodeClass::Query),
            ),
        }
    }

    pub fn filters(&self) -> Node {
        self.query().filters()
    }

    pub fn aggregations(&self) -> Node {
        self.query().aggregations()
    }

    pub fn breakouts(&self) -> Node {
        self.query().breakouts()
    }

    pub fn sorts(&self) -> Node {
        self.query().sorts()
    }

    pub fn fields(&self) -> Node {
        self.query().fields()
    }

    pub fn expressions(&self) -> Node {
        self.query().expressions()
    }
}

/// A saved question: display settings plus a `dataset_query`.
#[derive(Debug, Clone)]
pub struct Question {
    node: Node,
}

impl Deref for Question {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl Question {
    pub(crate) fn new(node: Node) -> Self {
        Question { node }
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn dataset_query(&self) -> Option<Node> {
        self.node.node("dataset_query")
    }

    /// The dataset query, when it is a structured one.
    pub fn structured(&self) -> Option<StructuredQuery> {
        self.dataset_query()
            .filter(|node| node.class() == NodeClass::StructuredDatasetQuery)
            .map(StructuredQuery::new)
    }

    pub fn display_name(&self) -> Result<String, ModelError> {
        match self.node.value("name") {
            Some(Value::String(name)) => Ok(name.clone()),
            other => Err(ModelError::ShapeMismatch {
                expected: "string",
                key: Key::from("name"),
                found: other.map_or("nothing", Value::type_name),
            }),
        }
    }
}

/// Root of a parsed document.
#[derive(Debug, Clone)]
pub enum Document {
    Question(Question),
    Structured(StructuredQuery),
    /// Native queries are kept as opaque mappings.
    Native(Node),
    Query(Query),
}

impl Document {
    pub fn node(&self) -> &Node {
        match self {
            Document::Question(question) => &question.node,
            Document::Structured(structured) => &structured.node,
            Document::Native(node) => node,
            Document::Query(query) => &query.node,
        }
    }

    /// Outermost structured stage, if the document has one.
    pub fn query(&self) -> Option<Query> {
        match self {
            Document::Question(question) => question.structured().map(|structured| structured.query()),
            Document::Structured(structured) => Some(structured.query()),
            Document::Native(_) => None,
            Document::Query(query) => Some(query.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        self.node().to_value()
    }
}

impl Engine {
    /// Parse a question, a dataset query, or a bare query stage.
    #[instrument(skip_all)]
    pub fn parse_document(&self, raw: impl Into<Value>, meta: Meta) -> Result<Document, ModelError> {
        let raw = raw.into();
        if !matches!(raw, Value::Object(_)) {
            return Err(ModelError::NotADocument(raw.type_name()));
        }
        let class = document_class(&raw);
        debug!(?class, "parsing document");
        match self.parse_as(raw, meta, class) {
            Child::Node(node) => Ok(match class {
                NodeClass::Question => Document::Question(Question::new(node)),
                NodeClass::StructuredDatasetQuery => Document::Structured(StructuredQuery::new(node)),
                NodeClass::NativeDatasetQuery => Document::Native(node),
                _ => Document::Query(Query::new(node)),
            }),
            Child::Value(value) => Err(ModelError::NotADocument(value.type_name())),
        }
    }

    /// Parse JSON text as a document. Malformed text and non-document
    /// values are both reported through [`Error`].
    pub fn parse_document_str(&self, text: &str, meta: Meta) -> Result<Document, Error> {
        let raw = convert::from_str(text)?;
        Ok(self.parse_document(raw, meta)?)
    }
}

fn document_class(raw: &Value) -> NodeClass {
    match raw.get("type").and_then(Value::as_str) {
        Some("native") => NodeClass::NativeDatasetQuery,
        Some("query") => NodeClass::StructuredDatasetQuery,
        _ if raw.get("dataset_query").is_some() => NodeClass::Question,
        _ => NodeClass::Query,
    }
}

/// [`Engine::parse_document`] on a default lazy engine.
pub fn parse_document(raw: impl Into<Value>, meta: Meta) -> Result<Document, ModelError> {
    Engine::default().parse_document(raw, meta)
}

/// [`Engine::parse_document_str`] on a default lazy engine.
pub fn parse_document_str(text: &str, meta: Meta) -> Result<Document, Error> {
    Engine::default().parse_document_str(text, meta)
}
