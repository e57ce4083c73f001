//! Persistent, navigable trees over MBQL query documents.
//!
//! ```
//! use mbql_tree::{Catalog, Meta, Value, parse_document};
//!
//! let raw: Value = serde_json::json!({"source-table": 1, "aggregation": [["sum", ["field-id", 1]]]}).into();
//! let meta = Meta::new(Catalog::new().with_field(1, "Total"));
//! let document = parse_document(raw.clone(), meta).unwrap();
//! let query = document.query().unwrap();
//!
//! let sum = query.aggregations().node(0usize).unwrap();
//! assert_eq!(sum.display_name().unwrap(), "Sum of Total");
//!
//! let edited = sum.replace(serde_json::json!(["count"])).unwrap().root();
//! assert_eq!(edited.to_json()["aggregation"], serde_json::json!([["count"]]));
//! assert_eq!(document.to_value(), raw);
//! ```
#[cfg(feature = "cli")]
pub mod cli;
pub mod convert;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod model;
pub mod node;
pub mod value;

pub use engine::{Engine, EngineConfig};
pub use error::{Error, ModelError, NodeError};
pub use metadata::{Catalog, Entity, Meta, Metadata};
pub use model::{
    Clause, ClauseCategory, ClauseKind, Document, ExpressionEntry, NodeClass, Query, Question, SortDirection,
    StructuredQuery, parse_document, parse_document_str,
};
pub use node::{Child, Key, Node};
pub use value::Value;
