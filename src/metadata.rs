//! Lookup of human-readable names for entities a document references.
//!
//! Documents only carry ids (`["field-id", 1]`, `["segment", 4]`,
//! `"source-table": 2`). Display names come from a [`Metadata`] provider
//! attached to the document through [`Meta`], queried lazily when a
//! clause's `display_name()` is asked for.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

/// A named entity returned by a metadata provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entity {
    pub display_name: String,
}

impl Entity {
    pub fn new(display_name: impl Into<String>) -> Self {
        Entity {
            display_name: display_name.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Metadata provider interface.
pub trait Metadata {
    fn field(&self, id: i64) -> Option<Entity>;
    fn table(&self, id: i64) -> Option<Entity>;
    fn metric(&self, id: i64) -> Option<Entity>;
    fn segment(&self, id: i64) -> Option<Entity>;
}

/// In-memory [`Metadata`] built from a JSON catalog.
///
/// ```
/// use mbql_tree::metadata::{Catalog, Metadata};
///
/// let catalog = Catalog::from_json(r#"{"fields": {"1": {"display_name": "Total"}}}"#).unwrap();
/// assert_eq!(catalog.field(1).unwrap().display_name(), "Total");
/// assert!(catalog.table(1).is_none());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    fields: HashMap<i64, Entity>,
    #[serde(default)]
    tables: HashMap<i64, Entity>,
    #[serde(default)]
    metrics: HashMap<i64, Entity>,
    #[serde(default)]
    segments: HashMap<i64, Entity>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_field(mut self, id: i64, name: impl Into<String>) -> Self {
        self.fields.insert(id, Entity::new(name));
        self
    }

    pub fn with_table(mut self, id: i64, name: impl Into<String>) -> Self {
        self.tables.insert(id, Entity::new(name));
        self
    }

    pub fn with_metric(mut self, id: i64, name: impl Into<String>) -> Self {
        self.metrics.insert(id, Entity::new(name));
        self
    }

    pub fn with_segment(mut self, id: i64, name: impl Into<String>) -> Self {
        self.segments.insert(id, Entity::new(name));
        self
    }
}

impl Metadata for Catalog {
    fn field(&self, id: i64) -> Option<Entity> {
        self.fields.get(&id).cloned()
    }

    fn table(&self, id: i64) -> Option<Entity> {
        self.tables.get(&id).cloned()
    }

    fn metric(&self, id: i64) -> Option<Entity> {
        self.metrics.get(&id).cloned()
    }

    fn segment(&self, id: i64) -> Option<Entity> {
        self.segments.get(&id).cloned()
    }
}

/// Opaque context inherited unchanged by every node of a document.
#[derive(Clone, Default)]
pub struct Meta {
    metadata: Option<Rc<dyn Metadata>>,
}

impl Meta {
    pub fn new(metadata: impl Metadata + 'static) -> Self {
        Meta {
            metadata: Some(Rc::new(metadata)),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> Option<&dyn Metadata> {
        self.metadata.as_deref()
    }
}

impl From<Rc<dyn Metadata>> for Meta {
    fn from(metadata: Rc<dyn Metadata>) -> Self {
        Meta {
            metadata: Some(metadata),
        }
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meta")
            .field("metadata", &self.metadata.is_some())
            .finish()
    }
}
