//! Write-back rules for collection classes.
//!
//! A collection read through a canonical view (`filters()`,
//! `aggregations()`, `expressions()`, …) is an ordinary sequence node parked
//! under the query's field key. When `parent()` is asked for, the collection
//! folds itself back into the field's wire shape instead of being stored
//! verbatim.

use std::ops::Deref;

use tracing::{debug, warn};

use super::NodeClass;
use crate::{
    error::ModelError,
    node::{Child, Key, Node},
    value::Value,
};

impl NodeClass {
    /// How a node of this class is written into `parent` under `key`.
    pub(crate) fn relink(self, node: &Node, parent: &Node, key: Option<&Key>) -> Node {
        let Some(key) = key else {
            return parent.clone();
        };
        match self {
            NodeClass::FilterList => relink_filters(node, parent, key),
            NodeClass::ExpressionList => relink_expressions(node, parent, key),
            NodeClass::AggregationList
            | NodeClass::BreakoutList
            | NodeClass::SortList
            | NodeClass::FieldList
            | NodeClass::JoinList
            | NodeClass::ExpressionMap => relink_nullable(node, parent, key),
            _ => node.relink_into(parent, Some(key)),
        }
    }
}

/// Empty collections drop the field; anything else is stored as is. A
/// collection still holding exactly the field's wire value, empty or not,
/// leaves the owner untouched.
fn relink_nullable(node: &Node, parent: &Node, key: &Key) -> Node {
    if parent.holds(key, &node.to_value()) {
        return parent.clone();
    }
    if node.is_empty() {
        debug!(%key, "collection emptied, removing field");
        parent.remove_key(key.clone())
    } else {
        node.relink_into(parent, Some(key))
    }
}

fn relink_filters(node: &Node, parent: &Node, key: &Key) -> Node {
    match node.len() {
        0 => {
            debug!(%key, "no filters left, removing field");
            parent.remove_key(key.clone())
        }
        1 => match node.get(0usize) {
            Some(only) => parent.write_slot(key, only),
            None => parent.remove_key(key.clone()),
        },
        n => {
            debug!(%key, filters = n, "wrapping filters in \"and\"");
            let mut conjunction = Vec::with_capacity(n + 1);
            conjunction.push(Value::from("and"));
            if let Value::Array(filters) = node.to_value() {
                conjunction.extend(filters.iter().cloned());
            }
            parent.write_slot(key, Child::Value(Value::array(conjunction)))
        }
    }
}

/// Fold `[name, expression]` entries into a name → expression object. A
/// repeated name keeps its first position and its last expression.
fn relink_expressions(node: &Node, parent: &Node, key: &Key) -> Node {
    if node.is_empty() {
        if parent.value(key.clone()).is_some_and(|map| matches!(map, Value::Object(m) if m.is_empty())) {
            return parent.clone();
        }
        debug!(%key, "no expressions left, removing field");
        return parent.remove_key(key.clone());
    }
    let mut members: Vec<(String, Value)> = Vec::with_capacity(node.len());
    let Value::Array(entries) = node.to_value() else {
        return parent.clone();
    };
    for entry in entries.iter() {
        let (name, expression) = match entry {
            Value::Array(pair) if pair.len() == 2 && pair[0].as_str().is_some() => {
                (pair[0].as_string(), pair[1].clone())
            }
            other => {
                warn!(entry = %serde_json::Value::from(other), "skipping malformed expression entry");
                continue;
            }
        };
        match members.iter_mut().find(|(existing, _)| *existing == name) {
            Some(member) => member.1 = expression,
            None => members.push((name, expression)),
        }
    }
    parent.write_slot(key, Child::Value(Value::object(members)))
}

/// One `[name, expression]` pair of the canonical `expressions()` view.
#[derive(Debug, Clone)]
pub struct ExpressionEntry {
    node: Node,
}

impl ExpressionEntry {
    pub(crate) fn new(node: Node) -> Self {
        ExpressionEntry { node }
    }

    pub fn name(&self) -> Result<String, ModelError> {
        match self.node.value(0usize) {
            Some(Value::String(name)) => Ok(name.clone()),
            other => Err(ModelError::ShapeMismatch {
                expected: "string",
                key: Key::Index(0),
                found: other.map_or("nothing", Value::type_name),
            }),
        }
    }

    pub fn expression(&self) -> Option<Child> {
        self.node.get(1usize)
    }

    pub fn into_node(self) -> Node {
        self.node
    }
}

impl Deref for ExpressionEntry {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}
