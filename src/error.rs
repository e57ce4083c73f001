//! Error types

use thiserror::Error;

use crate::node::Key;

/// Invalid structural edits on a node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Can't replace node without a parent and key")]
    ReplaceWithoutParent,

    #[error("Can't remove node without a parent and key")]
    RemoveWithoutParent,

    #[error("Can't add an unkeyed value to a mapping node")]
    AddToMapping,
}

/// Failures while reading a node through its query-model accessors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Expected a JSON object document, found {0}")]
    NotADocument(&'static str),

    #[error("No metadata provider attached to this document")]
    MissingMetadata,

    #[error("Unknown {kind} with id {id}")]
    UnknownEntity { kind: &'static str, id: i64 },

    #[error("Expected {expected} at {key}, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        key: Key,
        found: &'static str,
    },

    #[error("Node is not inside a {0}")]
    Detached(&'static str),

    #[error("{0} has no display name")]
    NoDisplayName(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
