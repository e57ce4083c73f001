//! CLI support for mbql-tree
//!
//! The `mbql` binary is a thin shell over these functions, so they can also
//! be driven from other tools.

mod edit;
mod inspect;
mod roundtrip;

pub use edit::{EditOp, EditOptions, execute_edit};
pub use inspect::execute_inspect;
pub use roundtrip::{RoundtripResult, execute_roundtrip};

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::{Catalog, Document, Engine, EngineConfig, Meta, error::NodeError};

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Node(#[from] NodeError),

    #[error("{0}")]
    Document(#[from] crate::Error),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    #[error("Document has no structured query to edit")]
    NotStructured,

    #[error("No filter at index {0}")]
    NoSuchFilter(usize),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct DocumentSource {
    /// JSON document text
    pub input: Option<String>,
    /// Parse every node up front instead of on first access
    pub eager: bool,
    /// Metadata catalog used for display names
    pub catalog: Option<Catalog>,
}

impl DocumentSource {
    pub fn engine(&self) -> Engine {
        Engine::new(EngineConfig { lazy: !self.eager })
    }

    pub fn meta(&self) -> Meta {
        match &self.catalog {
            Some(catalog) => Meta::new(catalog.clone()),
            None => Meta::none(),
        }
    }

    /// Parse the input text as a document.
    pub fn load(&self) -> Result<Document, CliError> {
        let text = self.input.as_deref().ok_or(CliError::NoInput)?;
        Ok(self.engine().parse_document_str(text, self.meta())?)
    }
}

/// Read a metadata catalog from a JSON file.
pub fn load_catalog(path: &Path) -> Result<Catalog, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(Catalog::from_json(&text)?)
}

/// Render a JSON value the way every subcommand prints it.
pub fn render(value: &serde_json::Value, pretty: bool) -> Result<String, CliError> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}
