//! Apply a single edit to the outermost query stage

use super::{CliError, DocumentSource};
use crate::{Node, Value};

/// Edits the `mbql edit` subcommand knows about
#[derive(Debug, Clone, PartialEq)]
pub enum EditOp {
    AddFilter(Value),
    AddAggregation(Value),
    AddBreakout(Value),
    AddSort(Value),
    RemoveFilter(usize),
}

/// Options for the edit command
#[derive(Debug, Clone)]
pub struct EditOptions {
    pub source: DocumentSource,
    pub op: EditOp,
}

/// Apply the edit and return the whole new document.
pub fn execute_edit(options: &EditOptions) -> Result<serde_json::Value, CliError> {
    let document = options.source.load()?;
    let query = document.query().ok_or(CliError::NotStructured)?;

    let edited: Node = match &options.op {
        EditOp::AddFilter(clause) => query.filters().add(clause.clone())?,
        EditOp::AddAggregation(clause) => query.aggregations().add(clause.clone())?,
        EditOp::AddBreakout(clause) => query.breakouts().add(clause.clone())?,
        EditOp::AddSort(clause) => query.sorts().add(clause.clone())?,
        EditOp::RemoveFilter(index) => {
            let filter = query.filters().node(*index).ok_or(CliError::NoSuchFilter(*index))?;
            filter.remove()?
        }
    };
    Ok(edited.root().to_json())
}
