//! Summarize a document stage by stage

use std::fmt::Write;

use super::{CliError, DocumentSource};
use crate::{Document, Node, Query};

/// Describe every stage of the document with the display names of its
/// canonical collections.
pub fn execute_inspect(source: &DocumentSource) -> Result<String, CliError> {
    let document = source.load()?;
    let mut out = String::new();

    match &document {
        Document::Question(question) => {
            let name = question.display_name().unwrap_or_else(|_| "(unnamed)".to_string());
            let _ = writeln!(out, "question: {}", name);
        }
        Document::Native(_) => {
            let _ = writeln!(out, "native query");
            return Ok(out);
        }
        Document::Structured(_) | Document::Query(_) => {}
    }

    let Some(query) = document.query() else {
        let _ = writeln!(out, "no structured query");
        return Ok(out);
    };

    for (depth, stage) in query.queries().iter().enumerate() {
        describe_stage(&mut out, depth, stage);
    }
    Ok(out)
}

fn describe_stage(out: &mut String, depth: usize, stage: &Query) {
    let source = match stage.source_table_id() {
        Some(id) => match stage.table() {
            Ok(table) => format!("table {} ({})", id, table.display_name()),
            Err(_) => format!("table {}", id),
        },
        None => "source query".to_string(),
    };
    let _ = writeln!(out, "stage {}: {}", depth, source);

    describe_collection(out, "filters", &stage.filters());
    describe_collection(out, "aggregations", &stage.aggregations());
    describe_collection(out, "breakouts", &stage.breakouts());
    describe_collection(out, "sorts", &stage.sorts());
    describe_collection(out, "expressions", &stage.expressions());
}

fn describe_collection(out: &mut String, label: &str, collection: &Node) {
    if collection.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}:", label);
    for (i, child) in collection.children().enumerate() {
        let name = match child.as_node().map(Node::display_name) {
            Some(Ok(name)) => name,
            _ => serde_json::Value::from(child.to_value()).to_string(),
        };
        let _ = writeln!(out, "    [{}] {}", i, name);
    }
}
