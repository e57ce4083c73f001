//! Parse a document, touch every node, and re-emit it

use super::{CliError, DocumentSource};
use crate::{Child, Node};

/// Result of a roundtrip check
#[derive(Debug)]
pub struct RoundtripResult {
    /// Re-emitted document
    pub output: serde_json::Value,
    /// Whether the output equals the input
    pub faithful: bool,
    /// Node bodies constructed while walking the whole tree
    pub parsed: usize,
}

pub fn execute_roundtrip(source: &DocumentSource) -> Result<RoundtripResult, CliError> {
    let text = source.input.as_deref().ok_or(CliError::NoInput)?;
    let input: serde_json::Value = serde_json::from_str(text)?;

    let document = source.load()?;
    let root = document.node();
    visit(root);

    let output = root.to_json();
    Ok(RoundtripResult {
        faithful: output == input,
        output,
        parsed: root.engine().parsed_count(),
    })
}

fn visit(node: &Node) {
    for child in node.children() {
        if let Child::Node(child) = child {
            visit(&child);
        }
    }
}
