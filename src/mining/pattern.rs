//! Mined usage patterns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::graph::instruction::{Instruction, InstructionKind};
use crate::graph::usage::{node_label, render_dot, UsageEdge};

/// Template node: an operation on a library symbol, with no identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternNode {
    /// Operation kind
    pub kind: InstructionKind,
    /// Library symbol signature
    pub symbol: String,
}

impl PatternNode {
    /// Create a template node
    pub fn new(kind: InstructionKind, symbol: impl Into<String>) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
        }
    }

    /// Label shared with usage graph nodes
    pub fn label(&self) -> String {
        node_label(self.kind, &self.symbol)
    }
}

/// One concrete occurrence of a pattern, used to generate tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemplar {
    /// Project containing the occurrence
    pub project: String,
    /// Method containing the occurrence
    pub method: String,
    /// Matched instructions in program order
    pub instructions: Vec<Instruction>,
    /// Program order of the instruction matched by each template node
    pub node_orders: Vec<usize>,
}

impl Exemplar {
    /// Position in `instructions` of the instruction matched by each
    /// template node, in canonical node order
    pub fn node_positions(&self) -> Vec<usize> {
        let mut sorted = self.node_orders.clone();
        sorted.sort_unstable();
        self.node_orders
            .iter()
            .map(|order| sorted.partition_point(|o| o < order))
            .collect()
    }
}

/// A connected usage template recurring across client code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Template nodes in canonical order
    pub nodes: Vec<PatternNode>,
    /// Template edges between canonical positions, sorted
    pub edges: Vec<UsageEdge>,
    /// Canonical label of the template
    pub label: String,
    /// Support under the configured policy
    pub support: usize,
    /// Occurrences found across the corpus
    pub occurrences: usize,
    /// Projects containing at least one occurrence
    pub projects: BTreeSet<String>,
    /// Concrete occurrence for test generation
    pub exemplar: Exemplar,
}

impl Pattern {
    /// Number of template nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of template edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Symbols of the template nodes in canonical order
    pub fn symbols(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.symbol.as_str()).collect()
    }

    /// Graphviz DOT text of the template
    pub fn to_dot(&self) -> String {
        render_dot(self.nodes.iter().map(PatternNode::label), &self.edges)
    }

    /// Short human-readable summary, e.g. `ArrayList.<init>() -> List.add(Object)`
    pub fn summary(&self) -> String {
        self.nodes
            .iter()
            .map(|node| short_symbol(&node.symbol))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Drop the package part of a signature, keeping class and member
fn short_symbol(symbol: &str) -> String {
    let (head, params) = match symbol.find('(') {
        Some(at) => symbol.split_at(at),
        None => (symbol, ""),
    };
    let mut parts = head.rsplitn(3, '.');
    let member = parts.next().unwrap_or(head);
    match parts.next() {
        Some(class) => format!("{class}.{member}{}", shorten_params(params)),
        None => format!("{member}{}", shorten_params(params)),
    }
}

fn shorten_params(params: &str) -> String {
    let Some(inner) = params.strip_prefix('(').and_then(|p| p.strip_suffix(')')) else {
        return params.to_string();
    };
    let short: Vec<&str> = inner
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.rsplit('.').next().unwrap_or(p))
        .collect();
    format!("({})", short.join(", "))
}
