//! Usage graphs: library-relevant operations of one method and the control
//! and data relations between them.
//!
//! Nodes live in an arena addressed by stable integer indices. Loops are
//! expressed with explicit [`EdgeKind::LoopBack`] edges; the remaining
//! skeleton is acyclic.

use std::collections::HashSet;
use std::fmt;

use petgraph::algo::toposort;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SchaapiError};
use crate::graph::instruction::{Instruction, InstructionKind};

/// Relation between two usage nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Target is reachable from source with no library instruction in between
    Control,
    /// Target consumes a value produced by source
    Data,
    /// Control returns from the end of a loop body to its head
    LoopBack,
}

impl EdgeKind {
    /// All edge kinds, in canonical order
    pub const ALL: [EdgeKind; 3] = [EdgeKind::Control, EdgeKind::Data, EdgeKind::LoopBack];

    /// Upper-case name used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "CONTROL",
            Self::Data => "DATA",
            Self::LoopBack => "LOOP_BACK",
        }
    }

    /// One-letter code used in canonical labels
    pub fn code(&self) -> char {
        match self {
            Self::Control => 'C',
            Self::Data => 'D',
            Self::LoopBack => 'L',
        }
    }

    /// Bit used when several kinds connect the same pair
    pub(crate) fn bit(&self) -> u8 {
        match self {
            Self::Control => 0b001,
            Self::Data => 0b010,
            Self::LoopBack => 0b100,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A library-relevant instruction inside a usage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageNode {
    /// Wrapped instruction
    pub instruction: Instruction,
    /// Index of the instruction in the method body
    pub order: usize,
    /// Operands whose value originates outside the method
    pub external_inputs: usize,
}

impl UsageNode {
    /// Wrap an instruction found at `order`
    pub fn new(instruction: Instruction, order: usize) -> Self {
        Self {
            instruction,
            order,
            external_inputs: 0,
        }
    }

    /// Symbol signature of the wrapped instruction
    pub fn symbol(&self) -> &str {
        self.instruction.symbol_or_empty()
    }

    /// Operation kind of the wrapped instruction
    pub fn kind(&self) -> InstructionKind {
        self.instruction.kind
    }

    /// Identifier-free label: operation kind plus symbol
    pub fn label(&self) -> String {
        node_label(self.kind(), self.symbol())
    }
}

/// Label shared by usage nodes, normalized nodes and pattern nodes.
pub fn node_label(kind: InstructionKind, symbol: &str) -> String {
    format!("{}:{}", kind.as_str(), symbol)
}

/// Graphviz DOT text for labeled nodes and typed edges.
///
/// Data edges are dashed and loop-back edges bold; edges referencing a
/// missing node are skipped.
pub fn render_dot<I>(labels: I, edges: &[UsageEdge]) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut graph: DiGraph<String, EdgeKind> = DiGraph::new();
    let nodes: Vec<NodeIndex> = labels.into_iter().map(|label| graph.add_node(label)).collect();
    for edge in edges {
        if let (Some(&from), Some(&to)) = (nodes.get(edge.from), nodes.get(edge.to)) {
            graph.add_edge(from, to, edge.kind);
        }
    }

    Dot::with_attr_getters(
        &graph,
        &[],
        &|_, edge| match edge.weight() {
            EdgeKind::Control => String::new(),
            EdgeKind::Data => "style = dashed".to_string(),
            EdgeKind::LoopBack => "style = bold, constraint = false".to_string(),
        },
        &|_, _| "shape = box".to_string(),
    )
    .to_string()
}

/// Directed, typed edge between two nodes of the same graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsageEdge {
    /// Source node index
    pub from: usize,
    /// Target node index
    pub to: usize,
    /// Relation type
    pub kind: EdgeKind,
}

impl UsageEdge {
    /// Create an edge
    pub fn new(from: usize, to: usize, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }
}

/// Graph of library operations performed by one method.
#[derive(Debug, Clone, Default)]
pub struct UsageGraph {
    graph: DiGraph<UsageNode, EdgeKind>,
    edge_set: HashSet<UsageEdge>,
}

impl UsageGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its index
    pub fn add_node(&mut self, node: UsageNode) -> usize {
        self.graph.add_node(node).index()
    }

    /// Add an edge; returns `false` when the same typed edge already exists
    pub fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<bool> {
        let count = self.graph.node_count();
        if from >= count || to >= count {
            return Err(SchaapiError::graph_element(
                format!("edge endpoint out of range ({count} nodes)"),
                format!("{from}->{to} {kind}"),
            ));
        }

        let edge = UsageEdge::new(from, to, kind);
        if !self.edge_set.insert(edge) {
            return Ok(false);
        }
        self.graph
            .add_edge(NodeIndex::new(from), NodeIndex::new(to), kind);
        Ok(true)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of typed edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True when the method performs no library operation
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node at `index`
    pub fn node(&self, index: usize) -> Option<&UsageNode> {
        self.graph.node_weight(NodeIndex::new(index))
    }

    /// Nodes in index order
    pub fn nodes(&self) -> impl Iterator<Item = &UsageNode> {
        self.graph.raw_nodes().iter().map(|n| &n.weight)
    }

    /// Every edge, sorted by (from, to, kind)
    pub fn edges(&self) -> Vec<UsageEdge> {
        let mut edges: Vec<UsageEdge> = self
            .graph
            .edge_references()
            .map(|e| UsageEdge::new(e.source().index(), e.target().index(), *e.weight()))
            .collect();
        edges.sort();
        edges
    }

    /// Whether the typed edge exists
    pub fn has_edge(&self, from: usize, to: usize, kind: EdgeKind) -> bool {
        self.edge_set.contains(&UsageEdge::new(from, to, kind))
    }

    /// Typed edges leaving `index`
    pub fn outgoing(&self, index: usize) -> Vec<(usize, EdgeKind)> {
        self.directed(index, Direction::Outgoing)
    }

    /// Typed edges entering `index`
    pub fn incoming(&self, index: usize) -> Vec<(usize, EdgeKind)> {
        self.directed(index, Direction::Incoming)
    }

    fn directed(&self, index: usize, direction: Direction) -> Vec<(usize, EdgeKind)> {
        if index >= self.graph.node_count() {
            return Vec::new();
        }
        let mut edges: Vec<(usize, EdgeKind)> = self
            .graph
            .edges_directed(NodeIndex::new(index), direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (other.index(), *e.weight())
            })
            .collect();
        edges.sort();
        edges
    }

    /// Node labels in index order
    pub fn labels(&self) -> Vec<String> {
        self.nodes().map(UsageNode::label).collect()
    }

    /// Graphviz DOT text; nodes are labeled with their program order and label
    pub fn to_dot(&self) -> String {
        render_dot(
            self.nodes().map(|n| format!("{}: {}", n.order, n.label())),
            &self.edges(),
        )
    }

    /// Verify that the graph without loop-back edges is acyclic
    pub fn check_acyclic(&self) -> Result<()> {
        let skeleton = EdgeFiltered::from_fn(&self.graph, |e| *e.weight() != EdgeKind::LoopBack);
        toposort(&skeleton, None).map(|_| ()).map_err(|cycle| {
            let index = cycle.node_id().index();
            let symbol = self.node(index).map(UsageNode::symbol).unwrap_or_default();
            SchaapiError::graph_element(
                "cycle through non-loop-back edges",
                format!("node {index} ({symbol})"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(symbol: &str, order: usize) -> UsageNode {
        UsageNode::new(Instruction::invoke(symbol), order)
    }

    #[test]
    fn test_add_edge_deduplicates_by_kind() {
        let mut graph = UsageGraph::new();
        let a = graph.add_node(node("lib.A.a()", 0));
        let b = graph.add_node(node("lib.A.b()", 1));

        assert!(graph.add_edge(a, b, EdgeKind::Control).unwrap());
        assert!(graph.add_edge(a, b, EdgeKind::Data).unwrap());
        assert!(!graph.add_edge(a, b, EdgeKind::Control).unwrap());

        assert_eq!(graph.edge_count(), 2);
        assert!(graph.has_edge(a, b, EdgeKind::Data));
        assert_eq!(
            graph.outgoing(a),
            vec![(b, EdgeKind::Control), (b, EdgeKind::Data)]
        );
        assert_eq!(graph.incoming(b).len(), 2);
    }

    #[test]
    fn test_dot_output_names_nodes_and_edge_kinds() {
        let mut graph = UsageGraph::new();
        let a = graph.add_node(node("lib.It.hasNext()", 1));
        let b = graph.add_node(node("lib.It.next()", 3));
        graph.add_edge(a, b, EdgeKind::Control).unwrap();
        graph.add_edge(b, a, EdgeKind::LoopBack).unwrap();

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("1: invoke:lib.It.hasNext()"));
        assert!(dot.contains("3: invoke:lib.It.next()"));
        assert!(dot.contains("0 -> 1"));
        assert!(dot.contains("1 -> 0"));
        assert!(dot.contains("LOOP_BACK"));
        assert!(dot.contains("constraint = false"));
    }

    #[test]
    fn test_add_edge_rejects_unknown_nodes() {
        let mut graph = UsageGraph::new();
        let a = graph.add_node(node("lib.A.a()", 0));
        let err = graph.add_edge(a, 5, EdgeKind::Control).unwrap_err();
        assert!(matches!(err, SchaapiError::Graph { .. }));
    }

    #[test]
    fn test_loop_back_edges_are_excluded_from_acyclicity() {
        let mut graph = UsageGraph::new();
        let a = graph.add_node(node("lib.It.hasNext()", 0));
        let b = graph.add_node(node("lib.It.next()", 1));
        graph.add_edge(a, b, EdgeKind::Control).unwrap();
        graph.add_edge(b, a, EdgeKind::LoopBack).unwrap();
        assert!(graph.check_acyclic().is_ok());

        graph.add_edge(b, a, EdgeKind::Control).unwrap();
        assert!(graph.check_acyclic().is_err());
    }

    #[test]
    fn test_labels_combine_kind_and_symbol() {
        let mut graph = UsageGraph::new();
        graph.add_node(UsageNode::new(
            Instruction::construct("lib.List.<init>()"),
            0,
        ));
        assert_eq!(graph.labels(), vec!["new:lib.List.<init>()".to_string()]);
        assert_eq!(EdgeKind::LoopBack.to_string(), "LOOP_BACK");
    }
}
