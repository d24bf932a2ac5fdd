//! Canonical labeling of usage graphs.
//!
//! Nodes are first coloured by (topological depth, label, in-degree,
//! out-degree); colours are then refined by the multiset of neighbouring
//! colours per edge direction and kind until the partition is stable. Any
//! cell that is still tied is resolved by individualising one member at a
//! time and keeping the lexicographically smallest edge encoding. That search
//! is budgeted; once the budget is spent the first member in program order
//! wins.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

use crate::core::config::NormalizationConfig;
use crate::core::errors::{Result, SchaapiError};
use crate::graph::usage::{EdgeKind, UsageEdge, UsageGraph, UsageNode};

/// Node permutation and relabeled edges of a canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalForm {
    /// `order[position]` is the original index of the node at that position
    pub order: Vec<usize>,
    /// Edges in canonical indices, sorted
    pub edges: Vec<UsageEdge>,
}

/// Identifier-independent form of a usage graph.
///
/// Equality and hashing only look at the canonical label, so two graphs that
/// differ in local identifiers or instruction positions compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedGraph {
    nodes: Vec<UsageNode>,
    edges: Vec<UsageEdge>,
    label: String,
    fingerprint: u64,
}

impl NormalizedGraph {
    /// Nodes in canonical order, with their concrete instructions
    pub fn nodes(&self) -> &[UsageNode] {
        &self.nodes
    }

    /// Canonical edges, sorted
    pub fn edges(&self) -> &[UsageEdge] {
        &self.edges
    }

    /// Canonical label encoding every node label and edge
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 64-bit hash of the canonical label
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of typed edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True when the graph has no node
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node labels in canonical order
    pub fn labels(&self) -> Vec<String> {
        self.nodes.iter().map(UsageNode::label).collect()
    }

    /// Rebuild a usage graph whose node indices are the canonical positions
    pub fn to_usage_graph(&self) -> Result<UsageGraph> {
        let mut graph = UsageGraph::new();
        for node in &self.nodes {
            graph.add_node(node.clone());
        }
        for edge in &self.edges {
            graph.add_edge(edge.from, edge.to, edge.kind)?;
        }
        Ok(graph)
    }
}

impl PartialEq for NormalizedGraph {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for NormalizedGraph {}

impl Hash for NormalizedGraph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

/// Encode node labels (in canonical order) and canonical edges as one string.
///
/// Labels are length-prefixed so that no symbol can collide with the
/// separators.
pub fn encode_canonical_label<'a, I>(labels: I, edges: &[UsageEdge]) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut encoded = String::new();
    for label in labels {
        encoded.push_str(&label.len().to_string());
        encoded.push(':');
        encoded.push_str(label);
        encoded.push(';');
    }
    encoded.push('#');
    let edges: Vec<String> = edges
        .iter()
        .map(|e| format!("{}>{}{}", e.from, e.to, e.kind.code()))
        .collect();
    encoded.push_str(&edges.join(","));
    encoded
}

/// Computes canonical forms within configured bounds.
#[derive(Debug, Clone, Default)]
pub struct GraphNormalizer {
    config: NormalizationConfig,
}

impl GraphNormalizer {
    /// Create a normalizer
    pub fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }

    /// Normalization bounds in use
    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Canonically relabel a usage graph.
    ///
    /// Fails when the graph has a cycle outside loop-back edges or when colour
    /// refinement does not stabilise within `max_label_iterations` rounds.
    pub fn normalize(&self, graph: &UsageGraph) -> Result<NormalizedGraph> {
        let labels = graph.labels();
        let edges = graph.edges();
        let tiebreak: Vec<usize> = graph.nodes().map(|n| n.order).collect();

        let form = self.canonical_form(&labels, &edges, &tiebreak)?;
        let nodes: Vec<UsageNode> = form
            .order
            .iter()
            .filter_map(|&index| graph.node(index).cloned())
            .collect();
        let label = encode_canonical_label(form.order.iter().map(|&i| labels[i].as_str()), &form.edges);
        let fingerprint = xxh3_64(label.as_bytes());

        trace!(nodes = nodes.len(), fingerprint, "Normalized usage graph");
        Ok(NormalizedGraph {
            nodes,
            edges: form.edges,
            label,
            fingerprint,
        })
    }

    /// Canonical form of any labeled graph.
    ///
    /// `tiebreak` gives the program order of each node and decides ties once
    /// the search budget is exhausted.
    pub fn canonical_form<L: Ord>(
        &self,
        labels: &[L],
        edges: &[UsageEdge],
        tiebreak: &[usize],
    ) -> Result<CanonicalForm> {
        let structure = Structure::new(labels.len(), edges)?;
        let (colors, count) = rank(&structure.initial_keys(labels)?);
        let (colors, count) = self.refine(&structure, colors, count)?;

        let mut budget = self.config.max_canonical_branches;
        let mut best: Option<CanonicalForm> = None;
        self.search(&structure, colors, count, tiebreak, &mut budget, &mut best)?;

        best.ok_or_else(|| SchaapiError::normalization("canonical search produced no ordering"))
    }

    fn refine(
        &self,
        structure: &Structure,
        mut colors: Vec<usize>,
        mut count: usize,
    ) -> Result<(Vec<usize>, usize)> {
        let mut rounds = 0;
        while count < structure.len {
            let keys: Vec<(usize, Vec<(u8, EdgeKind, usize)>)> = (0..structure.len)
                .map(|v| (colors[v], structure.signature(v, &colors)))
                .collect();
            let (next, next_count) = rank(&keys);
            if next_count == count {
                break;
            }

            rounds += 1;
            if rounds > self.config.max_label_iterations {
                return Err(SchaapiError::normalization(format!(
                    "labels did not stabilize within {} refinement rounds",
                    self.config.max_label_iterations
                )));
            }
            colors = next;
            count = next_count;
        }
        Ok((colors, count))
    }

    fn search(
        &self,
        structure: &Structure,
        colors: Vec<usize>,
        count: usize,
        tiebreak: &[usize],
        budget: &mut usize,
        best: &mut Option<CanonicalForm>,
    ) -> Result<()> {
        if count == structure.len {
            let leaf = structure.leaf(&colors);
            if best.as_ref().map_or(true, |b| leaf.edges < b.edges) {
                *best = Some(leaf);
            }
            return Ok(());
        }

        let mut sizes = vec![0usize; count];
        for &c in &colors {
            sizes[c] += 1;
        }
        let Some(cell) = sizes.iter().position(|&size| size > 1) else {
            return Ok(());
        };

        let mut members: Vec<usize> = (0..structure.len).filter(|&v| colors[v] == cell).collect();
        members.sort_by_key(|&v| (tiebreak.get(v).copied().unwrap_or(v), v));

        for (i, &chosen) in members.iter().enumerate() {
            if i > 0 {
                if *budget == 0 {
                    break;
                }
                *budget -= 1;
            }
            let keys: Vec<(usize, bool)> = colors
                .iter()
                .enumerate()
                .map(|(v, &c)| (c, v != chosen))
                .collect();
            let (split, split_count) = rank(&keys);
            let (refined, refined_count) = self.refine(structure, split, split_count)?;
            self.search(structure, refined, refined_count, tiebreak, budget, best)?;
        }
        Ok(())
    }
}

/// Adjacency view used during labeling.
struct Structure {
    len: usize,
    edges: Vec<UsageEdge>,
    out: Vec<Vec<(usize, EdgeKind)>>,
    inc: Vec<Vec<(usize, EdgeKind)>>,
}

impl Structure {
    fn new(len: usize, edges: &[UsageEdge]) -> Result<Self> {
        let mut out = vec![Vec::new(); len];
        let mut inc = vec![Vec::new(); len];
        for edge in edges {
            if edge.from >= len || edge.to >= len {
                return Err(SchaapiError::normalization(format!(
                    "edge {}->{} references a missing node",
                    edge.from, edge.to
                )));
            }
            out[edge.from].push((edge.to, edge.kind));
            inc[edge.to].push((edge.from, edge.kind));
        }
        Ok(Self {
            len,
            edges: edges.to_vec(),
            out,
            inc,
        })
    }

    /// Longest path from a source along non-loop-back edges
    fn depths(&self) -> Result<Vec<usize>> {
        let mut pending: Vec<usize> = (0..self.len)
            .map(|v| self.inc[v].iter().filter(|(_, k)| *k != EdgeKind::LoopBack).count())
            .collect();
        let mut depth = vec![0usize; self.len];
        let mut ready: Vec<usize> = (0..self.len).filter(|&v| pending[v] == 0).collect();
        let mut visited = 0;

        while let Some(v) = ready.pop() {
            visited += 1;
            for &(w, kind) in &self.out[v] {
                if kind == EdgeKind::LoopBack {
                    continue;
                }
                depth[w] = depth[w].max(depth[v] + 1);
                pending[w] -= 1;
                if pending[w] == 0 {
                    ready.push(w);
                }
            }
        }

        if visited < self.len {
            return Err(SchaapiError::normalization(
                "graph has a cycle outside loop-back edges",
            ));
        }
        Ok(depth)
    }

    fn initial_keys<'a, L: Ord>(
        &self,
        labels: &'a [L],
    ) -> Result<Vec<(usize, &'a L, usize, usize)>> {
        let depths = self.depths()?;
        Ok((0..self.len)
            .map(|v| (depths[v], &labels[v], self.inc[v].len(), self.out[v].len()))
            .collect())
    }

    fn signature(&self, v: usize, colors: &[usize]) -> Vec<(u8, EdgeKind, usize)> {
        let mut signature: Vec<(u8, EdgeKind, usize)> = self.out[v]
            .iter()
            .map(|&(w, kind)| (0, kind, colors[w]))
            .chain(self.inc[v].iter().map(|&(w, kind)| (1, kind, colors[w])))
            .collect();
        signature.sort_unstable();
        signature
    }

    /// Canonical form induced by a discrete colouring
    fn leaf(&self, colors: &[usize]) -> CanonicalForm {
        let mut order = vec![0usize; self.len];
        for (v, &c) in colors.iter().enumerate() {
            order[c] = v;
        }
        let mut edges: Vec<UsageEdge> = self
            .edges
            .iter()
            .map(|e| UsageEdge::new(colors[e.from], colors[e.to], e.kind))
            .collect();
        edges.sort();
        CanonicalForm { order, edges }
    }
}

/// Dense ranks of `keys`, preserving their order, plus the number of ranks
fn rank<K: Ord>(keys: &[K]) -> (Vec<usize>, usize) {
    let mut sorted: Vec<usize> = (0..keys.len()).collect();
    sorted.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

    let mut colors = vec![0usize; keys.len()];
    let mut next = 0;
    for (pos, &index) in sorted.iter().enumerate() {
        if pos > 0 && keys[sorted[pos - 1]] != keys[index] {
            next += 1;
        }
        colors[index] = next;
    }
    let count = if keys.is_empty() { 0 } else { next + 1 };
    (colors, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::instruction::Instruction;

    fn graph(symbols: &[&str], edges: &[(usize, usize, EdgeKind)]) -> UsageGraph {
        let mut graph = UsageGraph::new();
        for (order, symbol) in symbols.iter().enumerate() {
            graph.add_node(UsageNode::new(Instruction::invoke(*symbol), order));
        }
        for &(from, to, kind) in edges {
            graph.add_edge(from, to, kind).unwrap();
        }
        graph
    }

    #[test]
    fn test_relabeled_graphs_normalize_identically() {
        use EdgeKind::*;
        let a = graph(
            &["lib.A.open()", "lib.A.read()", "lib.A.close()"],
            &[(0, 1, Control), (1, 2, Control), (0, 2, Data)],
        );
        let b = graph(
            &["lib.A.close()", "lib.A.open()", "lib.A.read()"],
            &[(1, 2, Control), (2, 0, Control), (1, 0, Data)],
        );

        let normalizer = GraphNormalizer::default();
        let na = normalizer.normalize(&a).unwrap();
        let nb = normalizer.normalize(&b).unwrap();
        assert_eq!(na, nb);
        assert_eq!(na.fingerprint(), nb.fingerprint());
        assert_eq!(
            na.labels(),
            vec!["invoke:lib.A.open()", "invoke:lib.A.read()", "invoke:lib.A.close()"]
        );
    }

    #[test]
    fn test_different_edges_give_different_labels() {
        use EdgeKind::*;
        let a = graph(&["lib.A.x()", "lib.A.y()"], &[(0, 1, Control)]);
        let b = graph(&["lib.A.x()", "lib.A.y()"], &[(0, 1, Data)]);
        let normalizer = GraphNormalizer::default();
        assert_ne!(
            normalizer.normalize(&a).unwrap(),
            normalizer.normalize(&b).unwrap()
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        use EdgeKind::*;
        let g = graph(
            &["lib.L.new()", "lib.L.add()", "lib.L.add()", "lib.L.size()"],
            &[
                (0, 1, Control),
                (0, 2, Control),
                (1, 3, Control),
                (2, 3, Control),
                (0, 1, Data),
                (0, 2, Data),
                (0, 3, Data),
                (3, 0, LoopBack),
            ],
        );
        let normalizer = GraphNormalizer::default();
        let once = normalizer.normalize(&g).unwrap();
        let twice = normalizer
            .normalize(&once.to_usage_graph().unwrap())
            .unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.label(), twice.label());
    }

    #[test]
    fn test_symmetric_nodes_resolve_to_minimal_encoding() {
        use EdgeKind::*;
        // Two identical fan-out branches where only one continues.
        let a = graph(
            &["lib.A.root()", "lib.A.leaf()", "lib.A.leaf()", "lib.A.tail()"],
            &[(0, 1, Data), (0, 2, Data), (2, 3, Control)],
        );
        let b = graph(
            &["lib.A.root()", "lib.A.leaf()", "lib.A.leaf()", "lib.A.tail()"],
            &[(0, 1, Data), (0, 2, Data), (1, 3, Control)],
        );
        let normalizer = GraphNormalizer::default();
        assert_eq!(
            normalizer.normalize(&a).unwrap(),
            normalizer.normalize(&b).unwrap()
        );
    }

    #[test]
    fn test_exhausted_branch_budget_falls_back_to_program_order() {
        let symbols = vec!["lib.A.same()"; 6];
        let g = graph(&symbols, &[]);
        let normalizer = GraphNormalizer::new(NormalizationConfig {
            max_canonical_branches: 1,
            ..NormalizationConfig::default()
        });
        let normalized = normalizer.normalize(&g).unwrap();
        let orders: Vec<usize> = normalized.nodes().iter().map(|n| n.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_refinement_bound_is_reported() {
        use EdgeKind::*;
        // D nodes only split after their B predecessors split: two rounds.
        let g = graph(
            &[
                "lib.A.a()", "lib.A.c()", "lib.A.b()", "lib.A.b()", "lib.A.d()", "lib.A.d()",
            ],
            &[(0, 2, Control), (1, 3, Control), (2, 4, Control), (3, 5, Control)],
        );
        let strict = GraphNormalizer::new(NormalizationConfig {
            max_label_iterations: 1,
            ..NormalizationConfig::default()
        });
        let err = strict.normalize(&g).unwrap_err();
        assert!(matches!(err, SchaapiError::Normalization { .. }));

        assert!(GraphNormalizer::default().normalize(&g).is_ok());
    }

    #[test]
    fn test_cyclic_skeleton_is_rejected() {
        use EdgeKind::*;
        let g = graph(
            &["lib.A.a()", "lib.A.b()"],
            &[(0, 1, Control), (1, 0, Control)],
        );
        let err = GraphNormalizer::default().normalize(&g).unwrap_err();
        assert!(err.is_isolatable());
    }

    #[test]
    fn test_label_encoding_is_length_prefixed() {
        let edges = vec![UsageEdge::new(0, 1, EdgeKind::Data)];
        let label = encode_canonical_label(["a;b", "c"], &edges);
        assert_eq!(label, "3:a;b;1:c;#0>1D");
    }

    #[test]
    fn test_empty_graph_normalizes() {
        let normalized = GraphNormalizer::default()
            .normalize(&UsageGraph::new())
            .unwrap();
        assert!(normalized.is_empty());
        assert_eq!(normalized.label(), "#");
    }
}
