//! Label-preserving subgraph matching.
//!
//! A template occurs in a host graph when its nodes map injectively onto host
//! nodes with the same label and every template edge (with its kind) is
//! present between the mapped nodes. Extra host edges are allowed, which
//! keeps support anti-monotonic under template growth.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::graph::usage::UsageEdge;

/// Graph whose nodes carry interned labels.
#[derive(Debug, Clone)]
pub struct LabeledGraph {
    labels: Vec<u32>,
    edges: Vec<UsageEdge>,
    neighbors: Vec<Vec<usize>>,
    masks: HashMap<(usize, usize), u8>,
}

impl LabeledGraph {
    /// Create a graph; edges must reference existing nodes
    pub fn new(labels: Vec<u32>, edges: Vec<UsageEdge>) -> Self {
        let mut neighbors = vec![Vec::new(); labels.len()];
        let mut masks: HashMap<(usize, usize), u8> = HashMap::new();
        for edge in &edges {
            *masks.entry((edge.from, edge.to)).or_default() |= edge.kind.bit();
            if edge.from != edge.to {
                neighbors[edge.from].push(edge.to);
                neighbors[edge.to].push(edge.from);
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            labels,
            edges,
            neighbors,
            masks,
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when the graph has no node
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Node labels
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Typed edges
    pub fn edges(&self) -> &[UsageEdge] {
        &self.edges
    }

    /// Nodes adjacent to `node` in either direction
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.neighbors[node]
    }

    /// Edge kinds from `from` to `to` as a bit set
    pub fn mask(&self, from: usize, to: usize) -> u8 {
        self.masks.get(&(from, to)).copied().unwrap_or(0)
    }

    /// Multiset of labels
    pub fn label_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_default() += 1;
        }
        counts
    }

    /// Labels of `nodes` and the given host `edges` between them, indexed by
    /// position in `nodes`. Edges with an endpoint outside `nodes` are dropped.
    pub fn restrict(&self, nodes: &[usize], edges: &[UsageEdge]) -> (Vec<u32>, Vec<UsageEdge>) {
        let position: HashMap<usize, usize> =
            nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let labels = nodes.iter().map(|&n| self.labels[n]).collect();
        let mut local: Vec<UsageEdge> = edges
            .iter()
            .filter_map(|e| {
                let from = *position.get(&e.from)?;
                let to = *position.get(&e.to)?;
                Some(UsageEdge::new(from, to, e.kind))
            })
            .collect();
        local.sort();
        local.dedup();
        (labels, local)
    }

    /// Host edges with one endpoint at `node` and the other at `node` itself
    /// or inside `members`
    pub fn edges_between(&self, node: usize, members: &[usize]) -> Vec<UsageEdge> {
        self.edges
            .iter()
            .filter(|e| {
                (e.from == node && (e.to == node || members.contains(&e.to)))
                    || (e.to == node && members.contains(&e.from))
            })
            .copied()
            .collect()
    }
}

/// Whether every label of `pattern` occurs at least as often in `host`
pub fn labels_fit(pattern: &LabeledGraph, host: &LabeledGraph) -> bool {
    let available = host.label_counts();
    pattern
        .label_counts()
        .iter()
        .all(|(label, count)| available.get(label).is_some_and(|have| have >= count))
}

/// Find up to `limit` embeddings of `pattern` in `host`.
///
/// Each embedding maps pattern node `i` to host node `embedding[i]`.
pub fn find_embeddings(pattern: &LabeledGraph, host: &LabeledGraph, limit: usize) -> Vec<Vec<usize>> {
    let mut results = Vec::new();
    if pattern.is_empty() || limit == 0 || pattern.len() > host.len() {
        return results;
    }

    let plan = MatchPlan::new(pattern);
    let mut state = MatchState {
        mapping: vec![usize::MAX; pattern.len()],
        used: vec![false; host.len()],
    };
    extend(&plan, pattern, host, 0, &mut state, &mut results, limit);
    results
}

/// Whether `pattern` occurs at least once in `host`
pub fn embeds(pattern: &LabeledGraph, host: &LabeledGraph) -> bool {
    labels_fit(pattern, host) && !find_embeddings(pattern, host, 1).is_empty()
}

/// Order in which pattern nodes are matched, each node after an already
/// matched neighbour whenever one exists.
struct MatchPlan {
    order: Vec<usize>,
    anchor: Vec<Option<usize>>,
    /// Earlier matched nodes with edge masks (pattern node -> it, it -> pattern node)
    checks: Vec<Vec<(usize, u8, u8)>>,
}

impl MatchPlan {
    fn new(pattern: &LabeledGraph) -> Self {
        let len = pattern.len();
        let mut order = Vec::with_capacity(len);
        let mut anchor = vec![None; len];
        let mut seen = vec![false; len];

        for root in 0..len {
            if seen[root] {
                continue;
            }
            seen[root] = true;
            let mut queue = VecDeque::from([root]);
            while let Some(node) = queue.pop_front() {
                order.push(node);
                for &next in pattern.neighbors(node) {
                    if !seen[next] {
                        seen[next] = true;
                        anchor[next] = Some(node);
                        queue.push_back(next);
                    }
                }
            }
        }

        let mut position = vec![0usize; len];
        for (pos, &node) in order.iter().enumerate() {
            position[node] = pos;
        }
        let checks = (0..len)
            .map(|node| {
                order[..position[node]]
                    .iter()
                    .filter_map(|&earlier| {
                        let out = pattern.mask(node, earlier);
                        let inc = pattern.mask(earlier, node);
                        ((out | inc) != 0).then_some((earlier, out, inc))
                    })
                    .collect()
            })
            .collect();

        Self {
            order,
            anchor,
            checks,
        }
    }
}

struct MatchState {
    mapping: Vec<usize>,
    used: Vec<bool>,
}

fn extend(
    plan: &MatchPlan,
    pattern: &LabeledGraph,
    host: &LabeledGraph,
    depth: usize,
    state: &mut MatchState,
    results: &mut Vec<Vec<usize>>,
    limit: usize,
) {
    if depth == plan.order.len() {
        results.push(state.mapping.clone());
        return;
    }

    let node = plan.order[depth];
    let candidates: Vec<usize> = match plan.anchor[node] {
        Some(anchor) => host.neighbors(state.mapping[anchor]).to_vec(),
        None => (0..host.len()).collect(),
    };

    for candidate in candidates {
        if results.len() >= limit {
            return;
        }
        if state.used[candidate] || host.labels[candidate] != pattern.labels[node] {
            continue;
        }
        if !covers(host.mask(candidate, candidate), pattern.mask(node, node)) {
            continue;
        }
        let consistent = plan.checks[node].iter().all(|&(earlier, out, inc)| {
            let mapped = state.mapping[earlier];
            covers(host.mask(candidate, mapped), out) && covers(host.mask(mapped, candidate), inc)
        });
        if !consistent {
            continue;
        }

        state.mapping[node] = candidate;
        state.used[candidate] = true;
        extend(plan, pattern, host, depth + 1, state, results, limit);
        state.used[candidate] = false;
        state.mapping[node] = usize::MAX;
    }
}

fn covers(available: u8, required: u8) -> bool {
    required & !available == 0
}
