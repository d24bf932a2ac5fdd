//! Removes patterns that add no information over a larger pattern.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::mining::matcher::{embeds, LabeledGraph};
use crate::mining::pattern::Pattern;

/// Drops subsumed patterns and fixes the output order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternConsolidator;

impl PatternConsolidator {
    /// Create a consolidator
    pub fn new() -> Self {
        Self
    }

    /// Remove duplicate and subsumed patterns.
    ///
    /// `p` is subsumed by `q` when `q` is strictly larger (more nodes, or as
    /// many nodes and more edges), has at least the support of `p`, and `p`
    /// occurs inside `q`. The result is ordered by descending support, then
    /// descending node count, then canonical label.
    pub fn consolidate(&self, patterns: Vec<Pattern>) -> Vec<Pattern> {
        let before = patterns.len();

        let mut unique: BTreeMap<String, Pattern> = BTreeMap::new();
        for pattern in patterns {
            match unique.get(&pattern.label) {
                Some(kept) if kept.support >= pattern.support => {}
                _ => {
                    unique.insert(pattern.label.clone(), pattern);
                }
            }
        }
        let patterns: Vec<Pattern> = unique.into_values().collect();

        let mut interner = LabelInterner::default();
        let templates: Vec<LabeledGraph> = patterns
            .iter()
            .map(|pattern| interner.template(pattern))
            .collect();

        let kept: Vec<bool> = (0..patterns.len())
            .map(|p| {
                !(0..patterns.len()).any(|q| {
                    q != p
                        && is_larger(&patterns[q], &patterns[p])
                        && patterns[q].support >= patterns[p].support
                        && embeds(&templates[p], &templates[q])
                })
            })
            .collect();

        let mut consolidated: Vec<Pattern> = patterns
            .into_iter()
            .zip(kept)
            .filter_map(|(pattern, keep)| keep.then_some(pattern))
            .collect();
        consolidated.sort_by(|a, b| {
            b.support
                .cmp(&a.support)
                .then_with(|| b.node_count().cmp(&a.node_count()))
                .then_with(|| a.label.cmp(&b.label))
        });

        debug!(
            before,
            after = consolidated.len(),
            "Consolidated patterns"
        );
        consolidated
    }
}

/// Whether `p` is a sub-template of `q` (equal templates included)
pub fn is_sub_template(p: &Pattern, q: &Pattern) -> bool {
    let mut interner = LabelInterner::default();
    let small = interner.template(p);
    let large = interner.template(q);
    embeds(&small, &large)
}

fn is_larger(q: &Pattern, p: &Pattern) -> bool {
    q.node_count() > p.node_count()
        || (q.node_count() == p.node_count() && q.edge_count() > p.edge_count())
}

#[derive(Default)]
struct LabelInterner {
    ids: HashMap<String, u32>,
}

impl LabelInterner {
    fn intern(&mut self, label: String) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(label).or_insert(next)
    }

    fn template(&mut self, pattern: &Pattern) -> LabeledGraph {
        let labels = pattern
            .nodes
            .iter()
            .map(|node| self.intern(node.label()))
            .collect();
        LabeledGraph::new(labels, pattern.edges.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::graph::instruction::InstructionKind;
    use crate::graph::usage::{EdgeKind, UsageEdge};
    use crate::mining::pattern::{Exemplar, PatternNode};

    fn pattern(symbols: &[&str], edges: &[(usize, usize, EdgeKind)], support: usize) -> Pattern {
        let nodes: Vec<PatternNode> = symbols
            .iter()
            .map(|s| PatternNode::new(InstructionKind::Invoke, *s))
            .collect();
        let edges: Vec<UsageEdge> = edges
            .iter()
            .map(|&(from, to, kind)| UsageEdge::new(from, to, kind))
            .collect();
        let label = format!("{symbols:?}{edges:?}");
        Pattern {
            nodes,
            edges,
            label,
            support,
            occurrences: support,
            projects: BTreeSet::new(),
            exemplar: Exemplar {
                project: "p".into(),
                method: "m()".into(),
                instructions: Vec::new(),
                node_orders: Vec::new(),
            },
        }
    }

    #[test]
    fn test_subsumed_by_larger_pattern_with_equal_support() {
        use EdgeKind::*;
        let single = pattern(&["a"], &[], 3);
        let pair = pattern(&["a", "b"], &[(0, 1, Control)], 3);
        let triple = pattern(&["a", "b", "c"], &[(0, 1, Control), (1, 2, Control)], 3);

        let result = PatternConsolidator::new().consolidate(vec![single, pair, triple.clone()]);
        assert_eq!(result, vec![triple]);
    }

    #[test]
    fn test_higher_support_sub_pattern_survives() {
        use EdgeKind::*;
        let pair = pattern(&["a", "b"], &[(0, 1, Control)], 5);
        let triple = pattern(&["a", "b", "c"], &[(0, 1, Control), (1, 2, Control)], 3);

        let result = PatternConsolidator::new().consolidate(vec![triple.clone(), pair.clone()]);
        assert_eq!(result, vec![pair, triple]);
    }

    #[test]
    fn test_edge_subset_with_same_nodes_is_subsumed() {
        use EdgeKind::*;
        let data_only = pattern(&["new", "add"], &[(0, 1, Data)], 3);
        let both = pattern(&["new", "add"], &[(0, 1, Control), (0, 1, Data)], 3);

        let result = PatternConsolidator::new().consolidate(vec![data_only, both.clone()]);
        assert_eq!(result, vec![both]);
    }

    #[test]
    fn test_unrelated_patterns_are_kept_and_ordered() {
        use EdgeKind::*;
        let x = pattern(&["x", "y"], &[(0, 1, Control)], 2);
        let z = pattern(&["z"], &[], 4);
        let w = pattern(&["w", "v", "u"], &[(0, 1, Data), (1, 2, Data)], 2);

        let result = PatternConsolidator::new().consolidate(vec![x.clone(), z.clone(), w.clone()]);
        assert_eq!(result, vec![z, w, x]);
    }

    #[test]
    fn test_duplicate_labels_collapse() {
        let a = pattern(&["a"], &[], 2);
        let result = PatternConsolidator::new().consolidate(vec![a.clone(), a.clone()]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_is_sub_template() {
        use EdgeKind::*;
        let pair = pattern(&["a", "b"], &[(0, 1, Control)], 3);
        let triple = pattern(&["a", "b", "c"], &[(0, 1, Control), (1, 2, Control)], 3);
        assert!(is_sub_template(&pair, &triple));
        assert!(!is_sub_template(&triple, &pair));
    }
}
