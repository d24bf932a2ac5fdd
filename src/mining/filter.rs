//! Post-mining pattern filters.
//!
//! Filtering runs after consolidation and removes patterns that would make
//! poor regression tests even though they are frequent.

use std::collections::HashSet;

use tracing::debug;

use crate::core::config::FilterConfig;
use crate::graph::instruction::InstructionKind;
use crate::graph::usage::EdgeKind;
use crate::mining::pattern::Pattern;

/// A single keep-or-drop decision on a pattern.
pub trait PatternFilterRule: Send + Sync {
    /// Rule name used in logs
    fn name(&self) -> &'static str;

    /// Whether the pattern should be kept
    fn retain(&self, pattern: &Pattern) -> bool;
}

/// Drops patterns with fewer than a minimum number of nodes.
#[derive(Debug, Clone, Copy)]
pub struct MinimumSizeRule {
    min_nodes: usize,
}

impl MinimumSizeRule {
    /// Create the rule
    pub fn new(min_nodes: usize) -> Self {
        Self { min_nodes }
    }
}

impl PatternFilterRule for MinimumSizeRule {
    fn name(&self) -> &'static str {
        "minimum_size"
    }

    fn retain(&self, pattern: &Pattern) -> bool {
        pattern.node_count() >= self.min_nodes
    }
}

/// Drops patterns that call a constructor on an object they never allocate.
///
/// Such patterns start in the middle of an object's creation and cannot be
/// replayed as a test.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncompleteInitRule;

impl PatternFilterRule for IncompleteInitRule {
    fn name(&self) -> &'static str {
        "incomplete_init"
    }

    fn retain(&self, pattern: &Pattern) -> bool {
        let mut allocated: HashSet<&str> = HashSet::new();
        for instruction in &pattern.exemplar.instructions {
            match instruction.kind {
                InstructionKind::New => {
                    if let Some(class) = instruction.constructed_class() {
                        allocated.insert(class);
                    }
                }
                InstructionKind::Invoke => {
                    if let Some(class) = instruction.constructed_class() {
                        if !allocated.contains(class) {
                            return false;
                        }
                    }
                }
                _ => {}
            }
        }
        true
    }
}

/// Drops patterns containing a loop with no body.
///
/// A loop-back edge from a node to itself closes a loop whose only library
/// call is the one that decides whether to iterate again.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLoopRule;

impl PatternFilterRule for EmptyLoopRule {
    fn name(&self) -> &'static str {
        "empty_loop"
    }

    fn retain(&self, pattern: &Pattern) -> bool {
        !pattern
            .edges
            .iter()
            .any(|edge| edge.kind == EdgeKind::LoopBack && edge.from == edge.to)
    }
}

/// Ordered set of filter rules; a pattern survives only if every rule keeps it.
#[derive(Default)]
pub struct PatternFilter {
    rules: Vec<Box<dyn PatternFilterRule>>,
}

impl PatternFilter {
    /// Create a filter without rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the rules enabled by the filter configuration
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut filter = Self::new().with_rule(MinimumSizeRule::new(config.min_pattern_nodes));
        if config.drop_incomplete_init {
            filter = filter.with_rule(IncompleteInitRule);
        }
        if config.drop_empty_loops {
            filter = filter.with_rule(EmptyLoopRule);
        }
        filter
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: impl PatternFilterRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the configured rules, in order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Keep the patterns every rule retains, preserving their order
    pub fn apply(&self, patterns: Vec<Pattern>) -> Vec<Pattern> {
        let before = patterns.len();
        let kept: Vec<Pattern> = patterns
            .into_iter()
            .filter(|pattern| match self.rules.iter().find(|rule| !rule.retain(pattern)) {
                Some(rule) => {
                    debug!(rule = rule.name(), pattern = %pattern.label, "Pattern filtered out");
                    false
                }
                None => true,
            })
            .collect();

        debug!(before, after = kept.len(), "Filtered patterns");
        kept
    }
}

impl std::fmt::Debug for PatternFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternFilter")
            .field("rules", &self.rule_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::graph::instruction::Instruction;
    use crate::graph::usage::UsageEdge;
    use crate::mining::pattern::{Exemplar, PatternNode};

    fn pattern(instructions: Vec<Instruction>) -> Pattern {
        Pattern {
            nodes: instructions
                .iter()
                .map(|i| PatternNode::new(i.kind, i.symbol_or_empty()))
                .collect(),
            edges: Vec::new(),
            label: format!("{instructions:?}"),
            support: 2,
            occurrences: 2,
            projects: BTreeSet::new(),
            exemplar: Exemplar {
                project: "p".into(),
                method: "m()".into(),
                node_orders: (0..instructions.len()).collect(),
                instructions,
            },
        }
    }

    #[test]
    fn test_minimum_size_rule() {
        let rule = MinimumSizeRule::new(2);
        assert!(!rule.retain(&pattern(vec![Instruction::invoke("lib.A.a()")])));
        assert!(rule.retain(&pattern(vec![
            Instruction::invoke("lib.A.a()"),
            Instruction::invoke("lib.A.b()"),
        ])));
    }

    #[test]
    fn test_incomplete_init_rule() {
        let rule = IncompleteInitRule;

        let dangling = pattern(vec![
            Instruction::invoke("lib.Buffer.<init>(int)"),
            Instruction::invoke("lib.Buffer.flip()"),
        ]);
        assert!(!rule.retain(&dangling));

        let complete = pattern(vec![
            Instruction::construct("lib.Buffer.<init>()"),
            Instruction::invoke("lib.Buffer.<init>(int)"),
        ]);
        assert!(rule.retain(&complete));

        let other_class = pattern(vec![
            Instruction::construct("lib.Other.<init>()"),
            Instruction::invoke("lib.Buffer.<init>(int)"),
        ]);
        assert!(!rule.retain(&other_class));

        let plain = pattern(vec![Instruction::construct("lib.Buffer.<init>()")]);
        assert!(rule.retain(&plain));
    }

    #[test]
    fn test_empty_loop_rule() {
        let rule = EmptyLoopRule;
        let spin = |edges: Vec<UsageEdge>| Pattern {
            edges,
            ..pattern(vec![
                Instruction::invoke("lib.It.hasNext()"),
                Instruction::invoke("lib.It.next()"),
            ])
        };

        // while (it.hasNext()) {} it.next();
        assert!(!rule.retain(&spin(vec![
            UsageEdge::new(0, 0, EdgeKind::LoopBack),
            UsageEdge::new(0, 1, EdgeKind::Control),
        ])));
        // while (it.hasNext()) { it.next(); }
        assert!(rule.retain(&spin(vec![
            UsageEdge::new(0, 1, EdgeKind::Control),
            UsageEdge::new(1, 0, EdgeKind::LoopBack),
        ])));
        assert!(rule.retain(&spin(vec![UsageEdge::new(0, 1, EdgeKind::Control)])));
    }

    #[test]
    fn test_filter_from_config() {
        let filter = PatternFilter::from_config(&FilterConfig::default());
        assert_eq!(
            filter.rule_names(),
            vec!["minimum_size", "incomplete_init", "empty_loop"]
        );

        let relaxed = PatternFilter::from_config(&FilterConfig {
            min_pattern_nodes: 1,
            drop_incomplete_init: false,
            drop_empty_loops: false,
        });
        assert_eq!(relaxed.rule_names(), vec!["minimum_size"]);

        let patterns = vec![
            pattern(vec![Instruction::invoke("lib.A.a()")]),
            pattern(vec![
                Instruction::invoke("lib.A.<init>()"),
                Instruction::invoke("lib.A.b()"),
            ]),
            pattern(vec![
                Instruction::construct("lib.A.<init>()"),
                Instruction::invoke("lib.A.b()"),
            ]),
        ];
        assert_eq!(relaxed.apply(patterns.clone()).len(), 3);
        let kept = filter.apply(patterns);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].nodes[0].kind, InstructionKind::New);
    }
}
