//! Results produced by a mining pipeline run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::adapter::MethodRef;
use crate::mining::pattern::Pattern;

/// A method excluded from the corpus, with the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Omission {
    /// Owning project
    pub project: String,
    /// Method signature
    pub method: String,
    /// Failure that caused the omission
    pub reason: String,
}

impl Omission {
    /// Record an omitted method
    pub fn new(method: &MethodRef, reason: impl Into<String>) -> Self {
        Self {
            project: method.project.clone(),
            method: method.signature.clone(),
            reason: reason.into(),
        }
    }
}

/// Counters and histograms describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningStatistics {
    /// Projects declared by the adapter
    pub projects: usize,
    /// Methods enumerated across all projects
    pub methods: usize,
    /// Non-empty usage graphs in the corpus
    pub graphs: usize,
    /// Methods without any library usage
    pub empty_graphs: usize,
    /// Methods omitted because their graph could not be produced
    pub omitted: usize,
    /// Node count -> number of corpus graphs of that size
    pub graph_sizes: BTreeMap<usize, usize>,
    /// Node count -> number of mined patterns of that size
    pub mined_pattern_sizes: BTreeMap<usize, usize>,
    /// Node count -> number of reported patterns of that size
    pub reported_pattern_sizes: BTreeMap<usize, usize>,
    /// Template sizes explored by the miner
    pub levels: usize,
    /// Templates whose support was computed
    pub candidates_evaluated: usize,
    /// Mining stopped on its time budget
    pub truncated: bool,
    /// Grown templates the miner could not label canonically
    #[serde(default)]
    pub unlabeled_templates: usize,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
}

/// Count items per size
pub fn size_histogram<I>(sizes: I) -> BTreeMap<usize, usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut histogram = BTreeMap::new();
    for size in sizes {
        *histogram.entry(size).or_insert(0) += 1;
    }
    histogram
}

/// Complete output of a mining pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningReport {
    /// Unique run identifier
    pub run_id: String,
    /// Completion time
    pub generated_at: DateTime<Utc>,
    /// Consolidated and filtered patterns, best first
    pub patterns: Vec<Pattern>,
    /// Methods left out of the corpus
    pub omissions: Vec<Omission>,
    /// Run statistics
    pub statistics: MiningStatistics,
}

impl MiningReport {
    /// True when no pattern survived
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of reported patterns
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
