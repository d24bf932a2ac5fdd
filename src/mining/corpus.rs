//! The immutable input of a mining run.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::adapter::MethodRef;
use crate::graph::normalizer::NormalizedGraph;

/// One normalized usage graph tagged with the method it came from.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    /// Source method, including its owning project
    pub method: MethodRef,
    /// Normalized usage graph of the method
    pub graph: NormalizedGraph,
}

impl CorpusEntry {
    /// Tag a graph with its method
    pub fn new(method: MethodRef, graph: NormalizedGraph) -> Self {
        Self { method, graph }
    }

    /// Owning project identifier
    pub fn project(&self) -> &str {
        &self.method.project
    }
}

/// All usage graphs of one mining run.
///
/// The declared project set is kept apart from the graphs: a project whose
/// methods never touch the library still counts as a participant.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    projects: BTreeSet<String>,
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    /// Assemble a corpus from declared projects and graph entries.
    ///
    /// Empty graphs are dropped and entries are sorted by method so that
    /// mining output does not depend on the order graphs were produced in.
    pub fn new<I, S>(projects: I, entries: Vec<CorpusEntry>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut projects: BTreeSet<String> = projects.into_iter().map(Into::into).collect();
        let mut entries: Vec<CorpusEntry> = entries
            .into_iter()
            .filter(|entry| !entry.graph.is_empty())
            .collect();
        entries.sort_by(|a, b| {
            a.method
                .cmp(&b.method)
                .then_with(|| a.graph.label().cmp(b.graph.label()))
        });
        projects.extend(entries.iter().map(|entry| entry.method.project.clone()));

        Self { projects, entries }
    }

    /// Corpus whose projects are exactly those owning an entry
    pub fn from_entries(entries: Vec<CorpusEntry>) -> Self {
        Self::new(Vec::<String>::new(), entries)
    }

    /// Declared project identifiers
    pub fn projects(&self) -> &BTreeSet<String> {
        &self.projects
    }

    /// Number of distinct projects
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Graph entries, sorted by method
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Number of graphs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no graph has a library node
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of graphs per project
    pub fn graphs_per_project(&self) -> BTreeMap<&str, usize> {
        let mut counts: BTreeMap<&str, usize> =
            self.projects.iter().map(|p| (p.as_str(), 0)).collect();
        for entry in &self.entries {
            *counts.entry(entry.project()).or_default() += 1;
        }
        counts
    }
}
