//! Pipeline executor that turns client method bodies into ranked patterns.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::SchaapiConfig;
use crate::core::errors::{Result, SchaapiError};
use crate::graph::adapter::{MethodBodyAdapter, MethodRef};
use crate::graph::builder::GraphBuilder;
use crate::graph::instruction::LibrarySurface;
use crate::graph::normalizer::{GraphNormalizer, NormalizedGraph};
use crate::mining::consolidator::PatternConsolidator;
use crate::mining::corpus::{Corpus, CorpusEntry};
use crate::mining::filter::PatternFilter;
use crate::mining::miner::PatternMiner;
use crate::mining::pattern::Pattern;

use super::pipeline_results::{size_histogram, MiningReport, MiningStatistics, Omission};

/// Progress callback function type
pub type ProgressCallback = Box<dyn Fn(&str, f64) + Send + Sync>;

/// Orchestrates graph construction, mining, consolidation and filtering.
pub struct MiningPipeline {
    config: SchaapiConfig,
    progress: Option<ProgressCallback>,
}

impl MiningPipeline {
    /// Create a pipeline for one configuration
    pub fn new(config: SchaapiConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Report (stage, percent) updates while running
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &SchaapiConfig {
        &self.config
    }

    /// Mine the projects exposed by `adapter`.
    ///
    /// Methods whose body cannot be read, built or normalized are left out of
    /// the corpus and listed as omissions. Configuration problems, including
    /// an adapter declaring fewer than two projects, abort the run before any
    /// method is read.
    pub fn run<A: MethodBodyAdapter + ?Sized>(&self, adapter: &A) -> Result<MiningReport> {
        self.config.validate()?;
        if self.config.library.packages.is_empty() {
            return Err(SchaapiError::config_field(
                "at least one library package is required",
                "library.packages",
            ));
        }
        let projects = adapter.projects();
        let distinct = projects.iter().collect::<BTreeSet<_>>().len();
        if distinct < 2 {
            return Err(SchaapiError::config_field(
                format!("mining needs at least 2 distinct projects, adapter declares {distinct}"),
                "corpus.projects",
            ));
        }

        match self.config.performance.max_threads {
            Some(threads) if self.config.performance.parallel => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("schaapi-worker-{i}"))
                    .build()
                    .map_err(|e| {
                        SchaapiError::pipeline("setup", format!("Failed to configure thread pool: {e}"))
                    })?;
                pool.install(|| self.execute(adapter, projects))
            }
            _ => self.execute(adapter, projects),
        }
    }

    fn execute<A: MethodBodyAdapter + ?Sized>(
        &self,
        adapter: &A,
        projects: Vec<String>,
    ) -> Result<MiningReport> {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, "Starting mining run");

        self.report("Enumerating methods...", 0.0);
        let mut omissions = Vec::new();
        let mut methods = Vec::new();
        for project in &projects {
            match adapter.methods(project) {
                Ok(found) => methods.extend(found),
                Err(err) if err.is_isolatable() => {
                    warn!(project = %project, error = %err, "Skipping project whose methods cannot be listed");
                    omissions.push(Omission::new(&MethodRef::new(project.as_str(), "*"), err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }
        info!(projects = projects.len(), methods = methods.len(), "Enumerated methods");

        self.report("Building usage graphs...", 10.0);
        let built = self.build_graphs(adapter, &methods);

        let mut entries = Vec::with_capacity(built.len());
        let mut empty_graphs = 0;
        for (processed, (method, result)) in methods.iter().zip(built).enumerate() {
            match result {
                Ok(graph) if graph.is_empty() => empty_graphs += 1,
                Ok(graph) => entries.push(CorpusEntry::new(method.clone(), graph)),
                Err(err) if err.is_isolatable() => {
                    warn!(method = %method, error = %err, "Omitting method from corpus");
                    omissions.push(Omission::new(method, err.to_string()));
                }
                Err(err) => {
                    return Err(SchaapiError::pipeline_after(
                        "build",
                        format!("{method}: {err}"),
                        processed,
                    ))
                }
            }
        }
        let corpus = Corpus::new(projects.iter().cloned(), entries);
        let per_project = corpus.graphs_per_project();
        let idle_projects = per_project.values().filter(|&&graphs| graphs == 0).count();
        debug!(graphs_per_project = ?per_project, "Corpus graphs per project");
        info!(
            graphs = corpus.len(),
            empty = empty_graphs,
            omitted = omissions.len(),
            idle_projects,
            "Assembled corpus"
        );

        self.report("Mining frequent patterns...", 40.0);
        let miner = PatternMiner::new(
            self.config.mining.clone(),
            self.config.normalization.clone(),
        )
        .with_parallelism(self.config.performance.parallel);
        let outcome = miner.mine(&corpus)?;
        let mined_pattern_sizes = size_histogram(outcome.patterns.iter().map(Pattern::node_count));

        self.report("Consolidating patterns...", 80.0);
        let consolidated = PatternConsolidator::new().consolidate(outcome.patterns);

        self.report("Filtering patterns...", 90.0);
        let filter = PatternFilter::from_config(&self.config.filters);
        debug!(rules = ?filter.rule_names(), "Applying pattern filters");
        let patterns = filter.apply(consolidated);

        let statistics = MiningStatistics {
            projects: corpus.project_count(),
            methods: methods.len(),
            graphs: corpus.len(),
            empty_graphs,
            omitted: omissions.len(),
            graph_sizes: size_histogram(corpus.entries().iter().map(|e| e.graph.node_count())),
            mined_pattern_sizes,
            reported_pattern_sizes: size_histogram(patterns.iter().map(Pattern::node_count)),
            levels: outcome.levels,
            candidates_evaluated: outcome.candidates_evaluated,
            truncated: outcome.truncated,
            unlabeled_templates: outcome.unlabeled_templates,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        self.report("Mining complete", 100.0);
        info!(
            run_id = %run_id,
            patterns = patterns.len(),
            omitted = statistics.omitted,
            duration_ms = statistics.duration_ms,
            "Mining run completed"
        );

        Ok(MiningReport {
            run_id,
            generated_at: Utc::now(),
            patterns,
            omissions,
            statistics,
        })
    }

    /// Build and normalize every method independently
    fn build_graphs<A: MethodBodyAdapter + ?Sized>(
        &self,
        adapter: &A,
        methods: &[MethodRef],
    ) -> Vec<Result<NormalizedGraph>> {
        let builder = GraphBuilder::new(LibrarySurface::from_config(&self.config.library));
        let normalizer = GraphNormalizer::new(self.config.normalization.clone());
        let graph_for = |method: &MethodRef| -> Result<NormalizedGraph> {
            let instructions = adapter.instructions(method)?;
            let graph = builder
                .build(&instructions)
                .map_err(|e| e.for_graph(method.to_string()))?;
            normalizer
                .normalize(&graph)
                .map_err(|e| e.for_graph(method.to_string()))
        };

        if self.config.performance.parallel {
            methods.par_iter().map(graph_for).collect()
        } else {
            methods.iter().map(graph_for).collect()
        }
    }

    fn report(&self, stage: &str, percent: f64) {
        if let Some(ref callback) = self.progress {
            callback(stage, percent);
        }
    }
}

impl Default for MiningPipeline {
    fn default() -> Self {
        Self::new(SchaapiConfig::default())
    }
}

impl std::fmt::Debug for MiningPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningPipeline")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "pipeline_executor_tests.rs"]
mod tests;
