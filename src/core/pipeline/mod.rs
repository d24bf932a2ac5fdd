//! Mining Pipeline Module
//!
//! Orchestrates a complete mining run over the projects exposed by a
//! [`MethodBodyAdapter`](crate::graph::adapter::MethodBodyAdapter).
//!
//! ## Pipeline Stages
//!
//! 1. **Enumeration**: list every (project, method) pair
//! 2. **Graph construction**: build and normalize one usage graph per method, in parallel
//! 3. **Corpus assembly**: collect non-empty graphs; failed methods become omissions
//! 4. **Mining**: level-wise frequent template search
//! 5. **Consolidation and filtering**: drop subsumed and unusable patterns
//!
//! ## Usage
//!
//! ```ignore
//! use schaapi_rs::core::pipeline::MiningPipeline;
//! use schaapi_rs::io::corpus_file::JsonCorpusAdapter;
//!
//! let adapter = JsonCorpusAdapter::from_path("corpus.json")?;
//! let report = MiningPipeline::new(config).run(&adapter)?;
//! println!("{} patterns", report.pattern_count());
//! ```

pub use pipeline_executor::{MiningPipeline, ProgressCallback};
pub use pipeline_results::{size_histogram, MiningReport, MiningStatistics, Omission};

mod pipeline_executor;
mod pipeline_results;
