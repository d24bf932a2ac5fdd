//! # Schaapi-RS: Library Usage Pattern Mining
//!
//! Mines recurring library API usage idioms from the compiled code of many
//! client projects and hands the most frequent idioms to a test generator,
//! so that library changes which break real-world usage are caught early.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          Mining Pipeline                          │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  Method Body   │  Usage Graph   │   Pattern      │  I/O          │
//! │  Adapter       │  Layer         │   Mining       │               │
//! │                │                │                │               │
//! │ • Instructions │ • Builder      │ • Corpus       │ • Corpus file │
//! │ • Projects     │ • Normalizer   │ • Miner        │ • Reports     │
//! │                │                │ • Consolidator │ • Exports     │
//! │                │                │ • Filters      │               │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schaapi_rs::core::config::SchaapiConfig;
//! use schaapi_rs::core::pipeline::MiningPipeline;
//! use schaapi_rs::io::corpus_file::JsonCorpusAdapter;
//!
//! fn main() -> schaapi_rs::Result<()> {
//!     let config = SchaapiConfig::default()
//!         .with_library_packages(["java.util"])
//!         .with_min_support(3);
//!     let adapter = JsonCorpusAdapter::from_path("corpus.json")?;
//!
//!     let report = MiningPipeline::new(config).run(&adapter)?;
//!     for pattern in &report.patterns {
//!         println!("{} (support {})", pattern.summary(), pattern.support);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Configuration, errors and orchestration
pub mod core {
    //! Errors, configuration and the mining pipeline.

    pub mod config;
    pub mod errors;
    pub mod pipeline;
}

// Per-method usage graphs
pub mod graph {
    //! Usage graph model, construction and canonical labeling.

    pub mod adapter;
    pub mod builder;
    pub mod instruction;
    pub mod normalizer;
    pub mod usage;
}

// Frequent pattern mining
pub mod mining {
    //! Corpus assembly, template mining, consolidation and filtering.

    pub mod consolidator;
    pub mod corpus;
    pub mod filter;
    pub mod matcher;
    pub mod miner;
    pub mod pattern;
}

// Corpus loading, reports and exports
pub mod io {
    //! Corpus files, mining reports and test generator exports.

    pub mod corpus_file;
    pub mod export;
    pub mod reports;
    pub mod test_results;
}

// Re-export primary types for convenience
pub use crate::core::config::SchaapiConfig;
pub use crate::core::errors::{Result, ResultExt, SchaapiError};
pub use crate::core::pipeline::{MiningPipeline, MiningReport};
pub use crate::graph::adapter::{MethodBodyAdapter, MethodRef};
pub use crate::graph::builder::GraphBuilder;
pub use crate::graph::instruction::{Instruction, InstructionKind, LibrarySurface, Operand};
pub use crate::graph::normalizer::{GraphNormalizer, NormalizedGraph};
pub use crate::graph::usage::{EdgeKind, UsageEdge, UsageGraph, UsageNode};
pub use crate::mining::consolidator::PatternConsolidator;
pub use crate::mining::corpus::{Corpus, CorpusEntry};
pub use crate::mining::miner::{MiningOutcome, PatternMiner};
pub use crate::mining::pattern::Pattern;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
