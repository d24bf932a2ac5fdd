//! Configuration types and management for schaapi-rs.
//!
//! All run-wide settings (support threshold, size cap, labeling bounds) are
//! carried in a [`SchaapiConfig`] value that callers pass explicitly into the
//! pipeline, so independent runs with different thresholds never share state.

pub mod validation;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SchaapiError};

pub use validation::{
    validate_bounded_usize, validate_min_usize, validate_package_prefixes,
    validate_positive_usize,
};

/// Smallest support threshold that can describe a recurring idiom.
pub const MIN_SUPPORT_FLOOR: usize = 2;

/// Main configuration for a mining run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchaapiConfig {
    /// Target library description
    #[serde(default)]
    pub library: LibraryConfig,

    /// Pattern mining thresholds and limits
    #[serde(default)]
    pub mining: MiningConfig,

    /// Canonical labeling bounds
    #[serde(default)]
    pub normalization: NormalizationConfig,

    /// Post-mining pattern filters
    #[serde(default)]
    pub filters: FilterConfig,

    /// Parallelism settings
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Configuration construction and I/O methods for [`SchaapiConfig`].
impl SchaapiConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            SchaapiError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        serde_yaml::from_str(&content).map_err(Into::into)
    }

    /// Load configuration from a YAML or JSON file, chosen by extension
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    SchaapiError::io(format!("Failed to read config file: {}", path.display()), e)
                })?;
                serde_json::from_str(&content).map_err(Into::into)
            }
            _ => Self::from_yaml_file(path),
        }
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            SchaapiError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.library.validate()?;
        self.mining.validate()?;
        self.normalization.validate()?;
        self.filters.validate()?;
        self.performance.validate()?;
        Ok(())
    }

    /// Builder-style override of the library packages
    pub fn with_library_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.library.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style override of the support threshold
    pub fn with_min_support(mut self, min_support: usize) -> Self {
        self.mining.min_support = min_support;
        self
    }

    /// Builder-style override of the pattern size cap
    pub fn with_max_pattern_size(mut self, max_pattern_size: usize) -> Self {
        self.mining.max_pattern_size = max_pattern_size;
        self
    }
}

/// Target library description
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Package prefixes making up the library's public surface
    #[serde(default)]
    pub packages: Vec<String>,
}

impl LibraryConfig {
    /// Validate library configuration
    pub fn validate(&self) -> Result<()> {
        validate_package_prefixes(&self.packages, "library.packages")
    }
}

/// How occurrences are counted towards a pattern's support.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SupportPolicy {
    /// Number of distinct client projects containing an occurrence
    #[default]
    Projects,
    /// Number of distinct usage graphs (methods) containing an occurrence
    Graphs,
}

/// Pattern mining thresholds and limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    /// Minimum support a pattern needs to be reported
    #[serde(default = "MiningConfig::default_min_support")]
    pub min_support: usize,

    /// Largest template size (in nodes) the miner grows to
    #[serde(default = "MiningConfig::default_max_pattern_size")]
    pub max_pattern_size: usize,

    /// What a unit of support counts
    #[serde(default)]
    pub support_policy: SupportPolicy,

    /// Upper bound on occurrences of one template kept per graph
    #[serde(default = "MiningConfig::default_max_embeddings_per_graph")]
    pub max_embeddings_per_graph: usize,

    /// Optional wall-clock budget for template growth, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_support: Self::default_min_support(),
            max_pattern_size: Self::default_max_pattern_size(),
            support_policy: SupportPolicy::default(),
            max_embeddings_per_graph: Self::default_max_embeddings_per_graph(),
            timeout_secs: None,
        }
    }
}

impl MiningConfig {
    const fn default_min_support() -> usize {
        MIN_SUPPORT_FLOOR
    }

    const fn default_max_pattern_size() -> usize {
        8
    }

    const fn default_max_embeddings_per_graph() -> usize {
        256
    }

    /// Validate mining configuration
    pub fn validate(&self) -> Result<()> {
        validate_min_usize(self.min_support, MIN_SUPPORT_FLOOR, "mining.min_support")?;
        validate_positive_usize(self.max_pattern_size, "mining.max_pattern_size")?;
        validate_positive_usize(
            self.max_embeddings_per_graph,
            "mining.max_embeddings_per_graph",
        )?;
        if self.timeout_secs == Some(0) {
            return Err(SchaapiError::config_field(
                "mining.timeout_secs must be greater than 0 when set",
                "mining.timeout_secs",
            ));
        }
        Ok(())
    }
}

/// Canonical labeling bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizationConfig {
    /// Refinement rounds allowed before a graph is reported as unstable
    #[serde(default = "NormalizationConfig::default_max_label_iterations")]
    pub max_label_iterations: usize,

    /// Tie-breaking branches explored before falling back to program order
    #[serde(default = "NormalizationConfig::default_max_canonical_branches")]
    pub max_canonical_branches: usize,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            max_label_iterations: Self::default_max_label_iterations(),
            max_canonical_branches: Self::default_max_canonical_branches(),
        }
    }
}

impl NormalizationConfig {
    const fn default_max_label_iterations() -> usize {
        64
    }

    const fn default_max_canonical_branches() -> usize {
        512
    }

    /// Validate normalization configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(
            self.max_label_iterations,
            "normalization.max_label_iterations",
        )?;
        validate_positive_usize(
            self.max_canonical_branches,
            "normalization.max_canonical_branches",
        )
    }
}

/// Post-mining pattern filters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterConfig {
    /// Patterns with fewer nodes are dropped
    #[serde(default = "FilterConfig::default_min_pattern_nodes")]
    pub min_pattern_nodes: usize,

    /// Drop patterns that start with a constructor call but lack its allocation
    #[serde(default = "FilterConfig::default_drop_incomplete_init")]
    pub drop_incomplete_init: bool,

    /// Drop patterns holding a loop whose body has no library call
    #[serde(default = "FilterConfig::default_drop_empty_loops")]
    pub drop_empty_loops: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_pattern_nodes: Self::default_min_pattern_nodes(),
            drop_incomplete_init: Self::default_drop_incomplete_init(),
            drop_empty_loops: Self::default_drop_empty_loops(),
        }
    }
}

impl FilterConfig {
    const fn default_min_pattern_nodes() -> usize {
        2
    }

    const fn default_drop_incomplete_init() -> bool {
        true
    }

    const fn default_drop_empty_loops() -> bool {
        true
    }

    /// Validate filter configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.min_pattern_nodes, "filters.min_pattern_nodes")
    }
}

/// Parallelism settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerformanceConfig {
    /// Build and scan graphs on the rayon pool
    #[serde(default = "PerformanceConfig::default_parallel")]
    pub parallel: bool,

    /// Size of a dedicated worker pool; the global pool is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel: Self::default_parallel(),
            max_threads: None,
        }
    }
}

impl PerformanceConfig {
    const fn default_parallel() -> bool {
        true
    }

    /// Validate performance configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(threads) = self.max_threads {
            validate_bounded_usize(threads, 1, 1024, "performance.max_threads")?;
        }
        Ok(())
    }
}
