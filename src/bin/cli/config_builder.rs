//! Configuration loading and command-line overrides.

use std::path::Path;

use schaapi_rs::core::config::SchaapiConfig;
use tracing::debug;

use crate::cli::args::MineArgs;

/// Load configuration from file or use defaults
pub fn load_configuration(config_path: Option<&Path>) -> anyhow::Result<SchaapiConfig> {
    let config = match config_path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration file");
            SchaapiConfig::from_file(path)?
        }
        None => SchaapiConfig::default(),
    };
    Ok(config)
}

/// Build the run configuration for `mine`.
///
/// Flags override the configuration file. When neither names a library, the
/// packages declared by the corpus file are used.
pub fn build_mine_config(
    args: &MineArgs,
    corpus_library: &[String],
) -> anyhow::Result<SchaapiConfig> {
    let mut config = load_configuration(args.config.as_deref())?;

    if !args.library.is_empty() {
        config.library.packages = args.library.clone();
    } else if config.library.packages.is_empty() {
        config.library.packages = corpus_library.to_vec();
    }
    if let Some(min_support) = args.min_support {
        config.mining.min_support = min_support;
    }
    if let Some(max_pattern_size) = args.max_pattern_size {
        config.mining.max_pattern_size = max_pattern_size;
    }
    if let Some(policy) = args.support_policy {
        config.mining.support_policy = policy.into();
    }
    if let Some(timeout) = args.timeout_secs {
        config.mining.timeout_secs = Some(timeout);
    }
    if args.sequential {
        config.performance.parallel = false;
    }

    config.validate()?;
    Ok(config)
}
