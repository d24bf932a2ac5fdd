//! Mining report writers.
//!
//! JSON and YAML carry the complete report. CSV carries the size histograms
//! only, one row per node count, for spreadsheet comparison across runs.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::errors::{Result, SchaapiError};
use crate::core::pipeline::{MiningReport, MiningStatistics};

/// Output format of a written report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
    /// Size histograms as comma-separated values
    Csv,
}

impl ReportFormat {
    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Csv => "csv",
        }
    }

    /// Guess the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for ReportFormat {
    type Err = SchaapiError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "csv" => Ok(Self::Csv),
            other => Err(SchaapiError::validation_field(
                format!("unsupported report format '{other}'"),
                "format",
            )),
        }
    }
}

/// Render a report in the given format
pub fn render_report(report: &MiningReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Yaml => Ok(serde_yaml::to_string(report)?),
        ReportFormat::Csv => Ok(size_table_csv(&report.statistics)),
    }
}

/// Write a report to `path`
pub fn write_report(report: &MiningReport, format: ReportFormat, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = render_report(report, format)?;
    fs::write(path, content).map_err(|e| {
        SchaapiError::io(format!("Failed to write report: {}", path.display()), e)
    })?;
    info!(path = %path.display(), format = format.extension(), "Report written");
    Ok(())
}

/// Histogram table: `size,graphs,mined_patterns,reported_patterns`
pub fn size_table_csv(statistics: &MiningStatistics) -> String {
    let sizes: BTreeSet<usize> = statistics
        .graph_sizes
        .keys()
        .chain(statistics.mined_pattern_sizes.keys())
        .chain(statistics.reported_pattern_sizes.keys())
        .copied()
        .collect();

    let mut csv = String::from("size,graphs,mined_patterns,reported_patterns\n");
    for size in sizes {
        let count = |histogram: &std::collections::BTreeMap<usize, usize>| {
            histogram.get(&size).copied().unwrap_or(0)
        };
        let _ = writeln!(
            csv,
            "{},{},{},{}",
            size,
            count(&statistics.graph_sizes),
            count(&statistics.mined_pattern_sizes),
            count(&statistics.reported_pattern_sizes)
        );
    }
    csv
}
