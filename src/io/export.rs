//! Records handed to the test generator, one per reported pattern.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SchaapiError};
use crate::graph::instruction::Instruction;
use crate::graph::usage::EdgeKind;
use crate::mining::pattern::Pattern;

/// Test generator input for one pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternExport {
    /// Canonical label, stable across runs
    pub label: String,
    /// Symbol signatures in canonical node order
    pub nodes: Vec<String>,
    /// `(from, to, kind)` triples over node positions
    pub edges: Vec<(usize, usize, EdgeKind)>,
    /// Concrete instructions of one occurrence, in program order
    pub exemplar_embedding: Vec<Instruction>,
    /// For each node position, the index of its instruction in
    /// `exemplar_embedding`
    pub exemplar_nodes: Vec<usize>,
    /// Pattern support
    pub support: usize,
}

impl From<&Pattern> for PatternExport {
    fn from(pattern: &Pattern) -> Self {
        Self {
            label: pattern.label.clone(),
            nodes: pattern.nodes.iter().map(|n| n.symbol.clone()).collect(),
            edges: pattern
                .edges
                .iter()
                .map(|e| (e.from, e.to, e.kind))
                .collect(),
            exemplar_embedding: pattern.exemplar.instructions.clone(),
            exemplar_nodes: pattern.exemplar.node_positions(),
            support: pattern.support,
        }
    }
}

/// Convert patterns to export records, keeping their order
pub fn export_patterns(patterns: &[Pattern]) -> Vec<PatternExport> {
    patterns.iter().map(PatternExport::from).collect()
}

/// Write export records for `patterns` as pretty JSON
pub fn write_exports(patterns: &[Pattern], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(&export_patterns(patterns))?;
    fs::write(path, content).map_err(|e| {
        SchaapiError::io(format!("Failed to write pattern export: {}", path.display()), e)
    })
}

/// Write one Graphviz file per pattern into `dir`, named by rank
pub fn write_dot_files(patterns: &[Pattern], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| {
        SchaapiError::io(format!("Failed to create DOT directory: {}", dir.display()), e)
    })?;

    patterns
        .iter()
        .enumerate()
        .map(|(rank, pattern)| {
            let path = dir.join(format!("pattern-{:03}.dot", rank + 1));
            fs::write(&path, pattern.to_dot()).map_err(|e| {
                SchaapiError::io(format!("Failed to write DOT file: {}", path.display()), e)
            })?;
            Ok(path)
        })
        .collect()
}
