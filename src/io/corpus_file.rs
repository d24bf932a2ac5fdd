//! File-backed corpus of resolved client method bodies.
//!
//! The file lists client projects, their methods and each method's
//! instruction sequence with symbols already resolved:
//!
//! ```json
//! {
//!   "library": ["java.util"],
//!   "projects": [
//!     { "id": "alpha", "methods": [
//!       { "signature": "com.alpha.Main.run()", "instructions": [
//!         { "kind": "new", "symbol": "java.util.ArrayList.<init>()", "result": "list" },
//!         { "kind": "invoke", "symbol": "java.util.List.add(java.lang.Object)",
//!           "operands": [{ "local": "list" }, { "constant": "1" }] }
//!       ] }
//!     ] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::{Result, ResultExt, SchaapiError};
use crate::graph::adapter::{MethodBodyAdapter, MethodRef};
use crate::graph::instruction::Instruction;

/// Serialized corpus description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFile {
    /// Library package prefixes, used when no configuration names them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub library: Vec<String>,
    /// Client projects
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
}

/// One client project in a corpus file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Project identifier
    pub id: String,
    /// Methods of the project
    #[serde(default)]
    pub methods: Vec<MethodRecord>,
}

/// One method body in a corpus file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    /// Fully-qualified method signature
    pub signature: String,
    /// Resolved instructions in program order
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl CorpusFile {
    /// Load a corpus file; `.yaml`/`.yml` are read as YAML, anything else as JSON
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SchaapiError::io(format!("Failed to read corpus file: {}", path.display()), e)
        })?;

        let corpus = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Self::from_json_str(&content),
        }
        .with_context(|| format!("Malformed corpus file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded corpus file");
        Ok(corpus)
    }

    /// Parse a JSON corpus
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Write the corpus as pretty JSON
    pub fn to_json_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).map_err(|e| {
            SchaapiError::io(format!("Failed to write corpus file: {}", path.display()), e)
        })
    }

    /// Number of methods across all projects
    pub fn method_count(&self) -> usize {
        self.projects.iter().map(|p| p.methods.len()).sum()
    }
}

/// Method body adapter over an in-memory corpus file.
///
/// Projects keep their file order; a project listed twice has its methods
/// merged. Within a project a repeated signature keeps the last body.
#[derive(Debug, Clone, Default)]
pub struct JsonCorpusAdapter {
    projects: IndexMap<String, IndexMap<String, Vec<Instruction>>>,
}

impl JsonCorpusAdapter {
    /// Build the adapter from a parsed corpus file
    pub fn new(corpus: CorpusFile) -> Self {
        let mut projects: IndexMap<String, IndexMap<String, Vec<Instruction>>> = IndexMap::new();
        for project in corpus.projects {
            let methods = projects.entry(project.id).or_default();
            for method in project.methods {
                methods.insert(method.signature, method.instructions);
            }
        }
        Self { projects }
    }

    /// Load and wrap a corpus file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        CorpusFile::from_path(path).map(Self::new)
    }
}

impl From<CorpusFile> for JsonCorpusAdapter {
    fn from(corpus: CorpusFile) -> Self {
        Self::new(corpus)
    }
}

impl MethodBodyAdapter for JsonCorpusAdapter {
    fn projects(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    fn methods(&self, project: &str) -> Result<Vec<MethodRef>> {
        let methods = self
            .projects
            .get(project)
            .ok_or_else(|| SchaapiError::adapter(project, "unknown project"))?;
        Ok(methods
            .keys()
            .map(|signature| MethodRef::new(project, signature.as_str()))
            .collect())
    }

    fn instructions(&self, method: &MethodRef) -> Result<Vec<Instruction>> {
        self.projects
            .get(&method.project)
            .and_then(|methods| methods.get(&method.signature))
            .cloned()
            .ok_or_else(|| SchaapiError::adapter(method.to_string(), "unknown method"))
    }
}
