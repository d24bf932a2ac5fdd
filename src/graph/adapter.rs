//! Boundary to the collaborator that reads compiled client code.
//!
//! The core never parses bytecode itself. An adapter enumerates client
//! projects and their methods and yields each method body as a resolved,
//! program-ordered instruction sequence.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::graph::instruction::Instruction;

/// A method of a client project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodRef {
    /// Owning client project
    pub project: String,
    /// Fully-qualified method signature
    pub signature: String,
}

impl MethodRef {
    /// Create a method reference
    pub fn new(project: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            signature: signature.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.project, self.signature)
    }
}

/// Source of method bodies for a mining run.
///
/// Implementations must be shareable across worker threads; the pipeline asks
/// for instructions of different methods concurrently.
pub trait MethodBodyAdapter: Send + Sync {
    /// Identifiers of every client project in the run
    fn projects(&self) -> Vec<String>;

    /// Methods declared by one project
    fn methods(&self, project: &str) -> Result<Vec<MethodRef>>;

    /// Instructions of one method in single-pass program order, with symbols
    /// resolved to fully-qualified signatures
    fn instructions(&self, method: &MethodRef) -> Result<Vec<Instruction>>;
}

impl<T: MethodBodyAdapter + ?Sized> MethodBodyAdapter for &T {
    fn projects(&self) -> Vec<String> {
        (**self).projects()
    }

    fn methods(&self, project: &str) -> Result<Vec<MethodRef>> {
        (**self).methods(project)
    }

    fn instructions(&self, method: &MethodRef) -> Result<Vec<Instruction>> {
        (**self).instructions(method)
    }
}
