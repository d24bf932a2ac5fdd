//! Instructions as delivered by a method body adapter.
//!
//! Symbols are already resolved to fully-qualified signatures by the time an
//! [`Instruction`] reaches the graph builder. Constructors use the JVM naming
//! convention `pkg.Class.<init>(...)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::config::LibraryConfig;

/// Name every constructor signature carries after its owning class.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Kind of a low-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    /// Allocation combined with its constructor call
    New,
    /// Method invocation
    Invoke,
    /// Field read
    FieldRead,
    /// Field write
    FieldWrite,
    /// Local copy or arithmetic producing a value
    Assign,
    /// Conditional jump; falls through to the next instruction
    Branch,
    /// Unconditional jump
    Goto,
    /// Leaves the method
    Return,
}

impl InstructionKind {
    /// Short lowercase name used in labels and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Invoke => "invoke",
            Self::FieldRead => "field_read",
            Self::FieldWrite => "field_write",
            Self::Assign => "assign",
            Self::Branch => "branch",
            Self::Goto => "goto",
            Self::Return => "return",
        }
    }

    /// Whether execution may continue with the next instruction in program order
    pub fn falls_through(&self) -> bool {
        !matches!(self, Self::Goto | Self::Return)
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value consumed by an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Local variable or stack slot
    Local(String),
    /// Literal value; never has a data-flow origin
    Constant(String),
}

impl Operand {
    /// Create a local variable operand
    pub fn local(name: impl Into<String>) -> Self {
        Self::Local(name.into())
    }

    /// Create a constant operand
    pub fn constant(value: impl Into<String>) -> Self {
        Self::Constant(value.into())
    }

    /// Variable name, if this operand refers to one
    pub fn as_local(&self) -> Option<&str> {
        match self {
            Self::Local(name) => Some(name),
            Self::Constant(_) => None,
        }
    }
}

/// One low-level operation of a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// Operation kind
    pub kind: InstructionKind,

    /// Fully-qualified method, constructor or field signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// Consumed values, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<Operand>,

    /// Variable receiving the produced value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Jump targets (instruction indices) for `Branch` and `Goto`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<usize>,
}

impl Instruction {
    /// Create an instruction of the given kind with no symbol or operands
    pub fn new(kind: InstructionKind) -> Self {
        Self {
            kind,
            symbol: None,
            operands: Vec::new(),
            result: None,
            targets: Vec::new(),
        }
    }

    /// Allocation of a new object through the given constructor
    pub fn construct(constructor: impl Into<String>) -> Self {
        Self::new(InstructionKind::New).with_symbol(constructor)
    }

    /// Invocation of the given method
    pub fn invoke(method: impl Into<String>) -> Self {
        Self::new(InstructionKind::Invoke).with_symbol(method)
    }

    /// Conditional jump to `target`
    pub fn branch(target: usize) -> Self {
        Self::new(InstructionKind::Branch).with_targets([target])
    }

    /// Unconditional jump to `target`
    pub fn goto(target: usize) -> Self {
        Self::new(InstructionKind::Goto).with_targets([target])
    }

    /// Set the target symbol
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Append a local variable operand
    pub fn with_local(mut self, name: impl Into<String>) -> Self {
        self.operands.push(Operand::local(name));
        self
    }

    /// Append a constant operand
    pub fn with_constant(mut self, value: impl Into<String>) -> Self {
        self.operands.push(Operand::constant(value));
        self
    }

    /// Set the variable receiving the produced value
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    /// Replace the jump targets
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = usize>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    /// Symbol or the empty string
    pub fn symbol_or_empty(&self) -> &str {
        self.symbol.as_deref().unwrap_or("")
    }

    /// Local variables read by this instruction
    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.operands.iter().filter_map(Operand::as_local)
    }

    /// Whether this is an explicit constructor invocation (not an allocation)
    pub fn is_constructor_call(&self) -> bool {
        self.kind == InstructionKind::Invoke && self.constructed_class().is_some()
    }

    /// Owning class of a constructor symbol, e.g. `java.util.ArrayList` for
    /// `java.util.ArrayList.<init>()`
    pub fn constructed_class(&self) -> Option<&str> {
        let symbol = self.symbol.as_deref()?;
        let at = symbol.find(CONSTRUCTOR_NAME)?;
        symbol[..at].strip_suffix('.')
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "{result} = ")?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(symbol) = &self.symbol {
            write!(f, " {symbol}")?;
        }
        if !self.operands.is_empty() {
            let operands: Vec<String> = self
                .operands
                .iter()
                .map(|operand| match operand {
                    Operand::Local(name) => name.clone(),
                    Operand::Constant(value) => format!("#{value}"),
                })
                .collect();
            write!(f, "({})", operands.join(", "))?;
        }
        if !self.targets.is_empty() {
            let targets: Vec<String> = self.targets.iter().map(ToString::to_string).collect();
            write!(f, " -> {}", targets.join(", "))?;
        }
        Ok(())
    }
}

/// Public surface of the target library, described by package prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySurface {
    packages: Vec<String>,
}

impl LibrarySurface {
    /// Create a surface from package prefixes such as `java.util`
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut packages: Vec<String> = packages
            .into_iter()
            .map(|p| p.into().trim().trim_end_matches('.').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        packages.sort();
        packages.dedup();
        Self { packages }
    }

    /// Build the surface described by the library configuration section
    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(config.packages.iter().cloned())
    }

    /// Configured package prefixes
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// True when no package is configured
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Whether `symbol` lies inside one of the library packages
    pub fn contains(&self, symbol: &str) -> bool {
        self.packages.iter().any(|package| {
            symbol
                .strip_prefix(package.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Whether the instruction targets a library symbol
    pub fn involves(&self, instruction: &Instruction) -> bool {
        instruction
            .symbol
            .as_deref()
            .is_some_and(|symbol| self.contains(symbol))
    }
}
