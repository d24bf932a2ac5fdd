//! Error types for the schaapi-rs library.
//!
//! Every fallible operation in the crate returns [`Result`]. Variants carry
//! enough context (field names, method signatures, pipeline stage) for the
//! caller to report a failure without re-running the stage.

use std::io;
use std::num::ParseIntError;

use thiserror::Error;

/// Main result type for schaapi operations.
pub type Result<T> = std::result::Result<T, SchaapiError>;

/// Error type for all schaapi operations.
#[derive(Error, Debug)]
pub enum SchaapiError {
    /// I/O related errors (corpus files, reports, config files)
    #[error("I/O error: {message}")]
    Io {
        /// Which file or stream failed
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors, raised before any mining starts
    #[error("Configuration error: {message}")]
    Config {
        /// Why the configuration cannot be used
        message: String,
        /// Dotted path of the offending setting, e.g. `mining.min_support`
        field: Option<String>,
    },

    /// Method body adapter failures (missing method, unreadable body)
    #[error("Adapter error for {method}: {message}")]
    Adapter {
        /// Why the body could not be produced
        message: String,
        /// Method signature the adapter was asked for
        method: String,
    },

    /// Usage graph construction or invariant violations
    #[error("Graph error: {message}")]
    Graph {
        /// Violated graph invariant
        message: String,
        /// Offending node or edge, or the method the graph came from
        element: Option<String>,
    },

    /// Canonical labeling failures
    #[error("Normalization error: {message}")]
    Normalization {
        /// Why no canonical label was produced
        message: String,
        /// Identifier of the graph being normalized
        graph: Option<String>,
    },

    /// Mining pipeline errors
    #[error("Pipeline error at stage '{stage}': {message}")]
    Pipeline {
        /// Stage name as reported to progress callbacks
        stage: String,
        /// What stopped the stage
        message: String,
        /// Methods handled before the failure, when known
        processed_count: Option<usize>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// What was being read or written
        message: String,
        /// Encoding involved (`JSON`, `YAML`)
        data_type: Option<String>,
        /// Parser or writer error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Rejected value and the accepted range
        message: String,
        /// Argument or record field that was rejected
        field: Option<String>,
    },

    /// Broken internal invariant; always a bug in this crate
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong
        message: String,
    },
}

impl SchaapiError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new adapter error for a method
    pub fn adapter(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            message: message.into(),
            method: method.into(),
        }
    }

    /// Create a new graph error
    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph {
            message: message.into(),
            element: None,
        }
    }

    /// Create a new graph error pointing at an element
    pub fn graph_element(message: impl Into<String>, element: impl Into<String>) -> Self {
        Self::Graph {
            message: message.into(),
            element: Some(element.into()),
        }
    }

    /// Create a new normalization error
    pub fn normalization(message: impl Into<String>) -> Self {
        Self::Normalization {
            message: message.into(),
            graph: None,
        }
    }

    /// Create a new pipeline error
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
            processed_count: None,
        }
    }

    /// Create a pipeline error recording how many methods were handled first
    pub fn pipeline_after(
        stage: impl Into<String>,
        message: impl Into<String>,
        processed: usize,
    ) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
            processed_count: Some(processed),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new validation error with field context
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach the identifier of the graph being processed
    pub fn for_graph(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Self::Normalization { graph, .. } => *graph = Some(id.into()),
            Self::Graph { element, .. } if element.is_none() => *element = Some(id.into()),
            _ => {}
        }
        self
    }

    /// Prefix the message with what the caller was doing
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            Self::Io { message, .. }
            | Self::Config { message, .. }
            | Self::Adapter { message, .. }
            | Self::Graph { message, .. }
            | Self::Normalization { message, .. }
            | Self::Pipeline { message, .. }
            | Self::Serialization { message, .. }
            | Self::Validation { message, .. }
            | Self::Internal { message } => *message = format!("{context}: {message}"),
        }
        self
    }

    /// True for errors that only affect one method or graph.
    ///
    /// The pipeline skips such inputs instead of aborting the run.
    pub fn is_isolatable(&self) -> bool {
        matches!(
            self,
            Self::Adapter { .. } | Self::Graph { .. } | Self::Normalization { .. }
        )
    }
}

impl From<io::Error> for SchaapiError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for SchaapiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for SchaapiError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<ParseIntError> for SchaapiError {
    fn from(err: ParseIntError) -> Self {
        Self::validation(format!("Invalid integer: {err}"))
    }
}

/// Converts foreign errors into [`SchaapiError`] while naming the operation
pub trait ResultExt<T> {
    /// Prefix a lazily built description
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Prefix a fixed description
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SchaapiError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SchaapiError::config("Invalid configuration");
        assert!(matches!(err, SchaapiError::Config { .. }));

        let err = SchaapiError::adapter("com.example.App.main()", "body unavailable");
        assert!(matches!(err, SchaapiError::Adapter { .. }));
    }

    #[test]
    fn test_config_field_error() {
        let err = SchaapiError::config_field("must be at least 2", "mining.min_support");

        if let SchaapiError::Config { message, field } = err {
            assert_eq!(message, "must be at least 2");
            assert_eq!(field, Some("mining.min_support".to_string()));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_error_with_context() {
        let err = SchaapiError::config_field("must be at least 2", "mining.min_support")
            .with_context("Loading schaapi.yml");

        if let SchaapiError::Config { message, field } = err {
            assert_eq!(message, "Loading schaapi.yml: must be at least 2");
            assert_eq!(field.as_deref(), Some("mining.min_support"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_for_graph_attaches_identifier() {
        let err = SchaapiError::normalization("labels did not stabilize").for_graph("p1::m()");

        if let SchaapiError::Normalization { graph, .. } = err {
            assert_eq!(graph.as_deref(), Some("p1::m()"));
        } else {
            panic!("Expected Normalization error");
        }
    }

    #[test]
    fn test_isolatable_errors() {
        assert!(SchaapiError::normalization("x").is_isolatable());
        assert!(SchaapiError::graph("x").is_isolatable());
        assert!(SchaapiError::adapter("m", "x").is_isolatable());
        assert!(!SchaapiError::config("x").is_isolatable());
        assert!(!SchaapiError::pipeline("mine", "x").is_isolatable());
    }

    #[test]
    fn test_result_ext_with_context() {
        let result: std::result::Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Bad input",
        ));

        let err = result
            .with_context(|| "Reading corpus".to_string())
            .unwrap_err();
        assert!(matches!(err, SchaapiError::Io { .. }));
        assert!(err.to_string().contains("Reading corpus: I/O operation failed"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: SchaapiError = json_err.into();

        if let SchaapiError::Serialization { data_type, .. } = err {
            assert_eq!(data_type, Some("JSON".to_string()));
        } else {
            panic!("Expected Serialization error");
        }
    }

    #[test]
    fn test_from_parse_int_error() {
        let parse_err = "two".parse::<usize>().unwrap_err();
        let err: SchaapiError = parse_err.into();
        assert!(matches!(err, SchaapiError::Validation { .. }));
    }

    #[test]
    fn test_pipeline_error_keeps_processed_count() {
        let err = SchaapiError::pipeline_after("build", "disk gone", 7);
        if let SchaapiError::Pipeline { stage, processed_count, .. } = err {
            assert_eq!(stage, "build");
            assert_eq!(processed_count, Some(7));
        } else {
            panic!("Expected Pipeline error");
        }
        assert!(!SchaapiError::internal("x").is_isolatable());
    }

    #[test]
    fn test_error_display_formatting() {
        let err = SchaapiError::pipeline("mine", "corpus is empty");
        let display = format!("{}", err);
        assert!(display.contains("Pipeline error at stage 'mine'"));
        assert!(display.contains("corpus is empty"));
    }
}
