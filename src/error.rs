//! Error handling for pullgraph-rs
//!
//! `PipelineError` covers the engine itself; this module wraps it together
//! with the failures of the glue around it: definition files and scripts.

use crate::pipeline::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pullgraph-rs operations
#[derive(Error, Debug)]
pub enum PullGraphError {
    /// Errors raised while building or running a graph
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to Rhai script compilation or execution
    #[error("Script error: {0}")]
    Script(String),

    /// Errors in a pipeline definition file
    #[error("Configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PullGraphError>,
    },
}

impl PullGraphError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PullGraphError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PullGraphError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        PullGraphError::Script(err.to_string())
    }
}

/// Result type alias for pullgraph-rs operations
pub type Result<T> = std::result::Result<T, PullGraphError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PullGraphError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PullGraphError::from(e).with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PullGraphError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PullGraphError::from_rhai_error(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NodeId;

    #[test]
    fn test_error_display() {
        let err = PullGraphError::Script("unexpected end of input".to_string());
        assert_eq!(err.to_string(), "Script error: unexpected end of input");
    }

    #[test]
    fn test_config_error_names_path() {
        let err = PullGraphError::config("defs/run.toml", "unknown node 'nope'");
        let msg = err.to_string();
        assert!(msg.contains("defs/run.toml"));
        assert!(msg.contains("unknown node 'nope'"));
    }

    #[test]
    fn test_pipeline_error_with_context() {
        let result: std::result::Result<(), PipelineError> =
            Err(PipelineError::UnknownNode(NodeId(3)));
        let err = result.context("Failed to wire 'scale'").unwrap_err();
        assert!(err.to_string().starts_with("Failed to wire 'scale'"));
        assert!(matches!(
            err,
            PullGraphError::WithContext { ref source, .. }
                if matches!(**source, PullGraphError::Pipeline(_))
        ));
    }
}
