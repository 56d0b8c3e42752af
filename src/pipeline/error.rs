//! Pipeline-specific error types.

use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeType;
use thiserror::Error;

/// Boxed error raised by a user-supplied node function or hook.
pub type NodeFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {node_id:?} ({label}) expects {expected} upstream node(s), wiring would give it {actual}")]
    ArityMismatch {
        node_id: NodeId,
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} node {label} must take at least one upstream node")]
    NoInputs { label: String, kind: NodeType },

    #[error("Node {node_id:?} ({label}) was connected to an empty upstream list")]
    EmptyWiring { node_id: NodeId, label: String },

    #[error("Node {node_id:?} ({label}) is wired to {actual} of {expected} upstream node(s)")]
    Unwired {
        node_id: NodeId,
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("Connecting {from:?} into {to:?} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },

    #[error("Cannot build a chain: node {node_id:?} ({label}) already has upstream wiring")]
    ChainAlreadyWired { node_id: NodeId, label: String },

    #[error("Cannot build a pipeline from an empty chain")]
    EmptyChain,

    #[error("Duplicate node label: {0}")]
    DuplicateLabel(String),

    #[error("Invalid node label {0:?}: labels must be non-empty and may not contain '#'")]
    InvalidLabel(String),

    #[error("Pass filtered out by node {node_id:?} ({label})")]
    Filtered { node_id: NodeId, label: String },

    #[error("Source {node_id:?} ({label}) is exhausted")]
    Exhausted { node_id: NodeId, label: String },

    #[error("Node {node_id:?} ({label}) failed: {source}")]
    Transform {
        node_id: NodeId,
        label: String,
        #[source]
        source: NodeFailure,
    },

    #[error("Lifecycle hook '{hook}' of node {node_id:?} ({label}) failed: {source}")]
    Lifecycle {
        node_id: NodeId,
        label: String,
        hook: &'static str,
        #[source]
        source: NodeFailure,
    },
}

impl PipelineError {
    /// True for build-time wiring errors, which are never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownNode(_)
                | PipelineError::ArityMismatch { .. }
                | PipelineError::NoInputs { .. }
                | PipelineError::EmptyWiring { .. }
                | PipelineError::Unwired { .. }
                | PipelineError::CycleDetected { .. }
                | PipelineError::ChainAlreadyWired { .. }
                | PipelineError::EmptyChain
                | PipelineError::DuplicateLabel(_)
                | PipelineError::InvalidLabel(_)
        )
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
