//! Typed results of pulling values through the graph.

use crate::pipeline::id::NodeId;
use crate::pipeline::value::Value;
use serde::Serialize;

/// Result of one pull on a node within a pass.
///
/// Failures travel separately as `Err(PipelineError)`, so a caller matching
/// on an `Outcome` only decides between "got a value", "this pass is void"
/// and "the stream is over".
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Produced(Value),
    /// A filter rejected the pass.
    Filtered { node_id: NodeId },
    /// A source ran out of items.
    Exhausted { node_id: NodeId },
}

impl Outcome {
    pub fn is_produced(&self) -> bool {
        matches!(self, Outcome::Produced(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Produced(v) => Some(v),
            _ => None,
        }
    }
}

/// What an aggregate evaluation went through.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSummary {
    /// Produced values, in pass order. Empty when not collecting.
    pub collected: Vec<Value>,
    /// Passes that produced a value.
    pub produced: u64,
    /// Passes voided by a filter.
    pub filtered: u64,
    /// The loop stopped on a cancellation request instead of exhaustion.
    pub cancelled: bool,
}

impl AggregateSummary {
    /// Total passes run, including filtered ones.
    pub fn passes(&self) -> u64 {
        self.produced + self.filtered
    }
}

/// Result of evaluating a node in its configured mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "result", rename_all = "snake_case")]
pub enum Evaluation {
    Single(Value),
    Aggregated(AggregateSummary),
}

impl Evaluation {
    pub fn as_single(&self) -> Option<&Value> {
        match self {
            Evaluation::Single(v) => Some(v),
            Evaluation::Aggregated(_) => None,
        }
    }

    pub fn as_aggregated(&self) -> Option<&AggregateSummary> {
        match self {
            Evaluation::Aggregated(summary) => Some(summary),
            Evaluation::Single(_) => None,
        }
    }

    /// All values this evaluation yielded.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Evaluation::Single(v) => vec![v],
            Evaluation::Aggregated(summary) => summary.collected,
        }
    }
}
