//! Pipeline facade: lifecycle-wrapped evaluation of a terminal node.
//!
//! A `Pipeline` adds one pass-through node downstream of its terminal. The
//! facade carries the run mode, so `run` is a single call:
//!
//! ```text
//! enumerate + validate ─► start (upstream first) ─► evaluate ─► end
//!                                     │                          ▲
//!                                     └──── failure / cancel ────┘
//! ```
//!
//! The facade is an ordinary node, so a pipeline can feed a larger graph.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::Graph;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{Node, NodeOptions};
use crate::pipeline::outcome::Evaluation;
use crate::pipeline::topology::{Topology, TopologySnapshot};
use std::collections::HashSet;

/// Overrides for the run mode a pipeline copies from its terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub aggregate: Option<bool>,
    pub collect: Option<bool>,
}

impl PipelineOptions {
    pub fn single() -> Self {
        Self {
            aggregate: Some(false),
            collect: None,
        }
    }

    pub fn aggregate(collect: bool) -> Self {
        Self {
            aggregate: Some(true),
            collect: Some(collect),
        }
    }
}

/// Handle to a pipeline facade inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    node: NodeId,
    terminal: NodeId,
}

impl Pipeline {
    /// Wrap an already wired terminal node.
    pub fn from_terminal(graph: &mut Graph, terminal: NodeId) -> PipelineResult<Self> {
        Self::from_terminal_with(graph, terminal, PipelineOptions::default())
    }

    pub fn from_terminal_with(
        graph: &mut Graph,
        terminal: NodeId,
        options: PipelineOptions,
    ) -> PipelineResult<Self> {
        let inherited = graph.node(terminal)?.options();
        let facade = Node::pipeline().with_options(NodeOptions {
            aggregate: options.aggregate.unwrap_or(inherited.aggregate),
            collect: options.collect.unwrap_or(inherited.collect),
            ..NodeOptions::default()
        });
        let node = graph.add_connected(facade, &[terminal])?;
        tracing::debug!(
            "Pipeline {} wraps {}",
            graph.name(node)?,
            graph.name(terminal)?
        );
        Ok(Self { node, terminal })
    }

    /// Wire `chain` left to right and wrap its last node.
    ///
    /// Every node of the chain must still be unwired, and every node after
    /// the first must take exactly one input. Nothing is wired unless the
    /// whole chain is acceptable.
    pub fn from_chain(graph: &mut Graph, chain: &[NodeId]) -> PipelineResult<Self> {
        Self::from_chain_with(graph, chain, PipelineOptions::default())
    }

    pub fn from_chain_with(
        graph: &mut Graph,
        chain: &[NodeId],
        options: PipelineOptions,
    ) -> PipelineResult<Self> {
        let Some(&last) = chain.last() else {
            return Err(PipelineError::EmptyChain);
        };

        let mut seen = HashSet::with_capacity(chain.len());
        for (i, &id) in chain.iter().enumerate() {
            let node = graph.node(id)?;
            if !seen.insert(id) {
                return Err(PipelineError::CycleDetected {
                    from: chain[i - 1],
                    to: id,
                });
            }
            if !node.previous().is_empty() {
                return Err(PipelineError::ChainAlreadyWired {
                    node_id: id,
                    label: node.name().to_string(),
                });
            }
            if i > 0 && node.arity() != 1 {
                return Err(PipelineError::ArityMismatch {
                    node_id: id,
                    label: node.name().to_string(),
                    expected: node.arity(),
                    actual: 1,
                });
            }
        }

        for pair in chain.windows(2) {
            graph.connect(pair[1], &[pair[0]])?;
        }
        Self::from_terminal_with(graph, last, options)
    }

    /// The facade node, for wiring this pipeline into a larger graph.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn terminal(&self) -> NodeId {
        self.terminal
    }

    pub fn topology(&self, graph: &Graph) -> PipelineResult<Topology> {
        Topology::enumerate(graph, self.node)
    }

    pub fn snapshot(&self, graph: &Graph) -> PipelineResult<TopologySnapshot> {
        self.topology(graph)?.snapshot(graph)
    }

    /// Start every reachable node, evaluate the facade, end every node.
    ///
    /// End hooks run whenever start succeeded, whatever the evaluation did.
    /// An evaluation error takes precedence over an end hook error. A
    /// cancellation request made by an end hook is dropped with the run.
    pub fn run(&self, graph: &mut Graph) -> PipelineResult<Evaluation> {
        let topology = self.topology(graph)?;
        topology.validate(graph)?;

        graph.start_all(topology.order())?;
        tracing::debug!(
            "Running {} over {} node(s)",
            graph.name(self.node)?,
            topology.len()
        );
        let evaluation = graph.evaluate(self.node);
        let ended = graph.end_all(topology.order());
        graph.cancel_token().reset();

        let evaluation = evaluation?;
        ended?;
        if let Some(summary) = evaluation.as_aggregated() {
            tracing::info!(
                "{}: {} pass(es), {} produced, {} filtered{}",
                graph.name(self.terminal)?,
                summary.passes(),
                summary.produced,
                summary.filtered,
                if summary.cancelled { ", cancelled" } else { "" }
            );
        }
        Ok(evaluation)
    }
}
