//! Lazy, cached node-graph pipeline.
//!
//! Nodes wrap user functions and are wired into a DAG. Evaluating a node
//! pulls values from its upstream nodes back to the sources; each node
//! computes at most once per pass and caches the result until the pass ends.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [Transform] ──► [Filter] ──► [Pipeline facade]
//!                   │                              ▲
//!                   └──────► [Action] ─────────────┘ (any DAG shape)
//! ```
//!
//! # Design
//!
//! - **Arena graph**: nodes live in a `Vec<Node>`, addressed by `NodeId`.
//! - **Closed node kinds**: `NodeKind` enum, matched exhaustively by the engine.
//! - **Typed pull outcomes**: `Outcome::{Produced, Filtered, Exhausted}`,
//!   failures as `Err(PipelineError)`.
//! - **Explicit operations**: `connect` wires, `evaluate` pulls.
//! - **Lifecycle**: `Pipeline::run` starts every reachable node once,
//!   upstream first, and always ends what it started.

pub mod builder;
pub mod cancel;
pub mod error;
pub mod executor;
pub mod graph;
pub mod id;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod outcome;
pub mod timing;
pub mod topology;
pub mod value;

pub use builder::PipelineBuilder;
pub use cancel::CancelToken;
pub use error::{NodeFailure, PipelineError, PipelineResult};
pub use executor::{Pipeline, PipelineOptions};
pub use graph::Graph;
pub use id::NodeId;
pub use node::{Lifecycle, Node, NodeKind, NodeOptions};
pub use node_type::NodeType;
pub use nodes::{FnGenerator, Generator, IterGenerator, LineReader};
pub use outcome::{AggregateSummary, Evaluation, Outcome};
pub use timing::TimingSummary;
pub use topology::{NodeSnapshot, Topology, TopologySnapshot};
pub use value::Value;
