//! # pullgraph-rs: lazy, cached node-graph pipelines
//!
//! Compose processing stages into a DAG and pull values through it. Each
//! node computes at most once per pass; a pass either produces a value, is
//! voided by a filter, or finds a source exhausted. A terminal evaluates
//! single-shot (one pass) or aggregated (passes until the sources drain).
//!
//! ## Architecture
//!
//! - **Pipeline**: node arena, pull engine, lifecycle-wrapped `Pipeline` facade
//! - **Scripting**: Rhai-based node bodies for definition files
//! - **Config**: TOML/JSON pipeline definitions
//!
//! ## Example
//!
//! ```
//! use pullgraph_rs::pipeline::{Graph, Node, Pipeline, Value};
//!
//! # fn main() -> pullgraph_rs::Result<()> {
//! let mut graph = Graph::new();
//! let numbers = graph.add(Node::source_iter([-1, 2, -3, 4]).with_label("numbers"))?;
//! let positive = graph.add(
//!     Node::predicate(|v| v.as_int() > Some(0))
//!         .with_label("positive")
//!         .aggregate(true),
//! )?;
//! let pipeline = Pipeline::from_chain(&mut graph, &[numbers, positive])?;
//!
//! let values = pipeline.run(&mut graph)?.into_values();
//! assert_eq!(values, vec![Value::Int(2), Value::Int(4)]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod scripting;

// Re-export commonly used types
pub use config::{NodeDefinition, PipelineFile, RunSettings};
pub use error::{PullGraphError, Result, ResultExt};
pub use pipeline::{
    CancelToken, Evaluation, Graph, Node, NodeId, Pipeline, PipelineBuilder, PipelineError,
    Value,
};
pub use scripting::ScriptEngine;
