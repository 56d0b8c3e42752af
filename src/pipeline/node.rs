//! Node abstraction for the pipeline.
//!
//! Two-layer design:
//! - **`NodeKind` enum**: the closed set of behaviours (source, transform,
//!   action, filter, pipeline facade). The engine matches on it, so every
//!   pull outcome is handled exhaustively.
//! - **`Lifecycle` trait**: optional user hooks attached to any node, run
//!   once when a pipeline starts and once when it ends (open/close a device,
//!   flush a writer).
//!
//! A `Node` is a value until it is added to a [`Graph`](crate::pipeline::Graph);
//! from then on it is addressed through its `NodeId`.

use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeType;
use crate::pipeline::nodes::{pass_through, Generator, IterGenerator};
use crate::pipeline::value::Value;
use std::time::Duration;

pub type TransformFn = Box<dyn FnMut(&[Value]) -> anyhow::Result<Value> + Send>;
pub type ActionFn = Box<dyn FnMut(&[Value]) -> anyhow::Result<()> + Send>;
pub type PredicateFn = Box<dyn FnMut(&[Value]) -> anyhow::Result<bool> + Send>;

/// Hooks run around a pipeline invocation.
pub trait Lifecycle: Send {
    /// Called once before the first pass of a run.
    fn on_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after the last pass of a run, whatever its outcome.
    fn on_end(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Behaviour of a node.
pub enum NodeKind {
    Transform(TransformFn),
    Source(Box<dyn Generator>),
    Action(ActionFn),
    Filter(PredicateFn),
    /// Facade created by `Pipeline`; forwards its single input.
    Pipeline,
}

/// Result of running a node's own function once.
pub(crate) enum Step {
    Value(Value),
    Filtered,
    Exhausted,
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Transform(_) => NodeType::Transform,
            NodeKind::Source(_) => NodeType::Source,
            NodeKind::Action(_) => NodeType::Action,
            NodeKind::Filter(_) => NodeType::Filter,
            NodeKind::Pipeline => NodeType::Pipeline,
        }
    }

    pub(crate) fn call(&mut self, inputs: Vec<Value>) -> anyhow::Result<Step> {
        match self {
            NodeKind::Transform(f) => f(inputs.as_slice()).map(Step::Value),
            NodeKind::Source(generator) => Ok(match generator.next_item()? {
                Some(item) => Step::Value(item),
                None => Step::Exhausted,
            }),
            NodeKind::Action(f) => {
                f(inputs.as_slice())?;
                Ok(Step::Value(pass_through(inputs)))
            }
            NodeKind::Filter(f) => {
                if f(inputs.as_slice())? {
                    Ok(Step::Value(pass_through(inputs)))
                } else {
                    Ok(Step::Filtered)
                }
            }
            NodeKind::Pipeline => Ok(Step::Value(pass_through(inputs))),
        }
    }

    pub(crate) fn on_start(&mut self) -> anyhow::Result<()> {
        match self {
            NodeKind::Source(generator) => generator.on_start(),
            _ => Ok(()),
        }
    }

    pub(crate) fn on_end(&mut self) -> anyhow::Result<()> {
        match self {
            NodeKind::Source(generator) => generator.on_end(),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeKind::{}", self.node_type().display_name())
    }
}

/// Per-node flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeOptions {
    /// Evaluate by draining the upstream stream instead of a single pass.
    pub aggregate: bool,
    /// Keep each produced value when aggregating.
    pub collect: bool,
    /// Log computed values at debug level instead of trace.
    pub verbose: bool,
    /// Record the duration of every computation.
    pub timeit: bool,
}

/// A processing stage: a wrapped function plus its upstream wiring.
pub struct Node {
    pub(crate) label: Option<String>,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) arity: usize,
    pub(crate) options: NodeOptions,
    pub(crate) hooks: Vec<Box<dyn Lifecycle>>,
    pub(crate) previous: Vec<NodeId>,
    pub(crate) cache: Option<Value>,
    pub(crate) timings: Vec<Duration>,
}

impl Node {
    fn with_kind(kind: NodeKind, arity: usize) -> Self {
        Self {
            label: None,
            name: String::new(),
            kind,
            arity,
            options: NodeOptions::default(),
            hooks: Vec::new(),
            previous: Vec::new(),
            cache: None,
            timings: Vec::new(),
        }
    }

    /// Transform over `arity` upstream values.
    pub fn transform<F>(arity: usize, f: F) -> Self
    where
        F: FnMut(&[Value]) -> anyhow::Result<Value> + Send + 'static,
    {
        Self::with_kind(NodeKind::Transform(Box::new(f)), arity)
    }

    /// Single-input transform.
    pub fn map<F>(mut f: F) -> Self
    where
        F: FnMut(&Value) -> anyhow::Result<Value> + Send + 'static,
    {
        Self::transform(1, move |inputs| f(&inputs[0]))
    }

    /// Source backed by a generator.
    pub fn source<G>(generator: G) -> Self
    where
        G: Generator + 'static,
    {
        Self::with_kind(NodeKind::Source(Box::new(generator)), 0)
    }

    /// Source yielding the items of `items`, in order.
    pub fn source_iter<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        I::IntoIter: Send + 'static,
        V: Into<Value>,
    {
        Self::source(IterGenerator::new(items.into_iter()))
    }

    /// Side-effect action over `arity` upstream values.
    pub fn action<F>(arity: usize, f: F) -> Self
    where
        F: FnMut(&[Value]) -> anyhow::Result<()> + Send + 'static,
    {
        Self::with_kind(NodeKind::Action(Box::new(f)), arity)
    }

    /// Single-input action.
    pub fn inspect<F>(mut f: F) -> Self
    where
        F: FnMut(&Value) + Send + 'static,
    {
        Self::action(1, move |inputs| {
            f(&inputs[0]);
            Ok(())
        })
    }

    /// Filter over `arity` upstream values.
    pub fn filter<F>(arity: usize, f: F) -> Self
    where
        F: FnMut(&[Value]) -> anyhow::Result<bool> + Send + 'static,
    {
        Self::with_kind(NodeKind::Filter(Box::new(f)), arity)
    }

    /// Single-input, infallible filter.
    pub fn predicate<F>(mut f: F) -> Self
    where
        F: FnMut(&Value) -> bool + Send + 'static,
    {
        Self::filter(1, move |inputs| Ok(f(&inputs[0])))
    }

    pub(crate) fn pipeline() -> Self {
        Self::with_kind(NodeKind::Pipeline, 1)
    }

    /// Set the display label. Labels are unique within a graph.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_options(mut self, options: NodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Drain the stream on evaluation, optionally collecting each value.
    pub fn aggregate(mut self, collect: bool) -> Self {
        self.options.aggregate = true;
        self.options.collect = collect;
        self
    }

    pub fn timeit(mut self) -> Self {
        self.options.timeit = true;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.options.verbose = true;
        self
    }

    /// Attach lifecycle hooks, run after the kind's own hooks.
    pub fn with_hook<L>(mut self, hook: L) -> Self
    where
        L: Lifecycle + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Display name; a generated `<kind>#<index>` when no label was given.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Number of upstream nodes this node must be wired to.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn options(&self) -> NodeOptions {
        self.options
    }

    /// Upstream handles, in positional-argument order.
    pub fn previous(&self) -> &[NodeId] {
        &self.previous
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn timings(&self) -> &[Duration] {
        &self.timings
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("arity", &self.arity)
            .field("previous", &self.previous)
            .field("cached", &self.cache.is_some())
            .finish()
    }
}
