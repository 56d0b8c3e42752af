//! Node arena and pull-based execution engine.
//!
//! Values are pulled, not pushed: asking for a node's value walks its
//! upstream wiring back to the sources. Within one pass every node computes
//! at most once; its result sits in a one-slot cache that every later
//! request in the same pass reads. A pass ends with `clear_cache`, which
//! empties the slot on the node and on everything upstream of it.
//!
//! ```text
//! evaluate(terminal)
//!   ├─ single-shot:  infer → clear_cache → value | Filtered/Exhausted error
//!   └─ aggregate:    loop { infer → clear_cache } until Exhausted
//!                    (Filtered passes are skipped, values optionally kept)
//! ```

use crate::pipeline::cancel::CancelToken;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{Node, Step};
use crate::pipeline::node_type::NodeType;
use crate::pipeline::outcome::{AggregateSummary, Evaluation, Outcome};
use crate::pipeline::timing::TimingSummary;
use crate::pipeline::topology::Topology;
use crate::pipeline::value::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Arena of nodes plus the wiring between them.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
    cancel: CancelToken,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Graph building ──

    /// Add a node to the graph. Returns its NodeId.
    ///
    /// Only sources may take no upstream nodes.
    pub fn add(&mut self, mut node: Node) -> PipelineResult<NodeId> {
        let id = NodeId(self.nodes.len() as u32);
        let name = match node.label.as_deref() {
            Some(label) => {
                if label.is_empty() || label.contains('#') {
                    return Err(PipelineError::InvalidLabel(label.to_string()));
                }
                if self.names.contains_key(label) {
                    return Err(PipelineError::DuplicateLabel(label.to_string()));
                }
                label.to_string()
            }
            None => format!("{}#{}", node.node_type().slug(), id.0),
        };
        if node.arity == 0 && node.node_type() != NodeType::Source {
            return Err(PipelineError::NoInputs {
                label: name,
                kind: node.node_type(),
            });
        }
        node.name = name.clone();
        node.previous.clear();
        node.cache = None;
        self.names.insert(name, id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Add a node and wire it to `upstream` in one step.
    ///
    /// Nothing is kept when the wiring is rejected.
    pub fn add_connected(&mut self, node: Node, upstream: &[NodeId]) -> PipelineResult<NodeId> {
        for &up in upstream {
            self.node(up)?;
        }
        let id = self.add(node)?;
        let wired = match upstream {
            [] if self.nodes[id.index()].arity == 0 => Ok(id),
            _ => self.connect(id, upstream),
        };
        if wired.is_err() {
            if let Some(node) = self.nodes.pop() {
                self.names.remove(&node.name);
            }
        }
        wired
    }

    /// Wire `upstream` into `node`, after any existing wiring.
    ///
    /// The total upstream count must equal the node's arity, so a node is
    /// wired in one call. Returns `node` so wiring can be chained.
    pub fn connect(&mut self, node: NodeId, upstream: &[NodeId]) -> PipelineResult<NodeId> {
        let target = self.node(node)?;
        if upstream.is_empty() {
            return Err(PipelineError::EmptyWiring {
                node_id: node,
                label: target.name.clone(),
            });
        }
        let actual = target.previous.len() + upstream.len();
        if actual != target.arity {
            return Err(PipelineError::ArityMismatch {
                node_id: node,
                label: target.name.clone(),
                expected: target.arity,
                actual,
            });
        }
        for &up in upstream {
            self.node(up)?;
            if up == node || self.would_create_cycle(up, node) {
                return Err(PipelineError::CycleDetected { from: up, to: node });
            }
        }

        self.nodes[node.index()].previous.extend_from_slice(upstream);
        tracing::trace!(
            "Connected {:?} into {}",
            upstream,
            self.nodes[node.index()].name
        );
        Ok(node)
    }

    /// True if `to` already feeds `from`, directly or transitively.
    fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let idx = current.index();
            if idx >= self.nodes.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.extend_from_slice(&self.nodes[idx].previous);
        }
        false
    }

    // ── Lookup ──

    pub fn node(&self, id: NodeId) -> PipelineResult<&Node> {
        self.nodes
            .get(id.index())
            .ok_or(PipelineError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> PipelineResult<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or(PipelineError::UnknownNode(id))
    }

    /// Look a node up by display name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> PipelineResult<&str> {
        self.node(id).map(Node::name)
    }

    pub fn predecessors(&self, id: NodeId) -> PipelineResult<&[NodeId]> {
        self.node(id).map(Node::previous)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn is_cached(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(Node::is_cached)
    }

    /// Token that stops aggregate loops on this graph between passes.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Duration samples recorded by a `timeit` node.
    ///
    /// One sample per computation of the node's own function. Cache hits,
    /// upstream pulls and failed calls are not timed, so a node shared by
    /// several consumers still records one sample per pass.
    pub fn timings(&self, id: NodeId) -> PipelineResult<&[Duration]> {
        self.node(id).map(Node::timings)
    }

    pub fn timing_summary(&self, id: NodeId) -> PipelineResult<Option<TimingSummary>> {
        self.timings(id).map(TimingSummary::from_samples)
    }

    // ── Pulling values ──

    /// Value of `id` for the current pass.
    ///
    /// Returns the cached value when there is one. Otherwise pulls every
    /// upstream node in wiring order, calls the node's function with their
    /// values and caches what it produces. A filtered or exhausted upstream
    /// stops the pull and is returned as-is; nothing is cached for it, and
    /// neither is anything for a failing function.
    pub fn infer(&mut self, id: NodeId) -> PipelineResult<Outcome> {
        let node = self.node(id)?;
        if let Some(value) = &node.cache {
            return Ok(Outcome::Produced(value.clone()));
        }
        if node.previous.len() != node.arity
            || (node.previous.is_empty() && node.node_type() != NodeType::Source)
        {
            return Err(PipelineError::Unwired {
                node_id: id,
                label: node.name.clone(),
                expected: node.arity.max(1),
                actual: node.previous.len(),
            });
        }

        let previous = node.previous.clone();
        let mut inputs = Vec::with_capacity(previous.len());
        for up in previous {
            match self.infer(up)? {
                Outcome::Produced(value) => inputs.push(value),
                other => return Ok(other),
            }
        }

        let node = &mut self.nodes[id.index()];
        let started = node.options.timeit.then(Instant::now);
        let step = node
            .kind
            .call(inputs)
            .map_err(|source| PipelineError::Transform {
                node_id: id,
                label: node.name.clone(),
                source: source.into(),
            })?;

        match step {
            Step::Value(value) => {
                if let Some(started) = started {
                    node.timings.push(started.elapsed());
                }
                if node.options.verbose {
                    tracing::debug!("{} produced {}", node.name, value);
                } else {
                    tracing::trace!("{} produced {}", node.name, value);
                }
                node.cache = Some(value.clone());
                Ok(Outcome::Produced(value))
            }
            Step::Filtered => {
                tracing::trace!("{} filtered the pass", node.name);
                Ok(Outcome::Filtered { node_id: id })
            }
            Step::Exhausted => {
                tracing::trace!("{} is exhausted", node.name);
                Ok(Outcome::Exhausted { node_id: id })
            }
        }
    }

    /// Empty the cache of `id` and of every node upstream of it.
    pub fn clear_cache(&mut self, id: NodeId) {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let idx = current.index();
            if idx >= self.nodes.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            let node = &mut self.nodes[idx];
            node.cache = None;
            stack.extend_from_slice(&node.previous);
        }
    }

    /// Evaluate `id` in the mode its options select.
    pub fn evaluate(&mut self, id: NodeId) -> PipelineResult<Evaluation> {
        let options = self.node(id)?.options;
        if options.aggregate {
            self.aggregate(id, options.collect).map(Evaluation::Aggregated)
        } else {
            self.evaluate_once(id).map(Evaluation::Single)
        }
    }

    /// Run one pass and return its value.
    ///
    /// A filtered or exhausted pass is an error here; callers that expect
    /// either should use `aggregate` or `infer`. A cancellation request
    /// made meanwhile is dropped, as there is no later pass to stop.
    pub fn evaluate_once(&mut self, id: NodeId) -> PipelineResult<Value> {
        let outcome = self.infer(id);
        self.clear_cache(id);
        self.cancel.reset();
        match outcome? {
            Outcome::Produced(value) => Ok(value),
            Outcome::Filtered { node_id } => Err(PipelineError::Filtered {
                node_id,
                label: self.name(node_id)?.to_string(),
            }),
            Outcome::Exhausted { node_id } => Err(PipelineError::Exhausted {
                node_id,
                label: self.name(node_id)?.to_string(),
            }),
        }
    }

    /// Run passes until a source is exhausted.
    ///
    /// Filtered passes are counted and skipped. A cancellation request is
    /// honoured between passes and returns what was gathered so far. A
    /// failing pass clears the caches and propagates its error. The request
    /// is consumed on every exit, so it never reaches a later evaluation.
    pub fn aggregate(&mut self, id: NodeId, collect: bool) -> PipelineResult<AggregateSummary> {
        self.node(id)?;
        let result = self.drain(id, collect);
        self.cancel.reset();
        result
    }

    fn drain(&mut self, id: NodeId, collect: bool) -> PipelineResult<AggregateSummary> {
        let mut summary = AggregateSummary::default();

        loop {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                tracing::warn!(
                    "Aggregation of {} cancelled after {} pass(es)",
                    self.nodes[id.index()].name,
                    summary.passes()
                );
                break;
            }

            let outcome = self.infer(id);
            self.clear_cache(id);
            match outcome? {
                Outcome::Produced(value) => {
                    summary.produced += 1;
                    if collect {
                        summary.collected.push(value);
                    }
                }
                Outcome::Filtered { .. } => summary.filtered += 1,
                Outcome::Exhausted { node_id } => {
                    tracing::debug!(
                        "Aggregation of {} drained by {}: {} produced, {} filtered",
                        self.nodes[id.index()].name,
                        self.nodes[node_id.index()].name,
                        summary.produced,
                        summary.filtered
                    );
                    break;
                }
            }
        }

        Ok(summary)
    }

    // ── Lifecycle ──

    /// Run the start hooks of `id` and everything upstream, upstream first,
    /// each node once.
    pub fn start(&mut self, id: NodeId) -> PipelineResult<()> {
        let topology = Topology::enumerate(self, id)?;
        self.start_all(topology.order())
    }

    /// Run the end hooks of `id` and everything upstream, in the same order
    /// as `start`.
    pub fn end(&mut self, id: NodeId) -> PipelineResult<()> {
        let topology = Topology::enumerate(self, id)?;
        self.end_all(topology.order())
    }

    /// Start `order` front to back. If a node fails to start, the nodes
    /// before it are ended again before the error is returned.
    pub(crate) fn start_all(&mut self, order: &[NodeId]) -> PipelineResult<()> {
        for (i, &id) in order.iter().enumerate() {
            if let Err(e) = self.start_node(id) {
                if let Err(end_err) = self.end_all(&order[..i]) {
                    tracing::warn!("Cleanup after failed start also failed: {}", end_err);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// End every node in `order`, even after a failure. Returns the first
    /// error.
    pub(crate) fn end_all(&mut self, order: &[NodeId]) -> PipelineResult<()> {
        let mut first_error = None;
        for &id in order {
            if let Err(e) = self.end_node(id) {
                tracing::warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn start_node(&mut self, id: NodeId) -> PipelineResult<()> {
        let node = self.node_mut(id)?;
        let fail = |node: &Node, source: anyhow::Error| PipelineError::Lifecycle {
            node_id: id,
            label: node.name.clone(),
            hook: "start",
            source: source.into(),
        };
        if let Err(e) = node.kind.on_start() {
            return Err(fail(node, e));
        }
        for i in 0..node.hooks.len() {
            if let Err(e) = node.hooks[i].on_start() {
                return Err(fail(node, e));
            }
        }
        tracing::trace!("Started {}", node.name);
        Ok(())
    }

    fn end_node(&mut self, id: NodeId) -> PipelineResult<()> {
        let node = self.node_mut(id)?;
        let mut first_error = node.kind.on_end().err();
        for hook in node.hooks.iter_mut() {
            if let Err(e) = hook.on_end() {
                first_error.get_or_insert(e);
            }
        }
        tracing::trace!("Ended {}", node.name);
        match first_error {
            Some(source) => Err(PipelineError::Lifecycle {
                node_id: id,
                label: node.name.clone(),
                hook: "end",
                source: source.into(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    fn double() -> Node {
        Node::map(|v| Ok(Value::Int(v.as_int().unwrap_or_default() * 2)))
    }

    #[test]
    fn test_generated_and_explicit_names() {
        let mut graph = Graph::new();
        let a = graph.add(Node::source_iter([1])).unwrap();
        let b = graph.add(double().with_label("double")).unwrap();
        assert_eq!(graph.name(a).unwrap(), "source#0");
        assert_eq!(graph.name(b).unwrap(), "double");
        assert_eq!(graph.find("double"), Some(b));
    }

    #[test]
    fn test_label_rules() {
        let mut graph = Graph::new();
        graph.add(double().with_label("x")).unwrap();
        assert!(matches!(
            graph.add(double().with_label("x")),
            Err(PipelineError::DuplicateLabel(_))
        ));
        assert!(matches!(
            graph.add(double().with_label("x#1")),
            Err(PipelineError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_connect_rejects_empty_and_unknown() {
        let mut graph = Graph::new();
        let b = graph.add(double()).unwrap();
        assert!(matches!(
            graph.connect(b, &[]),
            Err(PipelineError::EmptyWiring { .. })
        ));
        assert!(matches!(
            graph.connect(b, &[NodeId(9)]),
            Err(PipelineError::UnknownNode(NodeId(9)))
        ));
    }

    #[test]
    fn test_connect_rejects_source_wiring() {
        let mut graph = Graph::new();
        let a = graph.add(Node::source_iter([1])).unwrap();
        let b = graph.add(Node::source_iter([2])).unwrap();
        let err = graph.connect(b, &[a]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ArityMismatch { expected: 0, actual: 1, .. }
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_connect_rejects_cycles() {
        let mut graph = Graph::new();
        let a = graph.add(Node::transform(2, |_| Ok(Value::Unit))).unwrap();
        let b = graph.add(double()).unwrap();
        let src = graph.add(Node::source_iter([1])).unwrap();
        graph.connect(b, &[a]).unwrap();
        assert!(matches!(
            graph.connect(a, &[src, b]),
            Err(PipelineError::CycleDetected { .. })
        ));
        assert!(graph.predecessors(a).unwrap().is_empty());
    }

    #[test]
    fn test_unwired_node_fails_before_running() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut graph = Graph::new();
        let t = graph
            .add(Node::map(move |v| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(v.clone())
            }))
            .unwrap();
        assert!(matches!(
            graph.infer(t),
            Err(PipelineError::Unwired { expected: 1, actual: 0, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cache_within_a_pass() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2])).unwrap();
        let t = graph.add_connected(double(), &[src]).unwrap();

        assert_eq!(graph.infer(t).unwrap(), Outcome::Produced(Value::Int(2)));
        assert!(graph.is_cached(src) && graph.is_cached(t));
        // Cached: the source is not pulled again.
        assert_eq!(graph.infer(t).unwrap(), Outcome::Produced(Value::Int(2)));

        graph.clear_cache(t);
        assert!(!graph.is_cached(src) && !graph.is_cached(t));
        assert_eq!(graph.infer(t).unwrap(), Outcome::Produced(Value::Int(4)));
    }

    #[test]
    fn test_filtered_pass_leaves_no_cache_downstream() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([-1])).unwrap();
        let f = graph
            .add_connected(Node::predicate(|v| v.as_int() > Some(0)), &[src])
            .unwrap();
        let t = graph.add_connected(double(), &[f]).unwrap();

        assert_eq!(graph.infer(t).unwrap(), Outcome::Filtered { node_id: f });
        assert!(!graph.is_cached(f));
        assert!(!graph.is_cached(t));
    }

    #[test]
    fn test_failed_transform_is_not_cached() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2])).unwrap();
        let t = graph
            .add_connected(
                Node::map(|_| Err(anyhow::anyhow!("decode failed"))).with_label("decode"),
                &[src],
            )
            .unwrap();
        let err = graph.evaluate_once(t).unwrap_err();
        assert!(matches!(err, PipelineError::Transform { ref label, .. } if label == "decode"));
        assert!(!graph.is_cached(t));
        assert!(!graph.is_cached(src));
    }

    #[test]
    fn test_single_shot_sequence_then_exhaustion() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2, 3])).unwrap();
        let t = graph.add_connected(double(), &[src]).unwrap();

        assert_eq!(graph.evaluate_once(t).unwrap(), Value::Int(2));
        assert_eq!(graph.evaluate_once(t).unwrap(), Value::Int(4));
        assert_eq!(graph.evaluate_once(t).unwrap(), Value::Int(6));
        assert!(matches!(
            graph.evaluate_once(t),
            Err(PipelineError::Exhausted { node_id, .. }) if node_id == src
        ));
    }

    #[test]
    fn test_aggregate_collects_fresh_values() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2, 3])).unwrap();
        let id = graph
            .add_connected(Node::map(|v| Ok(v.clone())).aggregate(true), &[src])
            .unwrap();
        let eval = graph.evaluate(id).unwrap();
        assert_eq!(eval.into_values(), ints(&[1, 2, 3]));
    }

    #[test]
    fn test_aggregate_skips_filtered_passes() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([-1, 2, -3, 4])).unwrap();
        let f = graph
            .add_connected(
                Node::predicate(|v| v.as_int() > Some(0)).aggregate(true),
                &[src],
            )
            .unwrap();
        let summary = graph.aggregate(f, true).unwrap();
        assert_eq!(summary.collected, ints(&[2, 4]));
        assert_eq!(summary.produced, 2);
        assert_eq!(summary.filtered, 2);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_aggregate_without_collect_still_drains() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2, 3])).unwrap();
        let sink = graph
            .add_connected(
                Node::inspect(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
                &[src],
            )
            .unwrap();
        let summary = graph.aggregate(sink, false).unwrap();
        assert!(summary.collected.is_empty());
        assert_eq!(summary.produced, 3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_aggregate_propagates_failures() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2, 3])).unwrap();
        let t = graph
            .add_connected(
                Node::map(|v| match v.as_int() {
                    Some(2) => Err(anyhow::anyhow!("corrupt item")),
                    _ => Ok(v.clone()),
                }),
                &[src],
            )
            .unwrap();
        assert!(matches!(
            graph.aggregate(t, true),
            Err(PipelineError::Transform { .. })
        ));
        assert!(!graph.is_cached(src));
    }

    #[test]
    fn test_cancellation_returns_partial_result() {
        let mut graph = Graph::new();
        let token = graph.cancel_token();
        let src = graph.add(Node::source_iter(0..)).unwrap();
        let t = graph
            .add_connected(
                Node::map(move |v| {
                    if v.as_int() == Some(2) {
                        token.cancel();
                    }
                    Ok(v.clone())
                }),
                &[src],
            )
            .unwrap();
        let summary = graph.aggregate(t, true).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.collected, ints(&[0, 1, 2]));
        // The flag is consumed by the loop that honoured it.
        assert!(!graph.cancel_token().is_cancelled());
    }

    #[test]
    fn test_diamond_evaluates_shared_node_once_per_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2])).unwrap();
        let shared = graph
            .add_connected(
                Node::map(move |v| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(v.clone())
                }),
                &[src],
            )
            .unwrap();
        let left = graph.add_connected(double(), &[shared]).unwrap();
        let right = graph.add_connected(double(), &[shared]).unwrap();
        let join = graph
            .add_connected(
                Node::transform(2, |inputs| {
                    let sum: i64 = inputs.iter().filter_map(Value::as_int).sum();
                    Ok(Value::Int(sum))
                }),
                &[left, right],
            )
            .unwrap();

        let summary = graph.aggregate(join, true).unwrap();
        assert_eq!(summary.collected, ints(&[4, 8]));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_timeit_records_one_sample_per_computation() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2, 3])).unwrap();
        let t = graph.add_connected(double().timeit(), &[src]).unwrap();
        graph.aggregate(t, false).unwrap();
        assert_eq!(graph.timings(t).unwrap().len(), 3);
        assert!(graph.timings(src).unwrap().is_empty());
        assert_eq!(graph.timing_summary(t).unwrap().map(|s| s.count), Some(3));
    }

    #[test]
    fn test_timeit_skips_cache_hits() {
        let mut graph = Graph::new();
        let src = graph.add(Node::source_iter([1, 2])).unwrap();
        let t = graph.add_connected(double().timeit(), &[src]).unwrap();
        graph.infer(t).unwrap();
        graph.infer(t).unwrap();
        assert_eq!(graph.timings(t).unwrap().len(), 1);
    }

    #[test]
    fn test_only_sources_take_no_inputs() {
        let mut graph = Graph::new();
        let cases = [
            Node::transform(0, |_| Ok(Value::Int(7))),
            Node::action(0, |_| Ok(())),
            Node::filter(0, |_| Ok(true)),
        ];
        for node in cases {
            let kind = node.node_type();
            assert!(matches!(
                graph.add(node),
                Err(PipelineError::NoInputs { kind: k, ref label }) if k == kind && label.ends_with("#0")
            ));
        }
        assert!(graph.is_empty());
        assert!(graph.find("transform#0").is_none());
    }

    #[test]
    fn test_add_connected_rejection_keeps_graph_unchanged() {
        let mut graph = Graph::new();
        let a = graph.add(Node::source_iter([1])).unwrap();
        let err = graph
            .add_connected(Node::transform(2, |_| Ok(Value::Unit)), &[a])
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ArityMismatch { ref label, expected: 2, actual: 1, .. } if label == "transform#1"
        ));
        assert_eq!(graph.len(), 1);
        assert!(graph.find("transform#1").is_none());

        // The freed slot and name are reused by the next node.
        let b = graph.add_connected(double(), &[a]).unwrap();
        assert_eq!(b, NodeId(1));
        assert_eq!(graph.name(b).unwrap(), "transform#1");
    }

    #[test]
    fn test_cancel_during_exhausting_pass_is_not_carried_over() {
        let mut graph = Graph::new();
        let token = graph.cancel_token();
        let mut items = vec![2, 1].into_iter().map(Value::Int);
        let src = graph
            .add(Node::source(crate::pipeline::FnGenerator::new(move || {
                let item = items.next();
                if item.is_none() {
                    token.cancel();
                }
                Ok(item)
            })))
            .unwrap();
        let t = graph
            .add_connected(Node::map(|v| Ok(v.clone())), &[src])
            .unwrap();

        let first = graph.aggregate(t, true).unwrap();
        assert_eq!(first.collected, ints(&[2, 1]));
        assert!(!first.cancelled);
        assert!(!graph.cancel_token().is_cancelled());

        let src2 = graph.add(Node::source_iter([10, 20])).unwrap();
        let t2 = graph
            .add_connected(Node::map(|v| Ok(v.clone())), &[src2])
            .unwrap();
        let second = graph.aggregate(t2, true).unwrap();
        assert_eq!(second.collected, ints(&[10, 20]));
        assert!(!second.cancelled);
    }

    #[test]
    fn test_cancel_during_single_shot_is_dropped() {
        let mut graph = Graph::new();
        let token = graph.cancel_token();
        let src = graph.add(Node::source_iter([1, 2, 3])).unwrap();
        let t = graph
            .add_connected(
                Node::map(move |v| {
                    token.cancel();
                    Ok(v.clone())
                }),
                &[src],
            )
            .unwrap();

        assert_eq!(graph.evaluate_once(t).unwrap(), Value::Int(1));
        assert!(!graph.cancel_token().is_cancelled());
        let rest = graph.aggregate(src, true).unwrap();
        assert_eq!(rest.collected, ints(&[2, 3]));
    }
}
