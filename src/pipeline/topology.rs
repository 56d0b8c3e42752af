//! Graph introspection.
//!
//! `Topology::enumerate` walks the wiring depth-first from a root and records
//! every reachable node with its direct predecessors. The post-order it
//! produces (upstream before downstream, each node once) drives lifecycle
//! hooks; the adjacency is what a renderer consumes through
//! [`TopologySnapshot`].

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::Graph;
use crate::pipeline::id::NodeId;
use crate::pipeline::node_type::NodeType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Nodes reachable from a root, with their direct predecessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    root: NodeId,
    order: Vec<NodeId>,
    predecessors: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Topology {
    /// Depth-first walk from `root`, following upstream wiring.
    pub fn enumerate(graph: &Graph, root: NodeId) -> PipelineResult<Self> {
        let mut visited = vec![false; graph.len()];
        let mut order = Vec::new();
        let mut predecessors = BTreeMap::new();
        let mut stack = vec![(root, false)];

        graph.node(root)?;
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if visited[id.index()] {
                continue;
            }
            visited[id.index()] = true;

            let preds = graph.predecessors(id)?;
            predecessors.insert(id, preds.to_vec());
            stack.push((id, true));
            // Reversed so the first-wired predecessor is walked first.
            for &p in preds.iter().rev() {
                if !visited[p.index()] {
                    stack.push((p, false));
                }
            }
        }

        Ok(Self {
            root,
            order,
            predecessors,
        })
    }

    /// Check that every reachable node is wired to as many predecessors as
    /// its function takes. Sources take none; every other node at least one.
    pub fn validate(&self, graph: &Graph) -> PipelineResult<()> {
        for &id in &self.order {
            let node = graph.node(id)?;
            let starved = node.previous().is_empty() && node.node_type() != NodeType::Source;
            if starved || node.previous().len() != node.arity() {
                return Err(PipelineError::Unwired {
                    node_id: id,
                    label: node.name().to_string(),
                    expected: node.arity().max(1),
                    actual: node.previous().len(),
                });
            }
        }
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Reachable nodes, each after all of its predecessors.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn predecessors(&self, id: NodeId) -> Option<&[NodeId]> {
        self.predecessors.get(&id).map(Vec::as_slice)
    }

    pub fn adjacency(&self) -> &BTreeMap<NodeId, Vec<NodeId>> {
        &self.predecessors
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.predecessors.contains_key(&id)
    }

    /// Reachable nodes without predecessors.
    pub fn sources(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|id| self.predecessors.get(id).is_some_and(Vec::is_empty))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Read-only view with display names, for renderers.
    pub fn snapshot(&self, graph: &Graph) -> PipelineResult<TopologySnapshot> {
        let mut nodes = Vec::with_capacity(self.order.len());
        for &id in &self.order {
            let node = graph.node(id)?;
            let predecessors = node
                .previous()
                .iter()
                .map(|&p| graph.name(p).map(str::to_string))
                .collect::<PipelineResult<Vec<_>>>()?;
            nodes.push(NodeSnapshot {
                id,
                name: node.name().to_string(),
                kind: node.node_type(),
                predecessors,
            });
        }
        Ok(TopologySnapshot {
            root: graph.name(self.root)?.to_string(),
            nodes,
        })
    }
}

/// Snapshot of a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeType,
    /// Display names of the direct predecessors, in wiring order.
    pub predecessors: Vec<String>,
}

/// Complete topology snapshot, upstream nodes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub root: String,
    pub nodes: Vec<NodeSnapshot>,
}

impl TopologySnapshot {
    pub fn find(&self, name: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Graphviz DOT rendering, edges pointing downstream.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n    rankdir=LR;\n");
        for node in &self.nodes {
            let shape = match node.kind {
                NodeType::Source => "invhouse",
                NodeType::Filter => "diamond",
                NodeType::Action => "note",
                NodeType::Pipeline => "doubleoctagon",
                NodeType::Transform => "box",
            };
            let _ = writeln!(
                out,
                "    \"{}\" [shape={}];",
                escape(&node.name),
                shape
            );
        }
        for node in &self.nodes {
            for pred in &node.predecessors {
                let _ = writeln!(
                    out,
                    "    \"{}\" -> \"{}\";",
                    escape(pred),
                    escape(&node.name)
                );
            }
        }
        out.push_str("}\n");
        out
    }
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::Node;
    use crate::pipeline::value::Value;

    fn diamond() -> (Graph, [NodeId; 4]) {
        let mut graph = Graph::new();
        let a = graph.add(Node::source_iter([1]).with_label("a")).unwrap();
        let b = graph
            .add_connected(Node::map(|v| Ok(v.clone())).with_label("b"), &[a])
            .unwrap();
        let c = graph
            .add_connected(Node::map(|v| Ok(v.clone())).with_label("c"), &[a])
            .unwrap();
        let d = graph
            .add_connected(
                Node::transform(2, |_| Ok(Value::Unit)).with_label("d"),
                &[b, c],
            )
            .unwrap();
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_post_order_visits_each_node_once() {
        let (graph, [a, b, c, d]) = diamond();
        let topo = Topology::enumerate(&graph, d).unwrap();
        assert_eq!(topo.order(), &[a, b, c, d]);
        assert_eq!(topo.predecessors(d), Some(&[b, c][..]));
        assert_eq!(topo.sources().collect::<Vec<_>>(), vec![a]);
        topo.validate(&graph).unwrap();
    }

    #[test]
    fn test_partial_walk_from_inner_node() {
        let (graph, [a, b, c, _]) = diamond();
        let topo = Topology::enumerate(&graph, b).unwrap();
        assert_eq!(topo.order(), &[a, b]);
        assert!(!topo.contains(c));
    }

    #[test]
    fn test_validate_reports_dangling_node() {
        let mut graph = Graph::new();
        let t = graph.add(Node::map(|v| Ok(v.clone()))).unwrap();
        let topo = Topology::enumerate(&graph, t).unwrap();
        assert!(matches!(
            topo.validate(&graph),
            Err(PipelineError::Unwired { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn test_snapshot_and_dot() {
        let (graph, [_, _, _, d]) = diamond();
        let snap = Topology::enumerate(&graph, d).unwrap().snapshot(&graph).unwrap();
        assert_eq!(snap.root, "d");
        assert_eq!(snap.find("d").unwrap().predecessors, vec!["b", "c"]);
        assert_eq!(snap.find("a").unwrap().kind, NodeType::Source);

        let dot = snap.to_dot();
        assert!(dot.starts_with("digraph pipeline {"));
        assert!(dot.contains("\"a\" -> \"b\";"));
        assert!(dot.contains("\"c\" -> \"d\";"));
        assert!(dot.contains("\"a\" [shape=invhouse];"));
    }

    #[test]
    fn test_unknown_root() {
        let graph = Graph::new();
        assert!(matches!(
            Topology::enumerate(&graph, NodeId(0)),
            Err(PipelineError::UnknownNode(_))
        ));
    }
}
