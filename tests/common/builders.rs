//! Test graph builders

use pullgraph_rs::pipeline::{Graph, Node, NodeId, Pipeline, PipelineOptions, Value};

/// Builds a source followed by unwired integer stages, then chains them.
pub struct ChainBuilder {
    graph: Graph,
    ids: Vec<NodeId>,
}

impl ChainBuilder {
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = i64>,
        I::IntoIter: Send + 'static,
    {
        let mut graph = Graph::new();
        let source = graph
            .add(Node::source_iter(items).with_label("source"))
            .expect("source label is unique");
        Self {
            graph,
            ids: vec![source],
        }
    }

    pub fn map<F>(self, label: &str, mut f: F) -> Self
    where
        F: FnMut(i64) -> i64 + Send + 'static,
    {
        self.stage(Node::map(move |v| {
            let x = v.as_int().ok_or_else(|| anyhow::anyhow!("expected an int, got {}", v))?;
            Ok(Value::Int(f(x)))
        })
        .with_label(label))
    }

    pub fn keep<F>(self, label: &str, mut pred: F) -> Self
    where
        F: FnMut(i64) -> bool + Send + 'static,
    {
        self.stage(Node::predicate(move |v| v.as_int().is_some_and(&mut pred)).with_label(label))
    }

    pub fn stage(mut self, node: Node) -> Self {
        let id = self.graph.add(node).expect("stage label is unique");
        self.ids.push(id);
        self
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn build(self, options: PipelineOptions) -> (Graph, Pipeline) {
        let mut graph = self.graph;
        let pipeline =
            Pipeline::from_chain_with(&mut graph, &self.ids, options).expect("chain is valid");
        (graph, pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_builder() {
        let (graph, pipeline) = ChainBuilder::from_items([1, 2])
            .map("double", |x| x * 2)
            .build(PipelineOptions::default());
        assert_eq!(graph.name(pipeline.terminal()).unwrap(), "double");
    }
}
