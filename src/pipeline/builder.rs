//! Build a graph and its pipeline from a definition file.
//!
//! ```text
//! PipelineFile ──► nodes (scripts compiled up front) ──► wiring ──► Pipeline
//! ```
//!
//! Every node is added before any is wired, so `inputs` may name nodes
//! declared further down the file.

use crate::config::{NodeDefinition, PipelineFile};
use crate::error::{Result, ResultExt};
use crate::pipeline::executor::{Pipeline, PipelineOptions};
use crate::pipeline::graph::Graph;
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{Node, NodeOptions};
use crate::pipeline::node_type::NodeType;
use crate::pipeline::nodes::LineReader;
use crate::scripting::{builtins, ScriptEngine};
use std::sync::Arc;

/// Turns definitions into runnable graphs, sharing one script engine.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    engine: Arc<ScriptEngine>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: Arc<ScriptEngine>) -> Self {
        Self { engine }
    }

    /// Build the graph described by `file` and the pipeline evaluating it.
    pub fn build(&self, file: &PipelineFile) -> Result<(Graph, Pipeline)> {
        if file.nodes.is_empty() {
            return Err(file.error("definition declares no nodes"));
        }
        if !file.chain.is_empty() && file.terminal.is_some() {
            return Err(file.error("'chain' and 'terminal' are mutually exclusive"));
        }

        let mut graph = Graph::new();
        for (i, def) in file.nodes.iter().enumerate() {
            let chain_pos = file.chain.iter().position(|n| n == &def.name);
            if chain_pos.is_some() && !def.inputs.is_empty() {
                return Err(file.error(format!(
                    "node '{}' is part of the chain and cannot declare inputs",
                    def.name
                )));
            }
            let arity = match chain_pos {
                Some(pos) if pos > 0 => 1,
                _ => def.inputs.len(),
            };
            let node = self.create_node(file, def, arity)?;
            if arity == 0 && def.kind != NodeType::Source {
                return Err(file.error(format!(
                    "{} node '{}' needs at least one input (list them in 'inputs' or place it after the first node of 'chain')",
                    def.kind, def.name
                )));
            }
            graph
                .add(node)
                .with_context(|| format!("Failed to add node #{} '{}'", i, def.name))?;
        }

        for def in file.nodes.iter().filter(|d| !d.inputs.is_empty()) {
            let id = lookup(file, &graph, &def.name)?;
            let upstream = def
                .inputs
                .iter()
                .map(|name| {
                    graph.find(name).ok_or_else(|| {
                        file.error(format!("node '{}' lists unknown input '{}'", def.name, name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            graph
                .connect(id, &upstream)
                .with_context(|| format!("Failed to wire node '{}'", def.name))?;
        }

        let options = PipelineOptions {
            aggregate: Some(file.settings.aggregate),
            collect: Some(file.settings.collect),
        };
        let pipeline = if file.chain.is_empty() {
            let terminal = match (&file.terminal, file.nodes.last()) {
                (Some(name), _) => lookup(file, &graph, name)?,
                (None, Some(last)) => lookup(file, &graph, &last.name)?,
                (None, None) => return Err(file.error("definition declares no nodes")),
            };
            Pipeline::from_terminal_with(&mut graph, terminal, options)
                .context("Failed to wrap the terminal node")?
        } else {
            let chain = file
                .chain
                .iter()
                .map(|name| lookup(file, &graph, name))
                .collect::<Result<Vec<_>>>()?;
            Pipeline::from_chain_with(&mut graph, &chain, options)
                .context("Failed to build the chain")?
        };

        tracing::info!(
            "Built pipeline '{}': {} node(s), terminal {}",
            file.name,
            graph.len(),
            graph.name(pipeline.terminal())?
        );
        Ok((graph, pipeline))
    }

    fn create_node(&self, file: &PipelineFile, def: &NodeDefinition, arity: usize) -> Result<Node> {
        let node = match def.kind {
            NodeType::Source => Self::create_source(file, def)?,
            NodeType::Pipeline => {
                let kinds: Vec<_> = NodeType::declarable().iter().map(NodeType::slug).collect();
                return Err(file.error(format!(
                    "node '{}': pipeline nodes are created by the run, not declared (use one of {})",
                    def.name,
                    kinds.join(", ")
                )));
            }
            kind => {
                if def.items.is_some() || def.range.is_some() || def.lines.is_some() {
                    return Err(file.error(format!(
                        "node '{}': only sources take items, range or lines",
                        def.name
                    )));
                }
                let source = def.script.as_deref().ok_or_else(|| {
                    file.error(format!("{} node '{}' needs a script", kind, def.name))
                })?;
                let source = match source.strip_prefix(builtins::PREFIX) {
                    Some(name) => builtins::lookup(name).ok_or_else(|| {
                        let known: Vec<_> = builtins::all().iter().map(|(n, _)| *n).collect();
                        file.error(format!(
                            "node '{}': unknown built-in script '{}' (known: {})",
                            def.name,
                            name,
                            known.join(", ")
                        ))
                    })?,
                    None => source,
                };
                let script = self.engine.compile(&def.name, source)?;
                let engine = self.engine.clone();
                match kind {
                    NodeType::Action => Node::action(arity, move |inputs| {
                        engine.call(&script, inputs)?;
                        Ok(())
                    }),
                    NodeType::Filter => {
                        Node::filter(arity, move |inputs| Ok(engine.call_predicate(&script, inputs)?))
                    }
                    _ => Node::transform(arity, move |inputs| Ok(engine.call(&script, inputs)?)),
                }
            }
        };

        Ok(node.with_label(def.name.clone()).with_options(NodeOptions {
            timeit: def.timeit,
            verbose: def.verbose,
            ..NodeOptions::default()
        }))
    }

    fn create_source(file: &PipelineFile, def: &NodeDefinition) -> Result<Node> {
        if !def.inputs.is_empty() {
            return Err(file.error(format!("source '{}' cannot take inputs", def.name)));
        }
        match (&def.items, &def.range, &def.lines) {
            (Some(items), None, None) => Ok(Node::source_iter(items.clone())),
            (None, Some(range), None) => {
                let items = range.iter().ok_or_else(|| {
                    file.error(format!("source '{}' has a range with step 0", def.name))
                })?;
                Ok(Node::source_iter(items))
            }
            (None, None, Some(path)) => Ok(Node::source(
                LineReader::new(file.resolve(path)).skip_blank(def.skip_blank),
            )),
            _ => Err(file.error(format!(
                "source '{}' needs exactly one of items, range or lines",
                def.name
            ))),
        }
    }
}

fn lookup(file: &PipelineFile, graph: &Graph, name: &str) -> Result<NodeId> {
    graph
        .find(name)
        .ok_or_else(|| file.error(format!("unknown node '{}'", name)))
}
