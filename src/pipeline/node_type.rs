//! Node type enumeration.
//!
//! A closed set of behaviour variants. Definition files name them in
//! `snake_case` (`kind = "filter"`), and topology snapshots carry them so a
//! renderer can style nodes by kind.

use serde::{Deserialize, Serialize};

/// Types of nodes a graph can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Pulls one item per pass from a generator.
    Source,
    /// Maps upstream values to a new value.
    Transform,
    /// Runs for effect and passes its inputs through.
    Action,
    /// Passes its inputs through or voids the pass.
    Filter,
    /// Facade node created by a `Pipeline` around its terminal.
    Pipeline,
}

impl NodeType {
    /// Get the display name for this node type.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::Source => "Source",
            NodeType::Transform => "Transform",
            NodeType::Action => "Action",
            NodeType::Filter => "Filter",
            NodeType::Pipeline => "Pipeline",
        }
    }

    /// Lowercase prefix used for generated node names (`filter#3`).
    pub fn slug(&self) -> &'static str {
        match self {
            NodeType::Source => "source",
            NodeType::Transform => "transform",
            NodeType::Action => "action",
            NodeType::Filter => "filter",
            NodeType::Pipeline => "pipeline",
        }
    }

    /// Get all node types a definition file may declare.
    pub fn declarable() -> &'static [NodeType] {
        &[
            NodeType::Source,
            NodeType::Transform,
            NodeType::Action,
            NodeType::Filter,
        ]
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names() {
        let t: NodeType = serde_json::from_str("\"filter\"").unwrap();
        assert_eq!(t, NodeType::Filter);
        assert_eq!(serde_json::to_string(&NodeType::Source).unwrap(), "\"source\"");
    }

    #[test]
    fn test_declarable_excludes_pipeline() {
        assert!(!NodeType::declarable().contains(&NodeType::Pipeline));
        assert_eq!(NodeType::declarable().len(), 4);
    }
}
