//! Pipeline definition files
//!
//! A definition file describes the nodes of a graph, how they are wired and
//! how the result is evaluated. TOML is the default format; files ending in
//! `.json` are read and written as JSON.
//!
//! # Example
//!
//! ```toml
//! name = "positives"
//! terminal = "positive"
//!
//! [settings]
//! aggregate = true
//! collect = true
//!
//! [[nodes]]
//! name = "numbers"
//! kind = "source"
//! items = [-1, 2, -3, 4]
//!
//! [[nodes]]
//! name = "positive"
//! kind = "filter"
//! script = "x > 0"
//! inputs = ["numbers"]
//! ```
//!
//! Either `chain` (nodes wired left to right) or `terminal` (an explicitly
//! wired graph) selects what is evaluated; without either, the last node is
//! the terminal.

use crate::error::{PullGraphError, Result};
use crate::pipeline::{NodeType, Value};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current definition file format version
pub const PIPELINE_FILE_VERSION: u32 = 1;

/// Extension selecting the JSON format
pub const JSON_EXTENSION: &str = "json";

/// Origin reported for definitions parsed from memory
pub const INLINE_ORIGIN: &str = "<inline>";

/// A complete pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFile {
    /// Format version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub name: String,

    /// Node names wired left to right; the last one is the terminal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,

    #[serde(default)]
    pub settings: RunSettings,

    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,

    /// File the definition was loaded from
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

fn default_version() -> u32 {
    PIPELINE_FILE_VERSION
}

impl Default for PipelineFile {
    fn default() -> Self {
        Self {
            version: PIPELINE_FILE_VERSION,
            name: String::new(),
            chain: Vec::new(),
            terminal: None,
            settings: RunSettings::default(),
            nodes: Vec::new(),
            origin: None,
        }
    }
}

/// How the terminal is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Drain the sources instead of running one pass
    #[serde(default = "default_true")]
    pub aggregate: bool,

    /// Keep each produced value when aggregating
    #[serde(default = "default_true")]
    pub collect: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            aggregate: true,
            collect: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// One node of a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique label, used for wiring and in the topology
    pub name: String,

    pub kind: NodeType,

    /// Upstream node names, in positional-argument order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,

    /// Rhai body for transforms, actions and filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Literal items for a source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,

    /// Integer range for a source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeDefinition>,

    /// Text file read line by line for a source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<PathBuf>,

    /// Skip blank lines when reading `lines`
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_blank: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub timeit: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub verbose: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl NodeDefinition {
    /// A node of `kind` with nothing else set
    pub fn new(name: impl Into<String>, kind: NodeType) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            script: None,
            items: None,
            range: None,
            lines: None,
            skip_blank: false,
            timeit: false,
            verbose: false,
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_items<I, V>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.items = Some(items.into_iter().map(Into::into).collect());
        self
    }
}

/// `start..end` stepping by `step`; a negative step counts down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDefinition {
    pub start: i64,
    pub end: i64,
    #[serde(default = "default_step")]
    pub step: i64,
}

fn default_step() -> i64 {
    1
}

impl RangeDefinition {
    /// The items of the range, or `None` for a zero step
    pub fn iter(&self) -> Option<impl Iterator<Item = i64> + Send + 'static> {
        if self.step == 0 {
            return None;
        }
        let RangeDefinition { start, end, step } = *self;
        Some(
            std::iter::successors(Some(start), move |&v| v.checked_add(step))
                .take_while(move |&v| if step > 0 { v < end } else { v > end }),
        )
    }
}

impl PipelineFile {
    /// Load a definition, choosing the format from the extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PullGraphError::config(path, format!("Failed to read: {}", e)))?;

        let mut file: PipelineFile = if is_json(path) {
            serde_json::from_str(&content)
                .map_err(|e| PullGraphError::config(path, format!("Failed to parse: {}", e)))?
        } else {
            toml::from_str(&content)
                .map_err(|e| PullGraphError::config(path, format!("Failed to parse: {}", e)))?
        };
        file.origin = Some(path.to_path_buf());

        tracing::debug!(
            "Loaded pipeline '{}' with {} node(s) from {:?}",
            file.name,
            file.nodes.len(),
            path
        );
        Ok(file)
    }

    /// Parse a TOML definition held in memory
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PullGraphError::config(INLINE_ORIGIN, format!("Failed to parse: {}", e)))
    }

    /// Save the definition, choosing the format from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PullGraphError::config(path, format!("Failed to create directory: {}", e))
            })?;
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|e| PullGraphError::Serialization(e.to_string()))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| PullGraphError::Serialization(e.to_string()))?
        };

        std::fs::write(path, content)
            .map_err(|e| PullGraphError::config(path, format!("Failed to write: {}", e)))
    }

    pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Resolve a path named in the definition against its directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match self.origin.as_deref().and_then(Path::parent) {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Configuration error attributed to this definition
    pub fn error(&self, message: impl Into<String>) -> PullGraphError {
        let path = self
            .origin
            .clone()
            .unwrap_or_else(|| PathBuf::from(INLINE_ORIGIN));
        PullGraphError::config(path, message)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(JSON_EXTENSION))
}
