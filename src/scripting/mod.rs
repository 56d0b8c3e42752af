//! Rhai scripting for node bodies
//!
//! Definition files describe transforms, actions and filters as Rhai
//! scripts. A script is evaluated once per computation with the node's
//! upstream values in scope.
//!
//! ## Bindings
//!
//! - `x` - the first input (`()` when the node takes none)
//! - `x0`, `x1`, ... - every input by position
//! - `args` - all inputs as an array
//!
//! `print` goes to the log at info level, `debug` at debug level.
//! Stock bodies from [`builtins`] are named with a `builtin:` prefix.
//!
//! ## Helper Functions
//!
//! - `clamp(x, min, max)` - Clamp to a range
//! - `lerp(a, b, t)` - Linear interpolation
//! - `map_range(x, in_min, in_max, out_min, out_max)` - Rescale a value
//! - `deadband(x, center, width)` - Snap to `center` within `width`
//! - `sign(x)` - -1.0, 0.0 or 1.0
//!
//! ## Example Scripts
//!
//! Scaling the only input:
//! ```rhai
//! x * 2
//! ```
//!
//! Joining two inputs:
//! ```rhai
//! x0 + x1
//! ```
//!
//! Keeping positive values (filter):
//! ```rhai
//! x > 0
//! ```

mod engine;

pub use engine::{from_dynamic, to_dynamic, ScriptEngine};

use crate::error::{PullGraphError, Result};
use rhai::{Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A compiled node script that can be executed efficiently
#[derive(Clone)]
pub struct CompiledScript {
    ast: AST,
    source: String,
    /// Name of the node the script belongs to, used in error messages
    name: String,
}

impl CompiledScript {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl std::fmt::Debug for CompiledScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledScript")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Compiled scripts keyed by source text
#[derive(Default)]
pub struct ScriptCache {
    cache: HashMap<String, AST>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached script or compile and cache it.
    ///
    /// Two nodes sharing a body share one AST; each keeps its own name.
    pub fn get_or_compile(
        &mut self,
        engine: &Engine,
        name: &str,
        source: &str,
    ) -> Result<CompiledScript> {
        let ast = match self.cache.get(source) {
            Some(ast) => ast.clone(),
            None => {
                let ast = engine.compile(source).map_err(|e| {
                    PullGraphError::Script(format!("{}: compilation error: {}", name, e))
                })?;
                self.cache.insert(source.to_string(), ast.clone());
                ast
            }
        };

        Ok(CompiledScript {
            ast,
            source: source.to_string(),
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Thread-safe script cache wrapper
pub type SharedScriptCache = Arc<RwLock<ScriptCache>>;

pub fn create_shared_cache() -> SharedScriptCache {
    Arc::new(RwLock::new(ScriptCache::new()))
}

/// Ready-made node bodies, referenced from definition files as
/// `script = "builtin:<name>"`
pub mod builtins {
    pub const PREFIX: &str = "builtin:";

    pub const IDENTITY: &str = "x";

    /// Sum of every input
    pub const SUM: &str = r#"
let total = 0;
for v in args {
    total += v;
}
total
"#;

    /// Filter keeping strictly positive values
    pub const POSITIVE: &str = "x > 0";

    /// Filter dropping blank lines
    pub const NON_BLANK: &str = "x.trim(); x != \"\"";

    pub fn all() -> &'static [(&'static str, &'static str)] {
        &[
            ("identity", IDENTITY),
            ("sum", SUM),
            ("positive", POSITIVE),
            ("non_blank", NON_BLANK),
        ]
    }

    /// Source of the built-in called `name`.
    pub fn lookup(name: &str) -> Option<&'static str> {
        all()
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| *source)
    }
}
