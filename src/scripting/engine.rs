//! Rhai Script Engine Implementation
//!
//! Holds the configured Rhai engine and converts between pipeline `Value`s
//! and Rhai `Dynamic`s on the way in and out of a script.

use crate::error::{PullGraphError, Result, ResultExt};
use crate::pipeline::Value;
use crate::scripting::{CompiledScript, SharedScriptCache};
use rhai::{Array, Dynamic, Engine, Scope};

/// Script engine shared by every scripted node of a graph
pub struct ScriptEngine {
    engine: Engine,
    cache: SharedScriptCache,
}

impl ScriptEngine {
    /// Create a new script engine with default configuration
    pub fn new() -> Self {
        Self::with_cache(crate::scripting::create_shared_cache())
    }

    /// Create a new script engine with a shared cache
    pub fn with_cache(cache: SharedScriptCache) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine);
        Self { engine, cache }
    }

    /// Configure the Rhai engine with helpers, log routing and safety limits
    fn configure_engine(engine: &mut Engine) {
        // Set safety limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(100_000);
        engine.set_max_string_size(100_000);
        engine.set_max_array_size(10_000);
        engine.set_max_map_size(1_000);

        engine.on_print(|text| tracing::info!(target: "pullgraph_rs::script", "{}", text));
        engine.on_debug(|text, source, pos| match source {
            Some(source) => {
                tracing::debug!(target: "pullgraph_rs::script", "[{} @ {}] {}", source, pos, text)
            }
            None => tracing::debug!(target: "pullgraph_rs::script", "[{}] {}", pos, text),
        });

        engine.register_fn("clamp", |x: f64, min: f64, max: f64| x.clamp(min, max));
        engine.register_fn("clamp", |x: i64, min: i64, max: i64| x.clamp(min, max));
        engine.register_fn("lerp", |a: f64, b: f64, t: f64| a + (b - a) * t);
        engine.register_fn(
            "map_range",
            |x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64| {
                (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
            },
        );
        engine.register_fn("deadband", |value: f64, center: f64, width: f64| -> f64 {
            if (value - center).abs() < width / 2.0 {
                center
            } else {
                value
            }
        });
        engine.register_fn("sign", |x: f64| {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        });
    }

    /// Compile a script and cache it
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledScript> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| PullGraphError::Script(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, name, source)
    }

    /// Evaluate a compiled script with `inputs` bound in scope
    pub fn call(&self, script: &CompiledScript, inputs: &[Value]) -> Result<Value> {
        let mut scope = Scope::new();
        scope.push_dynamic("x", inputs.first().map(to_dynamic).unwrap_or(Dynamic::UNIT));
        for (i, input) in inputs.iter().enumerate() {
            scope.push_dynamic(format!("x{}", i), to_dynamic(input));
        }
        let args: Array = inputs.iter().map(to_dynamic).collect();
        scope.push_dynamic("args", Dynamic::from_array(args));

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, script.ast())
            .with_context(|| format!("Script '{}' failed", script.name()))?;
        from_dynamic(result)
            .map_err(|e| e.with_context(format!("Script result of '{}'", script.name())))
    }

    /// Evaluate a script that must return a bool
    pub fn call_predicate(&self, script: &CompiledScript, inputs: &[Value]) -> Result<bool> {
        let value = self.call(script, inputs)?;
        value.as_bool().ok_or_else(|| {
            PullGraphError::Script(format!(
                "{}: filter script must return a bool, got {}",
                script.name(),
                value.type_name()
            ))
        })
    }

    /// Compile and execute a script in one step
    pub fn eval(&self, source: &str, inputs: &[Value]) -> Result<Value> {
        let script = self.compile("eval", source)?;
        self.call(&script, inputs)
    }

    /// Validate a script without executing it
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile(source)
            .map(|_| ())
            .map_err(|e| PullGraphError::Script(format!("Validation error: {}", e)))
    }

    pub fn clear_cache(&self) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| PullGraphError::Script(format!("Failed to acquire cache lock: {}", e)))?;
        cache.clear();
        Ok(())
    }

    pub fn cache(&self) -> &SharedScriptCache {
        &self.cache
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_size", &self.cache.read().map(|c| c.len()).ok())
            .finish()
    }
}

/// Convert a pipeline value into a Rhai value
pub fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Unit => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Int(i) => Dynamic::from_int(*i),
        Value::Float(f) => Dynamic::from_float(*f),
        Value::Str(s) => Dynamic::from(s.clone()),
        Value::List(items) => Dynamic::from_array(items.iter().map(to_dynamic).collect()),
    }
}

/// Convert a Rhai value back into a pipeline value
pub fn from_dynamic(value: Dynamic) -> Result<Value> {
    if value.is_unit() {
        return Ok(Value::Unit);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(Value::Int(i));
    }
    if let Ok(f) = value.as_float() {
        return Ok(Value::Float(f));
    }
    if value.is_string() {
        return value
            .into_string()
            .map(Value::Str)
            .map_err(|t| PullGraphError::Script(format!("Cannot read {} as a string", t)));
    }
    if value.is_array() {
        let items = value
            .into_array()
            .map_err(|t| PullGraphError::Script(format!("Cannot read {} as an array", t)))?;
        return items
            .into_iter()
            .map(from_dynamic)
            .collect::<Result<Vec<_>>>()
            .map(Value::List);
    }
    Err(PullGraphError::Script(format!(
        "Unsupported script value of type {}",
        value.type_name()
    )))
}
