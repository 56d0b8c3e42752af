//! Built-in generators and pass-through helpers.

pub mod line_reader;
pub mod source;

pub use line_reader::LineReader;
pub use source::{FnGenerator, Generator, IterGenerator};

use crate::pipeline::value::Value;

/// Value handed downstream by action, filter and pipeline nodes.
///
/// One input passes through as-is, several become a `Value::List` in wiring
/// order, none becomes `Value::Unit`.
pub fn pass_through(mut inputs: Vec<Value>) -> Value {
    match inputs.len() {
        0 => Value::Unit,
        1 => inputs.pop().unwrap_or_default(),
        _ => Value::List(inputs),
    }
}
