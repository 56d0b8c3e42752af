//! Generators backing source nodes.
//!
//! A source node owns exactly one generator, built when the node is
//! constructed. Every pass that reaches the source pulls one item from it;
//! `Ok(None)` means the stream is spent.

use crate::pipeline::value::Value;

/// Item stream behind a source node.
pub trait Generator: Send {
    /// Pull the next item. May block on an external resource.
    fn next_item(&mut self) -> anyhow::Result<Option<Value>>;

    /// Called once when the owning pipeline starts.
    fn on_start(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once when the owning pipeline ends.
    fn on_end(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Generator over any `Send` iterator.
pub struct IterGenerator<I> {
    iter: I,
}

impl<I> IterGenerator<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I, V> Generator for IterGenerator<I>
where
    I: Iterator<Item = V> + Send,
    V: Into<Value>,
{
    fn next_item(&mut self) -> anyhow::Result<Option<Value>> {
        Ok(self.iter.next().map(Into::into))
    }
}

/// Generator over a fallible closure.
pub struct FnGenerator<F> {
    pull: F,
}

impl<F> FnGenerator<F>
where
    F: FnMut() -> anyhow::Result<Option<Value>> + Send,
{
    pub fn new(pull: F) -> Self {
        Self { pull }
    }
}

impl<F> Generator for FnGenerator<F>
where
    F: FnMut() -> anyhow::Result<Option<Value>> + Send,
{
    fn next_item(&mut self) -> anyhow::Result<Option<Value>> {
        (self.pull)()
    }
}
