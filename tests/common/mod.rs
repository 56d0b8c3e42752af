//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use pullgraph_rs::pipeline::{Node, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wrap integers as pipeline values
pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|&v| Value::Int(v)).collect()
}

/// Shared call counter for node functions
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Identity node bumping the counter on every computation
    pub fn identity(&self) -> Node {
        let counter = self.0.clone();
        Node::map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(v.clone())
        })
    }
}
