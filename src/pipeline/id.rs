//! Identity types for the pipeline system.
//!
//! Nodes live in an arena owned by [`Graph`](crate::pipeline::Graph). A
//! `NodeId` is a newtype over `u32` that serves as a direct index into that
//! arena, so edges are plain handles and a node can feed any number of
//! downstream consumers without shared ownership.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into `Graph::nodes`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
