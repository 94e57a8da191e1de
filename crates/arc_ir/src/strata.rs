//! Stratum layering of the dataflow graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Node key → stratum level, plus the maximum level
///
/// Every edge goes from a lower level to a strictly higher one, so executing
/// levels in increasing order visits every producer before its consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strata {
    /// Level of each node
    pub levels: IndexMap<String, u32>,
    /// Highest level in use
    pub max: u32,
}

impl Strata {
    /// Create an empty layering
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a node to a level, raising `max` as needed
    #[must_use]
    pub fn with(mut self, node: impl Into<String>, level: u32) -> Self {
        self.assign(node, level);
        self
    }

    /// Assign a node to a level, raising `max` as needed
    pub fn assign(&mut self, node: impl Into<String>, level: u32) {
        self.max = self.max.max(level);
        self.levels.insert(node.into(), level);
    }

    /// Level of a node
    #[must_use]
    pub fn level(&self, node: &str) -> Option<u32> {
        self.levels.get(node).copied()
    }

    /// Highest level actually assigned
    #[must_use]
    pub fn highest_assigned(&self) -> Option<u32> {
        self.levels.values().copied().max()
    }

    /// Nodes at a level, in assignment order
    pub fn nodes_at(&self, level: u32) -> impl Iterator<Item = &str> + '_ {
        self.levels
            .iter()
            .filter(move |(_, l)| **l == level)
            .map(|(n, _)| n.as_str())
    }
}
