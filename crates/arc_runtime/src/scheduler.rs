//! Stratified scheduling.
//!
//! The scheduler is deterministic:
//! - Strata run in increasing order, each exactly once per frame
//! - Nodes within a stratum run sorted by key
//! - Marking a node affected can only reach higher strata, so one forward
//!   pass is enough

use bitvec::vec::BitVec;

/// Node indices grouped by stratum, each group sorted by node key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Plan {
    levels: Vec<Vec<usize>>,
}

impl Plan {
    /// Build a plan from `(node index, key, level)` triples
    pub fn new<'a>(nodes: impl IntoIterator<Item = (usize, &'a str, u32)>, max: u32) -> Self {
        let mut levels: Vec<Vec<(usize, &str)>> = vec![Vec::new(); max as usize + 1];
        for (index, key, level) in nodes {
            if let Some(group) = levels.get_mut(level as usize) {
                group.push((index, key));
            }
        }
        let levels = levels
            .into_iter()
            .map(|mut group| {
                group.sort_by(|a, b| a.1.cmp(b.1));
                group.into_iter().map(|(index, _)| index).collect()
            })
            .collect();
        Self { levels }
    }

    /// Number of strata
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Nodes at `level`, in execution order
    pub fn level(&self, level: usize) -> &[usize] {
        self.levels.get(level).map_or(&[], Vec::as_slice)
    }
}

/// Nodes that must run in the current frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Affected {
    bits: BitVec,
}

impl Affected {
    pub fn new(nodes: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, nodes),
        }
    }

    pub fn mark(&mut self, node: usize) {
        if let Some(mut bit) = self.bits.get_mut(node) {
            *bit = true;
        }
    }

    pub fn contains(&self, node: usize) -> bool {
        self.bits.get(node).is_some_and(|bit| *bit)
    }

    /// Affected members of a stratum, preserving its order
    pub fn select(&self, level: &[usize]) -> Vec<usize> {
        level.iter().copied().filter(|&n| self.contains(n)).collect()
    }

    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
    }
}
