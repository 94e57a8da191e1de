//! Per-node runtime state.

use crate::stage::{ConfigVars, StageExecutor, StateVars};
use arc_core::{Alignment, Value};
use arc_ir::Stage;
use bitvec::vec::BitVec;
use std::sync::Arc;

/// A channel feeding one input parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadSlot {
    pub channel: usize,
    pub param: usize,
}

/// A channel receiving one output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WriteSlot {
    pub channel: usize,
    pub output: usize,
}

/// An edge feeding one input parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EdgeSlot {
    pub edge: usize,
    pub param: usize,
}

/// Static wiring of one edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EdgeRoute {
    pub source: usize,
    /// Output index on the source stage
    pub output: usize,
    pub target: usize,
}

/// Mutable state of one node
pub(crate) struct NodeState {
    pub key: String,
    pub stage: Arc<Stage>,
    pub level: u32,
    pub config: ConfigVars,
    pub reads: Vec<ReadSlot>,
    pub writes: Vec<WriteSlot>,
    pub inputs: Vec<EdgeSlot>,
    /// Edges leaving this node
    pub outgoing: Vec<usize>,
    /// Highest alignment consumed per read slot, `None` until the first sample
    pub watermarks: Vec<Option<Alignment>>,
    /// Read slots whose channel has delivered data at least once
    pub seen: BitVec,
    pub activated: bool,
    pub state: StateVars,
    /// Last value taken for each input parameter
    pub last_values: Vec<Option<Value>>,
    pub executor: Box<dyn StageExecutor>,
}

impl NodeState {
    pub fn new(
        key: String,
        stage: Arc<Stage>,
        level: u32,
        config: ConfigVars,
        executor: Box<dyn StageExecutor>,
    ) -> Self {
        let state = initial_state(&stage);
        let params = stage.params.len();
        Self {
            key,
            stage,
            level,
            config,
            reads: Vec::new(),
            writes: Vec::new(),
            inputs: Vec::new(),
            outgoing: Vec::new(),
            watermarks: Vec::new(),
            seen: BitVec::new(),
            activated: false,
            state,
            last_values: vec![None; params],
            executor,
        }
    }

    /// Bind a channel to an input parameter, returning the read slot
    pub fn add_read(&mut self, channel: usize, param: usize) -> usize {
        self.reads.push(ReadSlot { channel, param });
        self.watermarks.push(None);
        self.seen.push(false);
        self.reads.len() - 1
    }

    /// Watermark of the read slot bound to `channel`
    pub fn watermark_for(&self, channel: usize) -> Option<Alignment> {
        self.reads
            .iter()
            .position(|r| r.channel == channel)
            .and_then(|slot| self.watermarks[slot])
    }
}

impl std::fmt::Debug for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeState")
            .field("key", &self.key)
            .field("stage", &self.stage.key)
            .field("level", &self.level)
            .field("watermarks", &self.watermarks)
            .field("activated", &self.activated)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Initial value of every stateful variable: its declared default, else the
/// type's zero value. Unit-typed variables hold nothing.
pub(crate) fn initial_state(stage: &Stage) -> StateVars {
    stage
        .stateful
        .iter()
        .filter_map(|var| var.fallback().map(|v| (var.name.clone(), v)))
        .collect()
}
