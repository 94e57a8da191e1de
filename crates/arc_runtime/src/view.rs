//! Read-only views into runtime state.

use crate::channel::ChannelState;
use crate::node::NodeState;
use crate::stage::StateVars;
use arc_core::{Alignment, ChannelKey, DataType, Series, Value};
use indexmap::IndexMap;

/// Snapshot access to one channel
#[derive(Debug, Clone, Copy)]
pub struct ChannelView<'a> {
    pub(crate) channel: &'a ChannelState,
    pub(crate) nodes: &'a IndexMap<String, NodeState>,
}

impl<'a> ChannelView<'a> {
    /// Channel key
    #[must_use]
    pub fn key(&self) -> ChannelKey {
        self.channel.key
    }

    /// Declared type
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.channel.data_type
    }

    /// Buffered series, oldest first
    pub fn series(&self) -> impl Iterator<Item = &'a Series> + 'a {
        self.channel.series.iter()
    }

    /// Total buffered samples
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.channel.series.iter().map(Series::len).sum()
    }

    /// Most recent value
    #[must_use]
    pub fn latest(&self) -> Option<&'a Value> {
        self.channel.latest.as_ref()
    }

    /// Alignment of the most recent sample
    #[must_use]
    pub fn last_alignment(&self) -> Option<Alignment> {
        self.channel.last_alignment
    }

    /// Whether the channel has ever received data
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.channel.has_data
    }

    /// Frame number of the last update
    #[must_use]
    pub fn last_frame(&self) -> Option<u64> {
        self.channel.last_frame
    }

    /// Keys of nodes reading the channel
    pub fn subscribers(&self) -> impl Iterator<Item = &'a str> + 'a {
        let nodes = self.nodes;
        self.channel
            .subscribers
            .iter()
            .map(move |s| nodes[s.node].key.as_str())
    }

    /// Keys of nodes writing the channel
    pub fn writers(&self) -> impl Iterator<Item = &'a str> + 'a {
        let nodes = self.nodes;
        self.channel
            .writers
            .iter()
            .map(move |&n| nodes[n].key.as_str())
    }
}

/// Snapshot access to one node
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub(crate) node: &'a NodeState,
    pub(crate) channels: &'a IndexMap<ChannelKey, ChannelState>,
}

impl<'a> NodeView<'a> {
    /// Node key
    #[must_use]
    pub fn key(&self) -> &'a str {
        &self.node.key
    }

    /// Key of the stage the node instantiates
    #[must_use]
    pub fn stage(&self) -> &'a str {
        &self.node.stage.key
    }

    /// Stratum level
    #[must_use]
    pub fn level(&self) -> u32 {
        self.node.level
    }

    /// Whether every required channel has delivered data
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.node.activated
    }

    /// Highest alignment consumed from `channel`
    #[must_use]
    pub fn watermark(&self, channel: ChannelKey) -> Option<Alignment> {
        self.channels
            .get_index_of(&channel)
            .and_then(|index| self.node.watermark_for(index))
    }

    /// `(channel, watermark)` for every channel the node reads
    pub fn watermarks(&self) -> impl Iterator<Item = (ChannelKey, Option<Alignment>)> + 'a {
        let channels = self.channels;
        self.node
            .reads
            .iter()
            .zip(&self.node.watermarks)
            .map(move |(read, mark)| (channels[read.channel].key, *mark))
    }

    /// Current stateful variables
    #[must_use]
    pub fn state(&self) -> &'a StateVars {
        &self.node.state
    }

    /// One stateful variable
    #[must_use]
    pub fn state_var(&self, name: &str) -> Option<&'a Value> {
        self.node.state.get(name)
    }
}
