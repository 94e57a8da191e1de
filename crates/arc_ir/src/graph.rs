//! The compiled graph: nodes, edges and their channel wiring.

use crate::error::{IrError, IrResult};
use crate::stage::Stage;
use crate::strata::Strata;
use arc_core::{ChannelKey, DataType, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Explicit channel ↔ parameter binding on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    /// Channel being read or written
    pub channel: ChannelKey,
    /// Input parameter (for reads) or output (for writes)
    pub param: String,
}

impl Binding {
    /// Create a binding
    #[must_use]
    pub fn new(channel: impl Into<ChannelKey>, param: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            param: param.into(),
        }
    }
}

/// A node instance: a stage wired into the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node key
    pub key: String,
    /// Key of the stage this node instantiates
    pub stage: String,
    /// Config values by config-entry name
    #[serde(default)]
    pub config: IndexMap<String, Value>,
    /// Channels this node reads, each bound to an input parameter
    #[serde(default)]
    pub reads: Vec<Binding>,
    /// Channels this node writes, each bound to an output
    #[serde(default)]
    pub writes: Vec<Binding>,
}

impl Node {
    /// Create a node with no wiring
    #[must_use]
    pub fn new(key: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            stage: stage.into(),
            config: IndexMap::new(),
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Read a channel into an input parameter
    #[must_use]
    pub fn reading(mut self, channel: impl Into<ChannelKey>, param: impl Into<String>) -> Self {
        self.reads.push(Binding::new(channel, param));
        self
    }

    /// Write an output to a channel
    #[must_use]
    pub fn writing(mut self, channel: impl Into<ChannelKey>, param: impl Into<String>) -> Self {
        self.writes.push(Binding::new(channel, param));
        self
    }

    /// Set a config value
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Channels read by this node
    pub fn read_channels(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.reads.iter().map(|b| b.channel)
    }

    /// Channels written by this node
    pub fn write_channels(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.writes.iter().map(|b| b.channel)
    }
}

/// One end of an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    /// Node key
    pub node: String,
    /// Output (at the source) or input parameter (at the target)
    pub param: String,
}

impl Handle {
    /// Create a handle
    #[must_use]
    pub fn new(node: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            param: param.into(),
        }
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.param)
    }
}

/// A direct parameter binding between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Producing node output
    pub source: Handle,
    /// Consuming node input
    pub target: Handle,
}

impl Edge {
    /// Create a new edge
    #[must_use]
    pub fn new(source: Handle, target: Handle) -> Self {
        Self { source, target }
    }
}

/// A compiled program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ir {
    /// Stage table
    #[serde(default)]
    pub stages: Vec<Stage>,
    /// Node instances
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Node-to-node edges
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Execution layering
    #[serde(default)]
    pub strata: Strata,
}

impl Ir {
    /// Create an empty program
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an IR document
    ///
    /// # Errors
    ///
    /// Returns error if the JSON does not describe an IR
    pub fn from_json(json: &str) -> IrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Get stage by key
    #[must_use]
    pub fn stage(&self, key: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.key == key)
    }

    /// Get node by key
    #[must_use]
    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.key == key)
    }

    /// Stage a node instantiates
    ///
    /// # Errors
    ///
    /// Returns [`IrError::MissingStage`] if the stage key is not in the table
    pub fn stage_of(&self, node: &Node) -> IrResult<&Stage> {
        self.stage(&node.stage).ok_or_else(|| IrError::MissingStage {
            node: node.key.clone(),
            stage: node.stage.clone(),
        })
    }

    /// Edges leaving a node
    pub fn edges_from<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source.node == node)
    }

    /// Edges entering a node
    pub fn edges_into<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target.node == node)
    }

    /// Resolve the type of every channel referenced by any node
    ///
    /// A read channel takes the type of the input it is bound to; a written
    /// channel takes the type of its output. Channels appear in first-reference
    /// order.
    ///
    /// # Errors
    ///
    /// Returns error on a missing stage, unknown parameter, or two bindings
    /// that disagree on a channel's type
    pub fn channel_types(&self) -> IrResult<IndexMap<ChannelKey, DataType>> {
        let mut types: IndexMap<ChannelKey, DataType> = IndexMap::new();
        let mut record = |channel: ChannelKey, data_type: DataType| -> IrResult<()> {
            match types.get(&channel) {
                Some(&existing) if existing != data_type => Err(IrError::ChannelTypeConflict {
                    channel,
                    first: existing,
                    second: data_type,
                }),
                Some(_) => Ok(()),
                None => {
                    types.insert(channel, data_type);
                    Ok(())
                }
            }
        };

        for node in &self.nodes {
            let stage = self.stage_of(node)?;
            for binding in &node.reads {
                let param = stage.param(&binding.param).ok_or_else(|| IrError::UnknownParam {
                    node: node.key.clone(),
                    param: binding.param.clone(),
                })?;
                record(binding.channel, param.data_type)?;
            }
            for binding in &node.writes {
                let output = stage.output(&binding.param).ok_or_else(|| IrError::UnknownParam {
                    node: node.key.clone(),
                    param: binding.param.clone(),
                })?;
                record(binding.channel, output.data_type)?;
            }
        }
        Ok(types)
    }
}
