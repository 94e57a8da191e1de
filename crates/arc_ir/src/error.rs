//! IR errors.

use arc_core::{ChannelKey, DataType};

/// IR result type
pub type IrResult<T> = Result<T, IrError>;

/// Structural problems with a compiled graph
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    /// A node references a stage that is not in the stage table
    #[error("Node '{node}' references missing stage '{stage}'")]
    MissingStage { node: String, stage: String },

    /// Two nodes share a key
    #[error("Duplicate node key '{0}'")]
    DuplicateNode(String),

    /// Two stages share a key
    #[error("Duplicate stage key '{0}'")]
    DuplicateStage(String),

    /// An edge or stratum entry names a node that does not exist
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// A binding or edge names a parameter the stage does not declare
    #[error("Node '{node}' has no parameter '{param}'")]
    UnknownParam { node: String, param: String },

    /// A parameter is fed by more than one channel or edge
    #[error("Parameter '{param}' of node '{node}' has more than one source")]
    DuplicateSource { node: String, param: String },

    /// A node reads or writes the same channel twice
    #[error("Node '{node}' binds channel {channel} more than once")]
    DuplicateChannel { node: String, channel: ChannelKey },

    /// Parameters bound to one channel disagree on its type
    #[error("Channel {channel} is bound as both {first} and {second}")]
    ChannelTypeConflict {
        channel: ChannelKey,
        first: DataType,
        second: DataType,
    },

    /// A parameter, output or config entry uses the unit type
    #[error("Parameter '{param}' of stage '{stage}' has no concrete type")]
    UnitParam { stage: String, param: String },

    /// A node has no stratum assignment
    #[error("Node '{0}' has no stratum")]
    MissingStratum(String),

    /// An edge does not go from a lower stratum to a strictly higher one
    #[error("Edge '{source_node}' -> '{target_node}' does not ascend strata ({source_level} -> {target_level})")]
    EdgeNotAscending {
        source_node: String,
        target_node: String,
        source_level: u32,
        target_level: u32,
    },

    /// The declared maximum stratum disagrees with the assignments
    #[error("Declared max stratum {declared} but highest assigned is {actual}")]
    StrataMaxMismatch { declared: u32, actual: u32 },

    /// A config value does not match its declared type
    #[error("Config '{key}' of node '{node}' should be {expected}")]
    ConfigType {
        node: String,
        key: String,
        expected: DataType,
    },

    /// The IR document could not be decoded
    #[error("Invalid IR encoding: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for IrError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
