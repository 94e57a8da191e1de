//! Runtime errors.

use crate::stage::StageError;
use arc_core::{ChannelKey, CoreError, DataType};
use arc_ir::IrError;

/// Runtime result type
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by [`Runtime`](crate::Runtime) construction and frame processing
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A node references a stage that is not in the stage table
    #[error("Node '{node}' references missing stage '{stage}'")]
    MissingStage { node: String, stage: String },

    /// The graph failed structural validation
    #[error("Invalid IR: {0}")]
    InvalidIr(#[source] IrError),

    /// A stage implementation could not be instantiated for a node
    #[error("Failed to instantiate node '{node}'")]
    Instantiate {
        node: String,
        #[source]
        source: StageError,
    },

    /// An ingested series does not match its channel's type
    #[error("Channel {channel} expects {expected}, frame carried {actual}")]
    ChannelType {
        channel: ChannelKey,
        expected: DataType,
        actual: DataType,
    },

    /// A node failed while executing
    #[error("Node '{node}' failed")]
    Node {
        node: String,
        #[source]
        source: NodeError,
    },

    /// Frame processing was cancelled between node executions
    #[error("Frame processing cancelled")]
    Cancelled,

    /// A node's stage instance failed to release its resources
    #[error("Failed to close node '{node}'")]
    Close {
        node: String,
        #[source]
        source: StageError,
    },
}

impl From<IrError> for RuntimeError {
    fn from(err: IrError) -> Self {
        match err {
            IrError::MissingStage { node, stage } => Self::MissingStage { node, stage },
            other => Self::InvalidIr(other),
        }
    }
}

impl RuntimeError {
    /// Key of the node the error is attributed to, if any
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::MissingStage { node, .. }
            | Self::Instantiate { node, .. }
            | Self::Node { node, .. }
            | Self::Close { node, .. } => Some(node.as_str()),
            _ => None,
        }
    }
}

/// Failures inside a single node execution
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The stage function failed for one sample
    #[error("Invocation failed at sample {sample}")]
    Invoke {
        sample: usize,
        #[source]
        source: StageError,
    },

    /// The stage did not produce an output that an edge or channel consumes
    #[error("Output '{param}' missing at sample {sample}")]
    MissingOutput { param: String, sample: usize },

    /// The stage produced an output of the wrong type
    #[error("Output '{param}' should be {expected}, got {actual}")]
    OutputType {
        param: String,
        expected: DataType,
        actual: DataType,
    },

    /// An input parameter has no value and no type to derive one from
    #[error("Parameter '{param}' has no value")]
    NoValue { param: String },

    /// A channel write could not be assembled into a series
    #[error("Write to channel {channel} failed")]
    Write {
        channel: ChannelKey,
        #[source]
        source: CoreError,
    },
}
