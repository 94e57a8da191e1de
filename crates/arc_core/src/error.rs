//! Core error types for Arc.

use crate::alignment::Alignment;
use crate::id::ChannelKey;
use crate::value::DataType;
use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value does not match the declared data type of its container
    TypeMismatch {
        /// Declared type
        expected: DataType,
        /// Type actually supplied
        actual: DataType,
    },

    /// A JSON literal could not be read as the declared type
    InvalidLiteral {
        /// Declared type
        data_type: DataType,
        /// Offending literal
        literal: String,
    },

    /// A channel appears twice in one frame
    DuplicateChannel {
        /// Repeated channel
        key: ChannelKey,
    },

    /// Two series cannot be joined without a gap or overlap
    NonContiguous {
        /// Alignment the next sample had to start at
        expected: Option<Alignment>,
        /// Alignment it actually started at
        actual: Alignment,
    },

    /// Series alignment range does not fit in the counter
    AlignmentOverflow,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            Self::InvalidLiteral { data_type, literal } => {
                write!(f, "Invalid {} literal: {}", data_type, literal)
            }
            Self::DuplicateChannel { key } => write!(f, "Duplicate channel in frame: {}", key),
            Self::NonContiguous { expected, actual } => match expected {
                Some(expected) => {
                    write!(f, "Series not contiguous: expected {}, got {}", expected, actual)
                }
                None => write!(f, "Series not contiguous: no alignment follows {}", actual),
            },
            Self::AlignmentOverflow => write!(f, "Alignment overflow"),
        }
    }
}

impl std::error::Error for CoreError {}
