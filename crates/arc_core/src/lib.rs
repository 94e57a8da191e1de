//! Arc Core Types
//!
//! This crate contains pure types and logic with no I/O.
//! Everything the runtime moves between channels and nodes is defined here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alignment;
pub mod error;
pub mod frame;
pub mod id;
pub mod series;
pub mod value;

// Re-exports
pub use alignment::Alignment;
pub use error::{CoreError, CoreResult};
pub use frame::{Frame, FrameEntry};
pub use id::ChannelKey;
pub use series::Series;
pub use value::{DataType, Value};
