//! Arc Runtime
//!
//! Reactive execution of compiled Arc graphs. Each call to
//! [`Runtime::next`] ingests one frame of telemetry, runs the affected nodes
//! stratum by stratum, and reclaims series every subscriber has consumed.
//!
//! Stage code runs behind the [`StageExecutor`] capability, so the sandbox
//! technology is swappable; [`FnFactory`] plugs in closures for tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod channel;
pub mod config;
pub mod engine;
pub mod error;
mod executor;
mod gc;
pub mod monitor;
mod node;
mod scheduler;
pub mod stage;
pub mod view;

pub use config::{CommitPolicy, RuntimeConfig};
pub use engine::Runtime;
pub use error::{NodeError, RuntimeError, RuntimeResult};
pub use monitor::Stats;
pub use stage::{
    ConfigVars, FnFactory, Invocation, Sample, StageError, StageExecutor, StageFactory,
    StageOutput, StateVars,
};
pub use view::{ChannelView, NodeView};

pub use tokio_util::sync::CancellationToken;
