//! Arc WASM Sandbox
//!
//! Runs compiled stage modules on wasmtime with per-call fuel limits,
//! per-instance memory limits, and host imports for stateful variables
//! and node config.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
pub mod compile;
pub mod fuel;
pub mod host;
pub mod sandbox;

pub use abi::WasmType;
pub use compile::{CompiledStage, WasmCompiler};
pub use fuel::FuelMeter;
pub use host::{HostState, HOST_MODULE};
pub use sandbox::{SandboxConfig, SandboxError, WasmExecutor, WasmFactory};
