//! Arc IR
//!
//! The compiled dataflow graph the runtime executes: stage definitions,
//! node instances with their channel wiring, edges between node parameters,
//! and the stratum layering produced by the compiler.
//!
//! The runtime treats an [`Ir`] as an immutable, already analyzed artifact.
//! [`Ir::validate`] only checks the structural contract the runtime relies on.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod graph;
pub mod stage;
pub mod strata;
pub mod validate;

pub use error::{IrError, IrResult};
pub use graph::{Binding, Edge, Handle, Ir, Node};
pub use stage::{Module, Param, Stage};
pub use strata::Strata;
