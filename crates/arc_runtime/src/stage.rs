//! The stage execution capability.
//!
//! The runtime never runs stage code itself. Each node gets its own
//! [`StageExecutor`] from a [`StageFactory`], and the scheduler calls it once
//! per aligned [`Sample`]. The sandbox backend implements these traits; tests
//! use [`FnFactory`] to plug in closures.

use arc_core::Value;
use arc_ir::{Node, Stage};
use indexmap::IndexMap;
use std::sync::Arc;

/// Stateful variable name → current value
pub type StateVars = IndexMap<String, Value>;

/// Config entry name → value
pub type ConfigVars = IndexMap<String, Value>;

/// Error returned by a stage implementation
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The stage reported a failure
    #[error("{0}")]
    Failed(String),

    /// The backend running the stage failed
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StageError {
    /// Wrap a backend error
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// One aligned set of input values, positional by stage parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample {
    values: Vec<Value>,
}

impl Sample {
    /// Create a sample from values in parameter order
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Value of parameter `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// All values in parameter order
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the sample has no values
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything a stage sees for one call
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Stage definition
    pub stage: &'a Stage,
    /// Key of the node being executed
    pub node: &'a str,
    /// Node config values
    pub config: &'a ConfigVars,
    /// Stateful variables as of this call
    pub state: &'a StateVars,
    /// Aligned inputs
    pub sample: &'a Sample,
    /// Position of the sample within this execution
    pub index: usize,
}

impl Invocation<'_> {
    /// Input value by parameter name
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.stage
            .param_index(name)
            .and_then(|i| self.sample.get(i))
    }

    /// Config value by name, falling back to the declared default
    #[must_use]
    pub fn config(&self, name: &str) -> Option<Value> {
        self.config.get(name).cloned().or_else(|| {
            self.stage
                .config
                .iter()
                .find(|c| c.name == name)
                .and_then(|c| c.fallback())
        })
    }

    /// Stateful variable by name
    #[must_use]
    pub fn state_var(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }
}

/// Result of one stage call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageOutput {
    /// Output values by output name
    pub outputs: IndexMap<String, Value>,
    /// Replacement stateful variables, for stateful stages
    pub state: Option<StateVars>,
}

impl StageOutput {
    /// Create an empty output
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an output value
    #[must_use]
    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }

    /// Set the updated stateful variables
    #[must_use]
    pub fn with_state(mut self, state: StateVars) -> Self {
        self.state = Some(state);
        self
    }
}

/// A per-node stage instance
pub trait StageExecutor: Send {
    /// Run the stage for one sample
    ///
    /// # Errors
    ///
    /// Returns error if the stage fails for this sample
    fn invoke(&mut self, invocation: Invocation<'_>) -> Result<StageOutput, StageError>;

    /// Release resources held by the instance
    ///
    /// # Errors
    ///
    /// Returns error if teardown fails
    fn close(&mut self) -> Result<(), StageError> {
        Ok(())
    }
}

/// Creates one [`StageExecutor`] per node at runtime construction
pub trait StageFactory {
    /// Instantiate `stage` for `node`
    ///
    /// # Errors
    ///
    /// Returns error if the stage cannot be instantiated
    fn instantiate(&self, stage: &Stage, node: &Node) -> Result<Box<dyn StageExecutor>, StageError>;
}

type StageFn = dyn Fn(&Invocation<'_>) -> Result<StageOutput, StageError> + Send + Sync;

/// A [`StageFactory`] backed by closures, keyed by stage key
#[derive(Default, Clone)]
pub struct FnFactory {
    stages: IndexMap<String, Arc<StageFn>>,
}

impl FnFactory {
    /// Create a factory with no stages
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the implementation of a stage
    #[must_use]
    pub fn with_stage<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<StageOutput, StageError> + Send + Sync + 'static,
    {
        self.stages.insert(key.into(), Arc::new(f));
        self
    }
}

impl std::fmt::Debug for FnFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactory")
            .field("stages", &self.stages.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StageFactory for FnFactory {
    fn instantiate(&self, stage: &Stage, _node: &Node) -> Result<Box<dyn StageExecutor>, StageError> {
        let f = self
            .stages
            .get(&stage.key)
            .ok_or_else(|| StageError::Failed(format!("No implementation for stage '{}'", stage.key)))?;
        Ok(Box::new(FnExecutor { f: Arc::clone(f) }))
    }
}

struct FnExecutor {
    f: Arc<StageFn>,
}

impl StageExecutor for FnExecutor {
    fn invoke(&mut self, invocation: Invocation<'_>) -> Result<StageOutput, StageError> {
        (self.f)(&invocation)
    }
}
