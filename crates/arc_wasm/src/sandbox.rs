//! Sandboxed stage execution on wasmtime.

use crate::abi::{self, WasmType};
use crate::compile::{CompiledStage, WasmCompiler};
use crate::fuel::FuelMeter;
use crate::host::{self, HostState};
use arc_core::{DataType, Value};
use arc_ir::{Node, Stage};
use arc_runtime::{Invocation, StageError, StageExecutor, StageFactory, StageOutput, StateVars};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, trace, warn};
use wasmtime::{Engine, Func, Linker, Store, StoreLimitsBuilder, Trap, Val};

/// Sandbox configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Fuel granted to each stage call
    pub max_fuel: u64,
    /// Linear memory limit per instance, in bytes
    pub memory_limit: u64,
    /// Largest accepted module, in bytes
    pub max_module_size: usize,
}

impl SandboxConfig {
    /// Create a sandbox config with default limits
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_fuel: 10_000_000,
            memory_limit: 16 * 1024 * 1024, // 16MB
            max_module_size: 10 * 1024 * 1024,
        }
    }

    /// Set fuel per call
    #[must_use]
    pub fn with_max_fuel(mut self, fuel: u64) -> Self {
        self.max_fuel = fuel;
        self
    }

    /// Set memory limit
    #[must_use]
    pub fn with_memory_limit(mut self, limit: u64) -> Self {
        self.memory_limit = limit;
        self
    }

    /// Set module size limit
    #[must_use]
    pub fn with_max_module_size(mut self, size: usize) -> Self {
        self.max_module_size = size;
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Sandbox errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    /// The wasmtime engine could not be set up
    #[error("Engine setup failed: {0}")]
    Engine(String),

    /// The stage carries no module
    #[error("Stage '{stage}' has no module")]
    MissingModule { stage: String },

    /// The module exceeds the size limit
    #[error("Module for stage '{stage}' is {size} bytes, limit {limit}")]
    ModuleTooLarge {
        stage: String,
        size: usize,
        limit: usize,
    },

    /// The module failed to compile
    #[error("Module for stage '{stage}' failed to compile: {message}")]
    Compile { stage: String, message: String },

    /// The module does not export a function named after the stage
    #[error("Module for stage '{stage}' does not export function '{stage}'")]
    MissingExport { stage: String },

    /// The exported function does not match the declared types
    #[error("Stage '{stage}' expects signature {expected}, module exports {actual}")]
    Signature {
        stage: String,
        expected: String,
        actual: String,
    },

    /// A declared type cannot cross the wasm boundary
    #[error("Stage '{stage}' declares '{name}' as {data_type}, which has no wasm encoding")]
    UnsupportedType {
        stage: String,
        name: String,
        data_type: DataType,
    },

    /// A config entry has neither a node value nor a default
    #[error("Node '{node}' has no value for config '{name}'")]
    MissingConfig { node: String, name: String },

    /// Instantiation failed, e.g. unresolved imports or memory limits
    #[error("Instantiating stage '{stage}' for node '{node}' failed: {message}")]
    Instantiate {
        stage: String,
        node: String,
        message: String,
    },

    /// A value does not match its declared type
    #[error("Stage '{stage}' value '{name}' is not a valid {data_type}")]
    ValueType {
        stage: String,
        name: String,
        data_type: DataType,
    },

    /// A stateful variable has no value
    #[error("Stage '{stage}' has no value for stateful variable '{name}'")]
    MissingState { stage: String, name: String },

    /// The call exhausted its fuel
    #[error("Stage '{stage}' ran out of fuel ({budget} per call)")]
    OutOfFuel { stage: String, budget: u64 },

    /// The call trapped
    #[error("Stage '{stage}' trapped: {message}")]
    Trap { stage: String, message: String },
}

impl From<SandboxError> for StageError {
    fn from(err: SandboxError) -> Self {
        StageError::backend(err)
    }
}

/// Creates one wasm instance per node
pub struct WasmFactory {
    config: SandboxConfig,
    engine: Engine,
    compiler: WasmCompiler,
    linker: Linker<HostState>,
    compiled: Mutex<IndexMap<String, CompiledStage>>,
}

impl WasmFactory {
    /// Create a factory with a fuel-metering engine
    ///
    /// # Errors
    ///
    /// Returns error if the engine or host imports cannot be set up
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        let mut engine_config = wasmtime::Config::new();
        engine_config.consume_fuel(true);
        let engine =
            Engine::new(&engine_config).map_err(|e| SandboxError::Engine(format!("{e:#}")))?;
        let mut linker = Linker::new(&engine);
        host::link(&mut linker).map_err(|e| SandboxError::Engine(format!("{e:#}")))?;
        Ok(Self {
            compiler: WasmCompiler::new(engine.clone(), config.max_module_size),
            config,
            engine,
            linker,
            compiled: Mutex::new(IndexMap::new()),
        })
    }

    /// Sandbox configuration
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Number of stage modules compiled so far
    #[must_use]
    pub fn compiled_stages(&self) -> usize {
        self.compiled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Compile a stage module once, sharing it across nodes
    fn compile(&self, stage: &Stage) -> Result<CompiledStage, SandboxError> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = compiled.get(&stage.key) {
            return Ok(hit.clone());
        }
        let fresh = self.compiler.compile(stage)?;
        compiled.insert(stage.key.clone(), fresh.clone());
        Ok(fresh)
    }

    fn instantiate_node(&self, stage: &Stage, node: &Node) -> Result<WasmExecutor, SandboxError> {
        let compiled = self.compile(stage)?;
        let config = resolve_config(stage, node)?;

        let limits = StoreLimitsBuilder::new()
            .memory_size(usize::try_from(self.config.memory_limit).unwrap_or(usize::MAX))
            .build();
        let mut store = Store::new(&self.engine, HostState::new(config, limits));
        store.limiter(|host| &mut host.limits);

        let instantiate_err = |e: wasmtime::Error| SandboxError::Instantiate {
            stage: stage.key.clone(),
            node: node.key.clone(),
            message: format!("{e:#}"),
        };
        let fuel = FuelMeter::new(self.config.max_fuel);
        fuel.refill(&mut store).map_err(instantiate_err)?;
        let instance = self
            .linker
            .instantiate(&mut store, &compiled.module)
            .map_err(instantiate_err)?;
        let func = instance
            .get_func(&mut store, &stage.key)
            .ok_or_else(|| SandboxError::MissingExport {
                stage: stage.key.clone(),
            })?;

        debug!(stage = %stage.key, node = %node.key, "instantiated stage module");
        Ok(WasmExecutor {
            stage: stage.key.clone(),
            node: node.key.clone(),
            store,
            func,
            results: compiled.results,
            fuel,
        })
    }
}

impl std::fmt::Debug for WasmFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmFactory")
            .field("config", &self.config)
            .field("compiled_stages", &self.compiled_stages())
            .finish()
    }
}

impl StageFactory for WasmFactory {
    fn instantiate(&self, stage: &Stage, node: &Node) -> Result<Box<dyn StageExecutor>, StageError> {
        Ok(Box::new(self.instantiate_node(stage, node)?))
    }
}

/// Config values in declaration order: node value, else default
fn resolve_config(stage: &Stage, node: &Node) -> Result<Vec<Value>, SandboxError> {
    stage
        .config
        .iter()
        .map(|entry| {
            node.config
                .get(&entry.name)
                .cloned()
                .or_else(|| entry.fallback())
                .ok_or_else(|| SandboxError::MissingConfig {
                    node: node.key.clone(),
                    name: entry.name.clone(),
                })
        })
        .collect()
}

/// A stage instance bound to one node
pub struct WasmExecutor {
    stage: String,
    node: String,
    store: Store<HostState>,
    func: Func,
    results: Vec<WasmType>,
    fuel: FuelMeter,
}

impl WasmExecutor {
    /// Fuel accounting for this instance
    #[must_use]
    pub fn fuel(&self) -> &FuelMeter {
        &self.fuel
    }

    fn call(&mut self, invocation: &Invocation<'_>) -> Result<StageOutput, SandboxError> {
        let stage = invocation.stage;

        self.store.data_mut().state = stage
            .stateful
            .iter()
            .map(|var| {
                invocation
                    .state_var(&var.name)
                    .cloned()
                    .or_else(|| var.fallback())
                    .ok_or_else(|| SandboxError::MissingState {
                        stage: stage.key.clone(),
                        name: var.name.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;

        let args = stage
            .params
            .iter()
            .zip(invocation.sample.values())
            .map(|(param, value)| {
                abi::encode(value)
                    .filter(|_| value.data_type() == param.data_type)
                    .ok_or_else(|| SandboxError::ValueType {
                        stage: stage.key.clone(),
                        name: param.name.clone(),
                        data_type: param.data_type,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut results: Vec<Val> = self.results.iter().map(WasmType::zero).collect();

        let engine_err = |e: wasmtime::Error| SandboxError::Engine(format!("{e:#}"));
        self.fuel.refill(&mut self.store).map_err(engine_err)?;
        let outcome = self.func.call(&mut self.store, &args, &mut results);
        let used = self.fuel.record(&self.store).map_err(engine_err)?;
        outcome.map_err(|e| {
            if matches!(e.downcast_ref::<Trap>(), Some(Trap::OutOfFuel)) {
                SandboxError::OutOfFuel {
                    stage: stage.key.clone(),
                    budget: self.fuel.budget(),
                }
            } else {
                SandboxError::Trap {
                    stage: stage.key.clone(),
                    message: format!("{e:#}"),
                }
            }
        })?;
        trace!(node = %self.node, sample = invocation.index, fuel = used, "stage call");

        let mut output = StageOutput::new();
        for (param, val) in stage.outputs.iter().zip(&results) {
            let value = abi::decode(param.data_type, val).ok_or_else(|| SandboxError::ValueType {
                stage: stage.key.clone(),
                name: param.name.clone(),
                data_type: param.data_type,
            })?;
            output.outputs.insert(param.name.clone(), value);
        }
        if stage.is_stateful() {
            let state: StateVars = stage
                .stateful
                .iter()
                .map(|var| var.name.clone())
                .zip(self.store.data().state.iter().cloned())
                .collect();
            output = output.with_state(state);
        }
        Ok(output)
    }
}

impl std::fmt::Debug for WasmExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmExecutor")
            .field("stage", &self.stage)
            .field("node", &self.node)
            .field("fuel", &self.fuel)
            .finish()
    }
}

impl StageExecutor for WasmExecutor {
    fn invoke(&mut self, invocation: Invocation<'_>) -> Result<StageOutput, StageError> {
        self.call(&invocation).map_err(|err| {
            warn!(node = %self.node, sample = invocation.index, error = %err, "stage call failed");
            StageError::from(err)
        })
    }

    fn close(&mut self) -> Result<(), StageError> {
        debug!(
            node = %self.node,
            calls = self.fuel.calls(),
            fuel = self.fuel.total_consumed(),
            "closing stage instance"
        );
        Ok(())
    }
}
