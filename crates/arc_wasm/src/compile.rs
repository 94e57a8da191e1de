//! Stage module compilation and validation.

use crate::abi::{self, WasmType};
use crate::sandbox::SandboxError;
use arc_ir::{Param, Stage};
use tracing::debug;
use wasmtime::{Engine, ExternType, Module, ValType};

/// A stage module checked against its declared signature
#[derive(Clone)]
pub struct CompiledStage {
    /// Compiled module
    pub module: Module,
    /// Argument types, in parameter order
    pub params: Vec<WasmType>,
    /// Result types, in output order
    pub results: Vec<WasmType>,
}

/// Compiles stage modules for one engine
#[derive(Clone)]
pub struct WasmCompiler {
    engine: Engine,
    max_module_size: usize,
}

impl std::fmt::Debug for CompiledStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledStage")
            .field("params", &self.params)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for WasmCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmCompiler")
            .field("max_module_size", &self.max_module_size)
            .finish_non_exhaustive()
    }
}

impl WasmCompiler {
    /// Create a compiler for `engine`
    #[must_use]
    pub fn new(engine: Engine, max_module_size: usize) -> Self {
        Self {
            engine,
            max_module_size,
        }
    }

    /// Maximum accepted module size in bytes
    #[must_use]
    pub fn max_module_size(&self) -> usize {
        self.max_module_size
    }

    /// Compile `stage`'s module and check its exported function
    ///
    /// # Errors
    ///
    /// Returns error if the stage has no module, the module is too large or
    /// invalid, a declared type has no wasm encoding, or the export is
    /// missing or has the wrong signature
    pub fn compile(&self, stage: &Stage) -> Result<CompiledStage, SandboxError> {
        let bytes = stage
            .module
            .as_ref()
            .ok_or_else(|| SandboxError::MissingModule {
                stage: stage.key.clone(),
            })?;
        if bytes.len() > self.max_module_size {
            return Err(SandboxError::ModuleTooLarge {
                stage: stage.key.clone(),
                size: bytes.len(),
                limit: self.max_module_size,
            });
        }

        let params = encodings(stage, &stage.params)?;
        let results = encodings(stage, &stage.outputs)?;
        encodings(stage, &stage.stateful)?;
        encodings(stage, &stage.config)?;

        let module =
            Module::new(&self.engine, bytes.as_bytes()).map_err(|e| SandboxError::Compile {
                stage: stage.key.clone(),
                message: format!("{e:#}"),
            })?;

        let Some(ExternType::Func(ty)) = module.get_export(&stage.key) else {
            return Err(SandboxError::MissingExport {
                stage: stage.key.clone(),
            });
        };
        let actual_params: Vec<_> = ty.params().collect();
        let actual_results: Vec<_> = ty.results().collect();
        if !matches_types(&actual_params, &params) || !matches_types(&actual_results, &results) {
            return Err(SandboxError::Signature {
                stage: stage.key.clone(),
                expected: abi::signature(&params, &results),
                actual: format!(
                    "({}) -> ({})",
                    type_names(&actual_params),
                    type_names(&actual_results)
                ),
            });
        }

        debug!(stage = %stage.key, size = bytes.len(), "compiled stage module");
        Ok(CompiledStage {
            module,
            params,
            results,
        })
    }
}

fn matches_types(actual: &[ValType], expected: &[WasmType]) -> bool {
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| WasmType::from_val_type(a) == Some(*e))
}

fn type_names(types: &[ValType]) -> String {
    types
        .iter()
        .map(|t| WasmType::from_val_type(t).map_or_else(|| format!("{t:?}"), |w| w.name().to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn encodings(stage: &Stage, params: &[Param]) -> Result<Vec<WasmType>, SandboxError> {
    params
        .iter()
        .map(|param| {
            WasmType::of(param.data_type).ok_or_else(|| SandboxError::UnsupportedType {
                stage: stage.key.clone(),
                name: param.name.clone(),
                data_type: param.data_type,
            })
        })
        .collect()
}
