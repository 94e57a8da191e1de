//! Host imports available to stage modules.
//!
//! A module may import, from the `env` namespace and for each `<t>` in
//! `i32`, `i64`, `f32` and `f64`:
//!
//! - `state_load_<t>(index: i32) -> t`
//! - `state_store_<t>(index: i32, value: t)`
//! - `config_<t>(index: i32) -> t`
//!
//! `index` is the declaration position of the stateful variable or config
//! entry. Accessing an index that does not exist, or with a suffix that does
//! not match the declared type, traps.

use crate::abi::{self, WasmType};
use arc_core::Value;
use wasmtime::{Caller, Linker, StoreLimits, Val};

/// Namespace every host import lives in
pub const HOST_MODULE: &str = "env";

/// Per-instance data visible to host imports
#[derive(Debug, Default)]
pub struct HostState {
    /// Stateful variables, in declaration order
    pub state: Vec<Value>,
    /// Resolved config values, in declaration order
    pub config: Vec<Value>,
    /// Resource limits enforced on the instance
    pub limits: StoreLimits,
}

impl HostState {
    /// Create host data for an instance
    #[must_use]
    pub fn new(config: Vec<Value>, limits: StoreLimits) -> Self {
        Self {
            state: Vec::new(),
            config,
            limits,
        }
    }

    /// Read stateful variable `index` as `ty`
    ///
    /// # Errors
    ///
    /// Returns error if the index is out of range or the type does not match
    pub fn load(&self, index: i32, ty: WasmType) -> wasmtime::Result<Val> {
        let slot = slot(index, self.state.len(), "state variable")?;
        encode_as(&self.state[slot], ty, "state variable", index)
    }

    /// Overwrite stateful variable `index`
    ///
    /// # Errors
    ///
    /// Returns error if the index is out of range or the type does not match
    pub fn store(&mut self, index: i32, val: Val) -> wasmtime::Result<()> {
        let slot = slot(index, self.state.len(), "state variable")?;
        let data_type = self.state[slot].data_type();
        let value = abi::decode(data_type, &val).ok_or_else(|| {
            wasmtime::Error::msg(format!(
                "state variable {index} is {data_type}, cannot store {}",
                WasmType::of_val(&val).map_or("value", |ty| ty.name())
            ))
        })?;
        self.state[slot] = value;
        Ok(())
    }

    /// Read config entry `index` as `ty`
    ///
    /// # Errors
    ///
    /// Returns error if the index is out of range or the type does not match
    pub fn config(&self, index: i32, ty: WasmType) -> wasmtime::Result<Val> {
        let slot = slot(index, self.config.len(), "config entry")?;
        encode_as(&self.config[slot], ty, "config entry", index)
    }
}

fn slot(index: i32, len: usize, what: &str) -> wasmtime::Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|&slot| slot < len)
        .ok_or_else(|| wasmtime::Error::msg(format!("{what} {index} out of range ({len} declared)")))
}

fn encode_as(value: &Value, ty: WasmType, what: &str, index: i32) -> wasmtime::Result<Val> {
    let data_type = value.data_type();
    if WasmType::of(data_type) != Some(ty) {
        return Err(wasmtime::Error::msg(format!(
            "{what} {index} is {data_type}, not readable as {ty}"
        )));
    }
    abi::encode(value)
        .ok_or_else(|| wasmtime::Error::msg(format!("{what} {index} has no wasm encoding")))
}

macro_rules! link_accessors {
    ($linker:expr, $suffix:literal, $rust:ty, $kind:ident, $get:ident) => {{
        $linker.func_wrap(
            HOST_MODULE,
            concat!("state_load_", $suffix),
            |caller: Caller<'_, HostState>, index: i32| -> wasmtime::Result<$rust> {
                let val = caller.data().load(index, WasmType::$kind)?;
                val.$get()
                    .ok_or_else(|| wasmtime::Error::msg("state encoding mismatch"))
            },
        )?;
        $linker.func_wrap(
            HOST_MODULE,
            concat!("state_store_", $suffix),
            |mut caller: Caller<'_, HostState>, index: i32, value: $rust| -> wasmtime::Result<()> {
                caller.data_mut().store(index, Val::from(value))
            },
        )?;
        $linker.func_wrap(
            HOST_MODULE,
            concat!("config_", $suffix),
            |caller: Caller<'_, HostState>, index: i32| -> wasmtime::Result<$rust> {
                let val = caller.data().config(index, WasmType::$kind)?;
                val.$get()
                    .ok_or_else(|| wasmtime::Error::msg("config encoding mismatch"))
            },
        )?;
    }};
}

/// Define every host import on `linker`
///
/// # Errors
///
/// Returns error if an import is already defined
pub fn link(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    link_accessors!(linker, "i32", i32, I32, i32);
    link_accessors!(linker, "i64", i64, I64, i64);
    link_accessors!(linker, "f32", f32, F32, f32);
    link_accessors!(linker, "f64", f64, F64, f64);
    Ok(())
}
