//! Stage definitions.
//!
//! A stage is the compiled form of an Arc function: its input parameters,
//! outputs, config schema, stateful-variable schema and the sandbox module
//! that implements it.

use arc_core::{DataType, Value};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A named, typed slot: input, output, config entry or stateful variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub data_type: DataType,
    /// Value used when no input has arrived yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Param {
    /// Create a parameter without a default
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: None,
        }
    }

    /// Set the default value
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Value to use before any real sample exists: the declared default,
    /// otherwise the type's zero value
    #[must_use]
    pub fn fallback(&self) -> Option<Value> {
        self.default.clone().or_else(|| self.data_type.zero_value())
    }
}

/// Compiled sandbox module bytes, hex encoded in IR documents
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module(Vec<u8>);

impl Module {
    /// Wrap raw module bytes
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the module is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Module {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Module {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A stage definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage key, also the exported function name in its module
    pub key: String,
    /// Input parameters, in call order
    #[serde(default)]
    pub params: Vec<Param>,
    /// Outputs, in result order
    #[serde(default)]
    pub outputs: Vec<Param>,
    /// Config schema
    #[serde(default)]
    pub config: Vec<Param>,
    /// Stateful variables persisted across invocations
    #[serde(default)]
    pub stateful: Vec<Param>,
    /// Compiled module, if the stage runs in the sandbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<Module>,
}

impl Stage {
    /// Create a stage with no parameters
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: Vec::new(),
            outputs: Vec::new(),
            config: Vec::new(),
            stateful: Vec::new(),
            module: None,
        }
    }

    /// Add an input parameter
    #[must_use]
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Add an output
    #[must_use]
    pub fn with_output(mut self, param: Param) -> Self {
        self.outputs.push(param);
        self
    }

    /// Add a config entry
    #[must_use]
    pub fn with_config(mut self, param: Param) -> Self {
        self.config.push(param);
        self
    }

    /// Add a stateful variable
    #[must_use]
    pub fn with_stateful(mut self, param: Param) -> Self {
        self.stateful.push(param);
        self
    }

    /// Attach a compiled module
    #[must_use]
    pub fn with_module(mut self, module: Module) -> Self {
        self.module = Some(module);
        self
    }

    /// Position of an input parameter
    #[must_use]
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Position of an output
    #[must_use]
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }

    /// Position of a stateful variable
    #[must_use]
    pub fn stateful_index(&self, name: &str) -> Option<usize> {
        self.stateful.iter().position(|p| p.name == name)
    }

    /// Look up an input parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Look up an output
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&Param> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Whether invocations carry stateful variables
    #[must_use]
    pub fn is_stateful(&self) -> bool {
        !self.stateful.is_empty()
    }
}
