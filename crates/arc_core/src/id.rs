//! Identifiers for Arc entities.

use serde::{Deserialize, Serialize};

/// Channel key - identifies a telemetry channel
///
/// Keys are assigned by the storage engine; the runtime treats them as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKey(u32);

impl ChannelKey {
    /// Create a key from its raw value
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get raw value
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

impl From<u32> for ChannelKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
