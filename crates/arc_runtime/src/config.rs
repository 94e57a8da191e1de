//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// When the effects of a node execution become visible
///
/// Under either policy a failing node's watermarks advance past the samples
/// it collected, so the samples that made it fail are not delivered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPolicy {
    /// Commit after each node; a failure leaves earlier nodes of the frame applied
    Node,
    /// Commit after every node of a stratum succeeds; the other nodes of a
    /// failed stratum leave no watermark, state or output behind
    #[default]
    Stratum,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Commit granularity
    pub commit: CommitPolicy,
    /// Series kept for channels nothing subscribes to
    pub retain_unsubscribed: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            commit: CommitPolicy::Stratum,
            retain_unsubscribed: 1,
        }
    }
}

impl RuntimeConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set commit policy
    #[must_use]
    pub fn with_commit(mut self, commit: CommitPolicy) -> Self {
        self.commit = commit;
        self
    }

    /// Set how many series to keep on unsubscribed channels
    #[must_use]
    pub fn with_retain_unsubscribed(mut self, count: usize) -> Self {
        self.retain_unsubscribed = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.commit, CommitPolicy::Stratum);
        assert_eq!(config.retain_unsubscribed, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RuntimeConfig = serde_json::from_str(r#"{"commit": "node"}"#).unwrap();
        assert_eq!(config, RuntimeConfig::new().with_commit(CommitPolicy::Node));
    }
}
