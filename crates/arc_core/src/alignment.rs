//! Sample alignment.
//!
//! Alignment is a logical sample counter. Wall clock time never orders samples.

use serde::{Deserialize, Serialize};

/// Alignment - strictly increasing logical sample index within a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alignment(u64);

impl Alignment {
    /// Smallest alignment
    pub const MIN: Self = Self(0);

    /// Create a new alignment at zero
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from raw value
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get raw value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The alignment immediately after this one
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Offset this alignment by `n` samples
    #[must_use]
    pub fn checked_add(&self, n: u64) -> Option<Self> {
        self.0.checked_add(n).map(Self)
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "A{}", self.0)
    }
}

impl From<u64> for Alignment {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_zero() {
        assert_eq!(Alignment::zero().as_u64(), 0);
        assert_eq!(Alignment::zero(), Alignment::MIN);
    }

    #[test]
    fn test_alignment_next() {
        assert_eq!(Alignment::from_raw(4).next(), Some(Alignment::from_raw(5)));
        assert_eq!(Alignment::from_raw(u64::MAX).next(), None);
    }

    #[test]
    fn test_alignment_display() {
        assert_eq!(format!("{}", Alignment::from_raw(12)), "A12");
    }
}
