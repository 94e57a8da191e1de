//! Fuel metering for stage calls.
//!
//! Every call starts with a full tank, so one runaway sample cannot starve
//! the samples after it.

use serde::Serialize;
use wasmtime::Store;

/// Per-call fuel budget and consumption counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuelMeter {
    budget: u64,
    last: u64,
    total: u64,
    calls: u64,
}

impl FuelMeter {
    /// Create a meter refilling to `budget` before each call
    #[must_use]
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            last: 0,
            total: 0,
            calls: 0,
        }
    }

    /// Fuel granted per call
    #[must_use]
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Top the store up to the full budget
    ///
    /// # Errors
    ///
    /// Returns error if the store's engine does not meter fuel
    pub fn refill<T>(&self, store: &mut Store<T>) -> wasmtime::Result<()> {
        store.set_fuel(self.budget)
    }

    /// Record what the last call burned
    ///
    /// # Errors
    ///
    /// Returns error if the store's engine does not meter fuel
    pub fn record<T>(&mut self, store: &Store<T>) -> wasmtime::Result<u64> {
        let used = self.budget.saturating_sub(store.get_fuel()?);
        self.last = used;
        self.total = self.total.saturating_add(used);
        self.calls += 1;
        Ok(used)
    }

    /// Fuel consumed by the most recent call
    #[must_use]
    pub fn last_consumed(&self) -> u64 {
        self.last
    }

    /// Fuel consumed across all calls
    #[must_use]
    pub fn total_consumed(&self) -> u64 {
        self.total
    }

    /// Number of recorded calls
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls
    }
}
