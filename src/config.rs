//! Activation configuration

use crate::catalog::AllowList;

/// Options captured by the wrappers an activation installs.
///
/// Every toggle is independent. Suspend/resume brings back the wrappers with
/// whatever configuration they captured at install time; changing options
/// requires a disable and a fresh enable.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Also surface internally-triggered operations (for example a copy)
    pub verbose: bool,
    /// Compute and persist statistics but emit nothing to the reporter
    pub silent: bool,
    /// Record full call arguments instead of just the operation name
    pub full_signature: bool,
    /// Allow a deep copy for the before-snapshot (high-fidelity capture)
    pub copy_ok: bool,
    /// Measure container memory around each call
    pub calculate_memory: bool,
    /// Install the supplementary operation set as well
    pub extras: bool,
    /// Override the stock catalogue; `None` uses the default allow-list
    pub allow_list: Option<AllowList>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            silent: false,
            full_signature: true,
            copy_ok: true,
            calculate_memory: false,
            extras: true,
            allow_list: None,
        }
    }
}

impl TraceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    pub fn silent(mut self, on: bool) -> Self {
        self.silent = on;
        self
    }

    pub fn full_signature(mut self, on: bool) -> Self {
        self.full_signature = on;
        self
    }

    pub fn copy_ok(mut self, on: bool) -> Self {
        self.copy_ok = on;
        self
    }

    pub fn calculate_memory(mut self, on: bool) -> Self {
        self.calculate_memory = on;
        self
    }

    pub fn extras(mut self, on: bool) -> Self {
        self.extras = on;
        self
    }

    pub fn allow_list(mut self, list: AllowList) -> Self {
        self.allow_list = Some(list);
        self
    }
}
