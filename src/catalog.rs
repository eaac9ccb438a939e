//! Default allow-list of operations eligible for interception
//!
//! The catalogue is configuration, not mechanism: activation consumes an
//! [`AllowList`] and installs wrappers for the entries it names. A custom
//! list may be passed through `TraceConfig::allow_list`; these tables are
//! only the stock selection.

/// Core frame operations instrumented by default
pub const FRAME_OPS: &[&str] = &[
    "query",
    "drop",
    "dropna",
    "fillna",
    "assign",
    "rename",
    "astype",
    "sort_values",
    "head",
    "tail",
    "sample",
];

/// Core series operations instrumented by default
pub const SERIES_OPS: &[&str] = &["head", "tail", "dropna", "fillna", "sort_values"];

/// Internally-triggered operations, reported only under `verbose`
pub const FRAME_VERBOSE_OPS: &[&str] = &["copy"];
pub const SERIES_VERBOSE_OPS: &[&str] = &["copy"];

/// Supplementary cosmetic operations, installed only when `extras` is set
pub const FRAME_EXTRA_OPS: &[&str] = &["describe"];
pub const SERIES_EXTRA_OPS: &[&str] = &["nlargest"];

/// One allow-list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpSpec {
    pub name: String,
    /// Report only when the `verbose` option is set; statistics are still
    /// computed and persisted either way.
    pub verbose_only: bool,
}

impl OpSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            verbose_only: false,
        }
    }

    pub fn verbose_only(name: &str) -> Self {
        Self {
            name: name.to_string(),
            verbose_only: true,
        }
    }
}

/// The operations an activation installs, per target kind
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowList {
    pub frame: Vec<OpSpec>,
    pub series: Vec<OpSpec>,
}

/// Stock catalogue: core operations plus verbose-gated internals, with the
/// supplementary set appended when `extras` is requested.
pub fn default_allow_list(extras: bool) -> AllowList {
    let mut frame: Vec<OpSpec> = FRAME_OPS.iter().map(|name| OpSpec::new(name)).collect();
    frame.extend(FRAME_VERBOSE_OPS.iter().map(|name| OpSpec::verbose_only(name)));
    let mut series: Vec<OpSpec> = SERIES_OPS.iter().map(|name| OpSpec::new(name)).collect();
    series.extend(SERIES_VERBOSE_OPS.iter().map(|name| OpSpec::verbose_only(name)));
    if extras {
        frame.extend(FRAME_EXTRA_OPS.iter().map(|name| OpSpec::new(name)));
        series.extend(SERIES_EXTRA_OPS.iter().map(|name| OpSpec::new(name)));
    }
    AllowList { frame, series }
}
