//! Framelog - transparent instrumentation and diff logging for tabular frames
//!
//! This library wraps a configurable allow-list of frame and series
//! operations so that each call returns its normal result while a
//! side-channel trace records before/after diff statistics: row and column
//! deltas, dtype changes, filtering ratio, elapsed time, and an optional
//! memory delta.
//!
//! ```no_run
//! use framelog::{enable, disable, OpArgs, Frame, DType, Value};
//!
//! let mut people = Frame::new()
//!     .with_column("age", DType::Int, vec![Value::Int(25), Value::Int(61)])
//!     .unwrap();
//!
//! enable(framelog::TraceConfig::default());
//! let adults = people
//!     .call("query", &OpArgs::new().arg("age").arg(">=").arg(60))
//!     .unwrap();
//! disable();
//! ```

pub mod catalog;
pub mod config;
pub mod extras;
pub mod frame;
pub mod ops;
pub mod registry;
pub mod report;
pub mod series;
pub mod snapshot;
pub mod stats;
pub mod tracer;
pub mod value;

pub use catalog::{default_allow_list, AllowList, OpSpec};
pub use config::TraceConfig;
pub use frame::{Column, Frame, FrameError};
pub use ops::{Cmp, OpArgs};
pub use registry::{InterceptionRegistry, InterceptError, Operable, TargetKind};
pub use report::{JsonReporter, NullReporter, Reporter, TextReporter};
pub use series::Series;
pub use snapshot::{CapturePolicy, CaptureRecord};
pub use stats::{DtypeChange, ExecutionStats, OpStatsTracker, StepStats};
pub use tracer::{
    disable, enable, execution_log, set_reporter, summary, with_enabled, with_suspended, Tracer,
};
pub use value::{DType, Value};
