//! Diff statistics for one intercepted call, and per-operation aggregates
//!
//! [`diff`] pairs a before-view with an after-view and produces one
//! [`StepStats`] record. Exactly one record corresponds to each successful
//! intercepted call; failed calls produce none.

use fnv::FnvHashMap;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

use crate::registry::{Operable, TargetKind};
use crate::value::DType;

/// Measurements taken around the original implementation's execution.
///
/// `elapsed` spans only the original call, never capture or diff overhead.
/// Memory is present only when measurement was requested; `None` means "not
/// measured", which is distinct from a measured delta of zero.
#[derive(Debug, Clone)]
pub struct ExecutionStats {
    pub elapsed: Duration,
    pub mem_before: Option<usize>,
    pub mem_after: Option<usize>,
}

/// A column whose dtype differs between the before and after views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DtypeChange {
    pub column: String,
    pub from: DType,
    pub to: DType,
}

/// Structured statistics for one intercepted call
#[derive(Debug, Clone, Serialize)]
pub struct StepStats {
    /// 1-based position in the activation scope's execution log
    pub step: usize,
    pub target: TargetKind,
    pub op: String,
    /// Rendered call signature, full or elided per configuration
    pub signature: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub row_delta: i64,
    pub columns_added: Vec<String>,
    pub columns_removed: Vec<String>,
    pub dtype_changes: Vec<DtypeChange>,
    /// Fraction of rows remaining after a row-removing call; 0 and flagged
    /// degenerate when the input had no rows to begin with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_ratio: Option<f64>,
    pub degenerate_filter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_delta_bytes: Option<i64>,
    pub elapsed_us: u64,
}

/// Compare a before-view and an after-view of one call
pub fn diff<C: Operable>(
    op: &str,
    signature: String,
    before: &C,
    after: &C,
    exec: &ExecutionStats,
) -> StepStats {
    let rows_before = before.row_count();
    let rows_after = after.row_count();
    let row_delta = rows_after as i64 - rows_before as i64;

    let before_columns = before.column_names();
    let after_columns = after.column_names();
    let columns_added: Vec<String> = after_columns
        .iter()
        .filter(|name| !before_columns.contains(name))
        .cloned()
        .collect();
    let columns_removed: Vec<String> = before_columns
        .iter()
        .filter(|name| !after_columns.contains(name))
        .cloned()
        .collect();
    let dtype_changes: Vec<DtypeChange> = before_columns
        .iter()
        .filter_map(|name| {
            let from = before.dtype_of(name)?;
            let to = after.dtype_of(name)?;
            (from != to).then(|| DtypeChange {
                column: name.clone(),
                from,
                to,
            })
        })
        .collect();

    let (filter_ratio, degenerate_filter) = if row_delta < 0 {
        (Some(rows_after as f64 / rows_before as f64), false)
    } else if rows_before == 0 && rows_after == 0 {
        // nothing to remove from an empty container; the ratio degenerates
        // to 0 rather than dividing by zero
        (Some(0.0), true)
    } else {
        (None, false)
    };

    let memory_delta_bytes = match (exec.mem_before, exec.mem_after) {
        (Some(before_bytes), Some(after_bytes)) => Some(after_bytes as i64 - before_bytes as i64),
        _ => None,
    };

    StepStats {
        step: 0,
        target: C::KIND,
        op: op.to_string(),
        signature,
        rows_before,
        rows_after,
        row_delta,
        columns_added,
        columns_removed,
        dtype_changes,
        filter_ratio,
        degenerate_filter,
        memory_delta_bytes,
        elapsed_us: exec.elapsed.as_micros() as u64,
    }
}

/// Aggregate execution statistics per operation name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpAggregate {
    pub calls: u64,
    pub total_time_us: u64,
    pub rows_removed: u64,
}

/// Rolls the execution log up into per-operation totals
#[derive(Debug, Default)]
pub struct OpStatsTracker {
    stats: FnvHashMap<String, OpAggregate>,
}

impl OpStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_log(log: &[StepStats]) -> Self {
        let mut tracker = Self::new();
        for step in log {
            tracker.record(step);
        }
        tracker
    }

    pub fn record(&mut self, step: &StepStats) {
        let entry = self.stats.entry(step.op.clone()).or_default();
        entry.calls += 1;
        entry.total_time_us += step.elapsed_us;
        if step.row_delta < 0 {
            entry.rows_removed += step.row_delta.unsigned_abs();
        }
    }

    pub fn aggregate(&self, op: &str) -> Option<&OpAggregate> {
        self.stats.get(op)
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Aligned per-operation summary table, sorted by call count
    pub fn render_summary(&self) -> String {
        if self.stats.is_empty() {
            return "no operations traced\n".to_string();
        }
        let mut sorted: Vec<_> = self.stats.iter().collect();
        sorted.sort_by(|a, b| b.1.calls.cmp(&a.1.calls).then_with(|| a.0.cmp(b.0)));

        let total_time_us: u64 = sorted.iter().map(|(_, agg)| agg.total_time_us).sum();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "% time     seconds  usecs/call     calls  rows-gone operation"
        );
        let _ = writeln!(
            out,
            "------ ----------- ----------- --------- ---------- ----------------"
        );
        for (name, agg) in &sorted {
            let time_percent = if total_time_us > 0 {
                (agg.total_time_us as f64 / total_time_us as f64) * 100.0
            } else {
                0.0
            };
            let seconds = agg.total_time_us as f64 / 1_000_000.0;
            let usecs_per_call = if agg.calls > 0 {
                agg.total_time_us / agg.calls
            } else {
                0
            };
            let _ = writeln!(
                out,
                "{:6.2} {:>11.6} {:>11} {:>9} {:>10} {}",
                time_percent, seconds, usecs_per_call, agg.calls, agg.rows_removed, name
            );
        }
        let _ = writeln!(
            out,
            "------ ----------- ----------- --------- ---------- ----------------"
        );
        let total_calls: u64 = sorted.iter().map(|(_, agg)| agg.calls).sum();
        let total_removed: u64 = sorted.iter().map(|(_, agg)| agg.rows_removed).sum();
        let total_seconds = total_time_us as f64 / 1_000_000.0;
        let avg_usecs = if total_calls > 0 {
            total_time_us / total_calls
        } else {
            0
        };
        let _ = writeln!(
            out,
            "100.00 {:>11.6} {:>11} {:>9} {:>10} total",
            total_seconds, avg_usecs, total_calls, total_removed
        );
        out
    }
}
