//! Trace emission, decoupled from capture and diffing
//!
//! The engine's only obligation toward a reporter is to hand it one complete
//! [`StepStats`] per successful intercepted call, synchronously, before the
//! call returns. Everything about wording and destination lives here and can
//! be swapped without touching the engine.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::stats::StepStats;

/// Consumes one diff record per intercepted call
pub trait Reporter: Send {
    fn report(&mut self, step: &StepStats);
}

/// Discards everything
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _step: &StepStats) {}
}

/// Human-readable multi-line trace entries
pub struct TextReporter {
    out: Box<dyn Write + Send>,
}

impl TextReporter {
    /// Default reporter: trace entries on stderr
    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    fn render(step: &StepStats) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}) {}", step.step, step.signature);
        if step.row_delta < 0 {
            let removed = step.row_delta.unsigned_abs();
            let percent = step
                .filter_ratio
                .map(|ratio| (1.0 - ratio) * 100.0)
                .unwrap_or(0.0);
            let _ = writeln!(
                out,
                "   * removed {removed} rows ({percent:.1}%), {} rows remaining",
                step.rows_after
            );
        } else if step.row_delta > 0 {
            let _ = writeln!(
                out,
                "   * added {} rows, {} rows total",
                step.row_delta, step.rows_after
            );
        }
        if !step.columns_added.is_empty() {
            let _ = writeln!(out, "   * added columns: {}", step.columns_added.join(", "));
        }
        if !step.columns_removed.is_empty() {
            let _ = writeln!(
                out,
                "   * removed columns: {}",
                step.columns_removed.join(", ")
            );
        }
        for change in &step.dtype_changes {
            let _ = writeln!(
                out,
                "   * column {} changed dtype: {} -> {}",
                change.column, change.from, change.to
            );
        }
        if step.row_delta == 0
            && step.columns_added.is_empty()
            && step.columns_removed.is_empty()
            && step.dtype_changes.is_empty()
        {
            let _ = writeln!(out, "   * no structural change");
        }
        if let Some(delta) = step.memory_delta_bytes {
            let _ = writeln!(out, "   * memory delta: {delta} bytes");
        }
        let _ = writeln!(out, "   * execution time: {}us", step.elapsed_us);
        out
    }
}

impl Reporter for TextReporter {
    fn report(&mut self, step: &StepStats) {
        // emission is best-effort; a broken pipe must not fail the traced call
        let _ = self.out.write_all(Self::render(step).as_bytes());
        let _ = self.out.flush();
    }
}

/// One JSON object per line, for machine consumption
pub struct JsonReporter {
    out: Box<dyn Write + Send>,
}

impl JsonReporter {
    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }
}

impl Reporter for JsonReporter {
    fn report(&mut self, step: &StepStats) {
        if let Ok(line) = serde_json::to_string(step) {
            let _ = writeln!(self.out, "{line}");
            let _ = self.out.flush();
        }
    }
}
