//! Pre-operation capture under a cost/fidelity trade-off
//!
//! High fidelity takes a full deep copy so the before-view survives in-place
//! mutation. The copy goes through the *stored original* `copy`
//! implementation when one is installed; resolving the live symbol instead
//! would re-enter instrumentation from inside a wrapper. When no original can
//! be resolved the container's standard deep copy is used. The fallback is
//! silent: capture is best-effort about fidelity, never about the correctness
//! of the underlying call.
//!
//! Low fidelity skips the copy entirely and the before-view aliases the live
//! container. Operations that return a new container leave their input
//! untouched, so the aliased view is still exact; for in-place mutations the
//! before and after views are the same storage and structural deltas read as
//! zero. That is an accepted precision loss, not a defect to compensate for.

use serde::Serialize;
use std::sync::{Mutex, Weak};

use crate::ops::OpArgs;
use crate::registry::{InterceptionRegistry, Operable};

/// Fidelity/cost choice for the before-snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// Full deep copy, unaffected by in-place mutation
    HighFidelity,
    /// No copy; the before-view aliases the live container
    LowFidelity,
}

enum Captured<C> {
    Copied(C),
    Aliased,
}

/// The before-state of one call in progress; owned by that call and dropped
/// once diffing completes or the operation fails
pub struct CaptureRecord<C> {
    state: Captured<C>,
    policy: CapturePolicy,
}

impl<C> CaptureRecord<C> {
    pub fn policy(&self) -> CapturePolicy {
        self.policy
    }

    /// The before-view this record stands for. `live` must be the container
    /// the operation ran against, as it exists after the call; under the
    /// aliasing policy that is exactly what the view degrades to.
    pub fn view<'a>(&'a self, live: &'a C) -> &'a C {
        match &self.state {
            Captured::Copied(copy) => copy,
            Captured::Aliased => live,
        }
    }
}

/// Capture the pre-operation state of `target` under `policy`.
///
/// `registry` is used to resolve the stored original `copy` implementation;
/// a dead or missing registry degrades to the standard deep copy.
pub fn capture<C: Operable>(
    target: &mut C,
    policy: CapturePolicy,
    registry: &Weak<Mutex<InterceptionRegistry>>,
) -> CaptureRecord<C> {
    match policy {
        CapturePolicy::LowFidelity => CaptureRecord {
            state: Captured::Aliased,
            policy,
        },
        CapturePolicy::HighFidelity => {
            let original_copy = registry.upgrade().and_then(|registry| {
                registry
                    .lock()
                    .ok()
                    .and_then(|tables| C::table(&tables).stored_original("copy"))
            });
            let copied = match original_copy {
                Some(copy_op) => match copy_op(target, &OpArgs::new()) {
                    Ok(Some(copy)) => copy,
                    // an original copy that produces nothing or fails falls
                    // back to the standard copy
                    _ => target.deep_copy(),
                },
                None => target.deep_copy(),
            };
            CaptureRecord {
                state: Captured::Copied(copied),
                policy,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::value::{DType, Value};
    use std::sync::Arc;

    fn frame() -> Frame {
        Frame::new()
            .with_column("x", DType::Int, vec![Value::Int(1), Value::Null])
            .unwrap()
    }

    #[test]
    fn test_high_fidelity_survives_mutation() {
        let mut live = frame();
        let record = capture(&mut live, CapturePolicy::HighFidelity, &Weak::new());
        live.fill_nulls(&Value::Int(9));
        let before = record.view(&live);
        assert_eq!(before.column("x").unwrap().values()[1], Value::Null);
    }

    #[test]
    fn test_low_fidelity_aliases_live_container() {
        let mut live = frame();
        let record = capture(&mut live, CapturePolicy::LowFidelity, &Weak::new());
        live.fill_nulls(&Value::Int(9));
        let before = record.view(&live);
        assert_eq!(before.column("x").unwrap().values()[1], Value::Int(9));
    }

    #[test]
    fn test_high_fidelity_uses_stored_original_copy() {
        let registry = Arc::new(Mutex::new(InterceptionRegistry::with_builtins()));
        {
            let mut tables = registry.lock().unwrap();
            tables
                .frame_table_mut()
                .install("copy", |_original| {
                    // a wrapped copy that would poison the snapshot if used
                    Arc::new(|_frame: &mut Frame, _args: &OpArgs| {
                        Ok(Some(Frame::new()))
                    })
                })
                .unwrap();
        }
        let mut live = frame();
        let record = capture(
            &mut live,
            CapturePolicy::HighFidelity,
            &Arc::downgrade(&registry),
        );
        // the stored original was used, not the wrapped implementation
        assert_eq!(record.view(&live).row_count(), 2);
    }

    #[test]
    fn test_dead_registry_falls_back_to_standard_copy() {
        let weak = {
            let registry = Arc::new(Mutex::new(InterceptionRegistry::with_builtins()));
            Arc::downgrade(&registry)
        };
        let mut live = frame();
        let record = capture(&mut live, CapturePolicy::HighFidelity, &weak);
        assert_eq!(record.view(&live).row_count(), 2);
    }
}
