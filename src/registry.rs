//! Interception registry: per-kind operation tables with install/restore
//!
//! Each operation name maps to an [`OpSlot`] holding the currently dispatched
//! implementation plus the bookkeeping needed to wrap and unwrap it:
//!
//! - `register` seeds a slot with the real implementation
//! - `install` stores that original and swaps in an instrumented wrapper
//! - `uninstall` restores the stored original
//! - `suspend_all`/`resume_all` park the wrapped closure and bring back the
//!   identical closure later, so resuming re-establishes the exact wrapped
//!   behavior including its captured configuration
//!
//! A wrapper must close over the *stored original*, never look up the
//! registered symbol at call time: an instrumented operation that internally
//! uses another operation's machinery must not re-enter instrumentation.

use fnv::FnvHashMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::frame::Frame;
use crate::ops::OpFn;
use crate::series::Series;
use crate::value::DType;

/// Type tag for the operable container kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Frame,
    Series,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame => f.write_str("frame"),
            Self::Series => f.write_str("series"),
        }
    }
}

/// Registry misuse; programmer error, surfaced immediately
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterceptError {
    #[error("operation `{name}` on {kind} is already instrumented")]
    AlreadyInstalled { kind: TargetKind, name: String },
    #[error("operation `{name}` on {kind} is not instrumented")]
    NotInstalled { kind: TargetKind, name: String },
}

/// Capability every operable container exposes to the generic engine
pub trait Operable: Clone + Send + 'static {
    const KIND: TargetKind;

    /// Project this kind's operation table out of the registry
    fn table(registry: &InterceptionRegistry) -> &OpTable<Self>;
    fn table_mut(registry: &mut InterceptionRegistry) -> &mut OpTable<Self>;

    fn row_count(&self) -> usize;
    fn column_names(&self) -> Vec<String>;
    fn dtype_of(&self, column: &str) -> Option<DType>;
    fn mem_usage(&self) -> usize;
    fn deep_copy(&self) -> Self;
}

struct OpSlot<C> {
    /// What dispatch currently invokes
    current: OpFn<C>,
    /// The real implementation, `Some` only while instrumented
    original: Option<OpFn<C>>,
    /// The wrapped closure, parked here while suspended
    parked: Option<OpFn<C>>,
}

/// Name-keyed operation table for one container kind
pub struct OpTable<C> {
    kind: TargetKind,
    slots: FnvHashMap<String, OpSlot<C>>,
}

impl<C> OpTable<C> {
    fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            slots: FnvHashMap::default(),
        }
    }

    /// Seed a slot with the real implementation of `name`
    pub fn register(&mut self, name: &str, op: OpFn<C>) {
        self.slots.insert(
            name.to_string(),
            OpSlot {
                current: op,
                original: None,
                parked: None,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// The implementation dispatch should invoke right now
    pub fn current(&self, name: &str) -> Option<OpFn<C>> {
        self.slots.get(name).map(|slot| Arc::clone(&slot.current))
    }

    /// The stored original, `Some` only while `name` is instrumented
    pub fn stored_original(&self, name: &str) -> Option<OpFn<C>> {
        self.slots
            .get(name)
            .and_then(|slot| slot.original.as_ref().map(Arc::clone))
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .is_some_and(|slot| slot.original.is_some())
    }

    pub fn installed_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.original.is_some())
            .count()
    }

    /// Store the current implementation as the original and replace it with
    /// `wrap(original)`. The closure receives the stored original so wrappers
    /// can only ever capture that, not the live symbol.
    pub fn install(
        &mut self,
        name: &str,
        wrap: impl FnOnce(OpFn<C>) -> OpFn<C>,
    ) -> Result<(), InterceptError> {
        let kind = self.kind;
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| InterceptError::NotInstalled {
                kind,
                name: name.to_string(),
            })?;
        if slot.original.is_some() {
            return Err(InterceptError::AlreadyInstalled {
                kind,
                name: name.to_string(),
            });
        }
        let original = Arc::clone(&slot.current);
        slot.original = Some(Arc::clone(&original));
        slot.current = wrap(original);
        debug!(%kind, op = name, "installed instrumentation wrapper");
        Ok(())
    }

    /// Restore the stored original and clear the slot's bookkeeping
    pub fn uninstall(&mut self, name: &str) -> Result<(), InterceptError> {
        let kind = self.kind;
        let slot = self
            .slots
            .get_mut(name)
            .ok_or_else(|| InterceptError::NotInstalled {
                kind,
                name: name.to_string(),
            })?;
        let original = slot.original.take().ok_or_else(|| InterceptError::NotInstalled {
            kind,
            name: name.to_string(),
        })?;
        slot.current = original;
        slot.parked = None;
        debug!(%kind, op = name, "restored original implementation");
        Ok(())
    }

    /// Restore originals everywhere; slots that were never installed are
    /// skipped rather than failed.
    pub fn uninstall_all(&mut self) {
        for slot in self.slots.values_mut() {
            if let Some(original) = slot.original.take() {
                slot.current = original;
                slot.parked = None;
            }
        }
    }

    /// Swap every installed slot back to its original, parking the wrapped
    /// closure for `resume_all`. Idempotent while already suspended.
    pub fn suspend_all(&mut self) {
        for slot in self.slots.values_mut() {
            if let Some(original) = &slot.original {
                if slot.parked.is_none() {
                    slot.parked = Some(Arc::clone(&slot.current));
                    slot.current = Arc::clone(original);
                }
            }
        }
    }

    /// Bring back the parked wrapped closures, identically as parked
    pub fn resume_all(&mut self) {
        for slot in self.slots.values_mut() {
            if let Some(wrapped) = slot.parked.take() {
                slot.current = wrapped;
            }
        }
    }

    pub fn installed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.original.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Both per-kind tables behind one handle
pub struct InterceptionRegistry {
    frame: OpTable<Frame>,
    series: OpTable<Series>,
}

impl InterceptionRegistry {
    /// Empty tables; mostly useful in tests
    pub fn new() -> Self {
        Self {
            frame: OpTable::new(TargetKind::Frame),
            series: OpTable::new(TargetKind::Series),
        }
    }

    /// Tables seeded with every built-in and supplementary operation
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::ops::register_builtins(&mut registry);
        crate::extras::register_extras(&mut registry);
        registry
    }

    pub fn frame_table(&self) -> &OpTable<Frame> {
        &self.frame
    }

    pub fn frame_table_mut(&mut self) -> &mut OpTable<Frame> {
        &mut self.frame
    }

    pub fn series_table(&self) -> &OpTable<Series> {
        &self.series
    }

    pub fn series_table_mut(&mut self) -> &mut OpTable<Series> {
        &mut self.series
    }

    pub fn uninstall_all(&mut self) {
        self.frame.uninstall_all();
        self.series.uninstall_all();
    }

    pub fn suspend_all(&mut self) {
        self.frame.suspend_all();
        self.series.suspend_all();
    }

    pub fn resume_all(&mut self) {
        self.frame.resume_all();
        self.series.resume_all();
    }

    pub fn installed_count(&self) -> usize {
        self.frame.installed_count() + self.series.installed_count()
    }
}

impl Default for InterceptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
