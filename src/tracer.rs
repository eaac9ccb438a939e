//! Activation control and the instrumented-call pipeline
//!
//! A [`Tracer`] ties the engine together: it owns the interception registry,
//! the execution log and reporter, and the activation state machine
//! (enable/disable, depth-counted suspend/resume). One process-wide instance
//! backs the free functions at the bottom of this module; independent
//! instances can be constructed for isolation.
//!
//! The wrapper installed for each allow-listed operation runs the full
//! pipeline: capture the before-state, execute the stored original under
//! timing, diff the pair, report, and hand the untouched result back. An
//! operation error propagates verbatim and leaves no trace record.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Instant;
use tracing::debug;

use crate::catalog::{self, OpSpec};
use crate::config::TraceConfig;
use crate::frame::FrameError;
use crate::ops::{OpArgs, OpFn};
use crate::registry::{InterceptionRegistry, Operable};
use crate::report::{Reporter, TextReporter};
use crate::snapshot::{self, CapturePolicy};
use crate::stats::{self, ExecutionStats, OpStatsTracker, StepStats};

/// Recover the guard from a poisoned lock; the registry and log stay usable
/// even if a traced call panicked on another thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Execution log and reporter, shared with every installed wrapper
struct TraceSink {
    log: Mutex<Vec<StepStats>>,
    reporter: Mutex<Box<dyn Reporter>>,
}

impl TraceSink {
    fn record(&self, mut step: StepStats, emit: bool) {
        let mut log = lock(&self.log);
        step.step = log.len() + 1;
        if emit {
            lock(&self.reporter).report(&step);
        }
        log.push(step);
    }
}

struct ActivationState {
    active: bool,
    suspended_depth: usize,
    config: TraceConfig,
}

/// Everything one instrumented wrapper needs to carry
struct WrapCtx {
    name: String,
    verbose_only: bool,
    config: TraceConfig,
    registry: Weak<Mutex<InterceptionRegistry>>,
    sink: Arc<TraceSink>,
}

/// Build the instrumented wrapper for one operation.
///
/// The wrapper invokes the `original` it captured here, never the currently
/// registered symbol, so operations that internally share machinery are
/// opaque to the engine: one outer call, one record.
fn instrumented<C: Operable>(ctx: WrapCtx, original: OpFn<C>) -> OpFn<C> {
    Arc::new(move |target: &mut C, args: &OpArgs| {
        let policy = if ctx.config.copy_ok {
            CapturePolicy::HighFidelity
        } else {
            CapturePolicy::LowFidelity
        };
        let before = snapshot::capture(target, policy, &ctx.registry);
        let mem_before = ctx.config.calculate_memory.then(|| target.mem_usage());

        let started = Instant::now();
        let produced = original(target, args)?;
        let elapsed = started.elapsed();

        // an absent result signals a strictly in-place mutation; the live
        // container is then the after-view
        let after: &C = produced.as_ref().unwrap_or(&*target);
        let exec = ExecutionStats {
            elapsed,
            mem_before,
            mem_after: ctx.config.calculate_memory.then(|| after.mem_usage()),
        };
        let signature = args.render(&ctx.name, ctx.config.full_signature);
        let step = stats::diff(&ctx.name, signature, before.view(&*target), after, &exec);

        let emit = !ctx.config.silent && (ctx.config.verbose || !ctx.verbose_only);
        ctx.sink.record(step, emit);
        Ok(produced)
    })
}

/// Interception engine handle: registry, trace sink, activation state
pub struct Tracer {
    registry: Arc<Mutex<InterceptionRegistry>>,
    sink: Arc<TraceSink>,
    state: Mutex<ActivationState>,
}

impl Tracer {
    /// A fresh, inactive tracer with the built-in operations registered
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(InterceptionRegistry::with_builtins())),
            sink: Arc::new(TraceSink {
                log: Mutex::new(Vec::new()),
                reporter: Mutex::new(Box::new(TextReporter::stderr())),
            }),
            state: Mutex::new(ActivationState {
                active: false,
                suspended_depth: 0,
                config: TraceConfig::default(),
            }),
        }
    }

    /// Install instrumentation for the configured allow-list.
    /// Idempotent: enabling while already active changes nothing.
    pub fn enable(&self, config: TraceConfig) {
        let mut state = lock(&self.state);
        if state.active {
            return;
        }
        let list = config
            .allow_list
            .clone()
            .unwrap_or_else(|| catalog::default_allow_list(config.extras));
        {
            let mut registry = lock(&self.registry);
            self.install_kind::<crate::frame::Frame>(&mut registry, &list.frame, &config);
            self.install_kind::<crate::series::Series>(&mut registry, &list.series, &config);
            debug!(ops = registry.installed_count(), "instrumentation enabled");
        }
        lock(&self.sink.log).clear();
        state.config = config;
        state.active = true;
    }

    fn install_kind<C: Operable>(
        &self,
        registry: &mut InterceptionRegistry,
        specs: &[OpSpec],
        config: &TraceConfig,
    ) {
        for spec in specs {
            let table = C::table_mut(registry);
            if !table.contains(&spec.name) {
                debug!(kind = %C::KIND, op = %spec.name, "allow-list entry has no implementation, skipping");
                continue;
            }
            let ctx = WrapCtx {
                name: spec.name.clone(),
                verbose_only: spec.verbose_only,
                config: config.clone(),
                registry: Arc::downgrade(&self.registry),
                sink: Arc::clone(&self.sink),
            };
            if let Err(err) = table.install(&spec.name, |original| instrumented(ctx, original)) {
                debug!(%err, "install skipped");
            }
        }
    }

    /// Restore every original implementation. Idempotent.
    pub fn disable(&self) {
        let mut state = lock(&self.state);
        if !state.active {
            return;
        }
        lock(&self.registry).uninstall_all();
        state.active = false;
        state.suspended_depth = 0;
        debug!("instrumentation disabled");
    }

    /// Temporarily restore originals while staying active. Nestable; only
    /// the outermost suspend actually swaps implementations.
    pub fn suspend(&self) {
        let mut state = lock(&self.state);
        if !state.active {
            return;
        }
        state.suspended_depth += 1;
        if state.suspended_depth == 1 {
            lock(&self.registry).suspend_all();
            debug!("instrumentation suspended");
        }
    }

    /// Undo one `suspend`. A resume with no matching suspend is a no-op.
    pub fn resume(&self) {
        let mut state = lock(&self.state);
        if state.suspended_depth == 0 {
            return;
        }
        state.suspended_depth -= 1;
        if state.suspended_depth == 0 {
            lock(&self.registry).resume_all();
            debug!("instrumentation resumed");
        }
    }

    /// Enable now, disable when the returned guard drops
    pub fn enable_scoped(&self, config: TraceConfig) -> Enabled<'_> {
        self.enable(config);
        Enabled { tracer: self }
    }

    /// Suspend now, resume when the returned guard drops
    pub fn suspend_scoped(&self) -> Suspended<'_> {
        self.suspend();
        Suspended { tracer: self }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    pub fn suspended_depth(&self) -> usize {
        lock(&self.state).suspended_depth
    }

    pub fn installed_count(&self) -> usize {
        lock(&self.registry).installed_count()
    }

    /// Dispatch one operation by name against the current registry state
    pub fn call<C: Operable>(
        &self,
        target: &mut C,
        op: &str,
        args: &OpArgs,
    ) -> Result<Option<C>, FrameError> {
        // clone the handle under the lock, invoke outside it: instrumented
        // execution must not hold the registry
        let func = {
            let registry = lock(&self.registry);
            C::table(&registry).current(op)
        }
        .ok_or_else(|| FrameError::UnknownOperation {
            kind: C::KIND,
            name: op.to_string(),
        })?;
        func(target, args)
    }

    /// Snapshot of the activation scope's execution log
    pub fn execution_log(&self) -> Vec<StepStats> {
        lock(&self.sink.log).clone()
    }

    /// Replace the reporter consuming future diff records
    pub fn set_reporter(&self, reporter: Box<dyn Reporter>) {
        *lock(&self.sink.reporter) = reporter;
    }

    /// Per-operation aggregate table over the execution log
    pub fn summary(&self) -> String {
        OpStatsTracker::from_log(&self.execution_log()).render_summary()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard returned by [`Tracer::enable_scoped`]; disables on drop
pub struct Enabled<'t> {
    tracer: &'t Tracer,
}

impl Drop for Enabled<'_> {
    fn drop(&mut self) {
        self.tracer.disable();
    }
}

/// Scope guard returned by [`Tracer::suspend_scoped`]; resumes on drop
pub struct Suspended<'t> {
    tracer: &'t Tracer,
}

impl Drop for Suspended<'_> {
    fn drop(&mut self) {
        self.tracer.resume();
    }
}

static GLOBAL: OnceLock<Tracer> = OnceLock::new();

/// The process-wide tracer backing [`Frame::call`](crate::Frame::call) and
/// [`Series::call`](crate::Series::call)
pub fn global() -> &'static Tracer {
    GLOBAL.get_or_init(Tracer::new)
}

/// Activate instrumentation process-wide; idempotent
pub fn enable(config: TraceConfig) {
    global().enable(config);
}

/// Deactivate instrumentation process-wide; idempotent
pub fn disable() {
    global().disable();
}

/// Activate for a scope; instrumentation is disabled when the guard drops,
/// on every exit path
pub fn with_enabled(config: TraceConfig) -> Enabled<'static> {
    global().enable_scoped(config)
}

/// Suspend for a scope; nestable, resumed when the guard drops
pub fn with_suspended() -> Suspended<'static> {
    global().suspend_scoped()
}

/// Snapshot of the process-wide execution log
pub fn execution_log() -> Vec<StepStats> {
    global().execution_log()
}

/// Replace the process-wide reporter
pub fn set_reporter(reporter: Box<dyn Reporter>) {
    global().set_reporter(reporter);
}

/// Per-operation summary over the process-wide execution log
pub fn summary() -> String {
    global().summary()
}
