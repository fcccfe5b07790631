//! The soft-check primitive.
//!
//! [`Assume`] is the explicit context a test body receives from the wrapper.
//! The same context is registered as the thread's current scope for the
//! duration of the body, which is what [`assume`] and the `assume!` macro
//! write to.
//!
//! The current scope is per thread. A helper thread spawned by the body
//! reports into the same unit by calling [`Assume::in_thread`] (or holding an
//! [`AssumptionScope::attach`] guard) on a clone of the context.

use crate::buffer::AssumptionBuffer;
use crate::callsite::{CallSiteResolver, CheckSite};
use crate::config::Settings;
use crate::formatter::ValueFormatter;
use crate::record::{CapturedLocal, FailureRecord, RecordLocation};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

const SOURCE_UNAVAILABLE: &str = "<source unavailable>";

thread_local! {
    static CURRENT: RefCell<Option<Assume>> = RefCell::new(None);
    static ACTIVE_SCOPES: Cell<usize> = Cell::new(0);
}

/// Values a check condition can be coerced from.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

impl<T> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> Truthy for Result<T, E> {
    fn is_truthy(&self) -> bool {
        self.is_ok()
    }
}

/// Optional details supplied with a check, mostly by the `assume!` macro.
#[derive(Clone, Copy, Default)]
pub struct Check<'a> {
    /// Message replacing the source text in the report.
    pub message: Option<&'a dyn fmt::Display>,
    /// Stringified condition, used when the source line cannot be read.
    pub expression: Option<&'static str>,
    /// Path of the enclosing function.
    pub function: Option<&'static str>,
    /// Bindings to capture when locals capture is enabled.
    pub locals: &'a [(&'static str, &'a dyn fmt::Debug)],
}

/// A handle on one test unit's assumption buffer.
///
/// Cloning is cheap and every clone writes to the same buffer, from any
/// thread.
#[derive(Clone)]
pub struct Assume {
    buffer: Arc<AssumptionBuffer>,
    settings: Settings,
    resolver: Arc<dyn CallSiteResolver>,
    formatter: Arc<dyn ValueFormatter>,
}

impl Assume {
    pub fn new(
        settings: Settings,
        resolver: Arc<dyn CallSiteResolver>,
        formatter: Arc<dyn ValueFormatter>,
    ) -> Self {
        Self {
            buffer: Arc::new(AssumptionBuffer::new()),
            settings,
            resolver,
            formatter,
        }
    }

    /// Record a failure if `expr` is false. Returns the truth value of `expr`.
    ///
    /// An empty `message` reports the call-site source line instead.
    #[track_caller]
    pub fn check<T: Truthy>(&self, expr: T, message: &str) -> bool {
        let message: Option<&dyn fmt::Display> = if message.is_empty() {
            None
        } else {
            Some(&message)
        };
        self.check_with(
            expr,
            Check {
                message,
                ..Check::default()
            },
        )
    }

    /// [`Assume::check`] with the full set of call-site details.
    #[track_caller]
    pub fn check_with<T: Truthy>(&self, expr: T, check: Check<'_>) -> bool {
        let passed = expr.is_truthy();
        if !passed {
            self.record(Location::caller(), check);
        }
        passed
    }

    /// Number of failures recorded and not yet drained.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `f` with this context as the current thread's scope.
    ///
    /// Meant for threads spawned by a test body, so that `assume!` calls on
    /// them land in the unit's buffer. The buffer is not drained on exit.
    pub fn in_thread<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = AssumptionScope::attach(self.clone());
        f()
    }

    pub(crate) fn drain(&self) -> Vec<FailureRecord> {
        self.buffer.drain()
    }

    fn record(&self, location: &Location<'_>, check: Check<'_>) {
        let site = self.resolver.resolve(&CheckSite {
            location,
            expression: check.expression,
            function: check.function,
        });

        let message = check.message.map(|m| m.to_string()).filter(|m| !m.is_empty());
        let context = match (message, site.source_line) {
            (Some(message), _) => message,
            (None, Some(line)) => line.trim_start().to_string(),
            (None, None) => check.expression.unwrap_or(SOURCE_UNAVAILABLE).to_string(),
        };

        let mut record = FailureRecord::new(RecordLocation::new(site.file, site.line), context);
        if self.settings.show_locals && !check.locals.is_empty() {
            let locals = check
                .locals
                .iter()
                .map(|(name, value)| {
                    CapturedLocal::new(
                        *name,
                        self.formatter.format(*value, self.settings.max_repr_len),
                    )
                })
                .collect();
            record = record.with_locals(locals);
        }

        tracing::debug!(
            location = %record.location(),
            function = site.function.as_deref().unwrap_or(""),
            "assumption failed"
        );
        self.buffer.append(record);
    }
}

impl fmt::Debug for Assume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assume")
            .field("pending", &self.buffer.len())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Registration of an [`Assume`] as the thread's current scope.
///
/// Scopes nest: entering shadows the previous scope, and dropping restores
/// it. An owning scope that is dropped before [`AssumptionScope::finish`]
/// still drains its buffer so nothing leaks into the next test unit.
#[must_use]
pub struct AssumptionScope {
    assume: Assume,
    previous: Option<Assume>,
    drained: bool,
}

impl AssumptionScope {
    /// Register `assume` as the current scope. This scope owns the buffer
    /// and drains it.
    pub fn enter(assume: Assume) -> Self {
        Self::register(assume, false)
    }

    /// Register `assume` on another thread of the same unit. The owning
    /// scope drains the buffer; this one never does.
    pub fn attach(assume: Assume) -> Self {
        Self::register(assume, true)
    }

    fn register(assume: Assume, drained: bool) -> Self {
        let previous = CURRENT.with(|current| current.replace(Some(assume.clone())));
        ACTIVE_SCOPES.with(|active| active.set(active.get() + 1));
        Self {
            assume,
            previous,
            drained,
        }
    }

    /// Drain the scope's buffer. Later calls, and calls on an attached
    /// scope, return nothing.
    pub fn finish(&mut self) -> Vec<FailureRecord> {
        if self.drained {
            return Vec::new();
        }
        self.drained = true;
        let records = self.assume.drain();
        tracing::debug!(count = records.len(), "drained assumption scope");
        records
    }
}

impl Drop for AssumptionScope {
    fn drop(&mut self) {
        if !self.drained {
            let dropped = self.assume.drain();
            if !dropped.is_empty() {
                tracing::warn!(
                    count = dropped.len(),
                    "assumption scope exited without aggregation; failures dropped"
                );
            }
        }
        let previous = self.previous.take();
        // The thread-locals may already be gone during thread teardown.
        let _ = CURRENT.try_with(|current| current.replace(previous));
        let _ = ACTIVE_SCOPES.try_with(|active| active.set(active.get().saturating_sub(1)));
    }
}

/// The current thread's scope, if a wrapper is running.
pub fn current() -> Option<Assume> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Whether a wrapper is running on this thread.
pub fn in_scope() -> bool {
    ACTIVE_SCOPES
        .try_with(|active| active.get() > 0)
        .unwrap_or(false)
}

/// Soft check against the current thread's scope.
///
/// Returns the truth value of `expr` and never panics. Outside of any
/// wrapper there is no test unit to report to, so a failure is only logged.
#[track_caller]
pub fn assume<T: Truthy>(expr: T, message: &str) -> bool {
    match current() {
        Some(scope) => scope.check(expr, message),
        None => unscoped(expr.is_truthy()),
    }
}

#[doc(hidden)]
#[track_caller]
pub fn check_current<T: Truthy>(expr: T, check: Check<'_>) -> bool {
    match current() {
        Some(scope) => scope.check_with(expr, check),
        None => unscoped(expr.is_truthy()),
    }
}

#[track_caller]
fn unscoped(passed: bool) -> bool {
    if !passed {
        let location = Location::caller();
        tracing::warn!(
            location = %location,
            "assumption failed outside of a test invocation scope; not recorded \
             (use Assume::in_thread on helper threads)"
        );
    }
    passed
}
