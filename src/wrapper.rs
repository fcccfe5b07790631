//! Bracketing a test unit's execution.
//!
//! [`TestInvocationWrapper::invoke`] runs a body inside a fresh assumption
//! scope, catches any panic, drains the scope exactly once and classifies the
//! result:
//!
//! | body                 | buffer    | outcome                                  |
//! |----------------------|-----------|------------------------------------------|
//! | returns `Ok`         | empty     | [`UnitOutcome::Passed`]                  |
//! | returns `Err`/panics | empty     | [`UnitOutcome::HardFailed`], untouched   |
//! | anything             | non-empty | [`UnitOutcome::SoftFailed`], original kept as source |

use crate::assume::{self, Assume, AssumptionScope};
use crate::callsite::{CallSiteResolver, SourceCallSiteResolver};
use crate::config::Settings;
use crate::failure::{panic_message, AggregatedFailure, OriginalFailure};
use crate::formatter::{SafeReprFormatter, ValueFormatter};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

static PANIC_CAPTURE: Once = Once::new();

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicSite>> = RefCell::new(None);
}

/// Where a caught panic was raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanicSite {
    /// Payload message seen by the hook, used to pair the site with the
    /// payload that was caught.
    pub message: String,
    /// `file:line:column` of the panic.
    pub location: Option<String>,
    /// Backtrace, when `RUST_BACKTRACE` enabled capture.
    pub backtrace: Option<String>,
}

/// Chain a hook in front of the installed panic hook that remembers the
/// panic site on threads running a wrapped body. The previous hook still
/// runs, so the original panic is reported exactly as it would be without
/// this crate.
fn install_panic_capture() {
    PANIC_CAPTURE.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if assume::in_scope() {
                let backtrace = Backtrace::capture();
                let site = PanicSite {
                    message: panic_message(info.payload()),
                    location: info.location().map(|l| l.to_string()),
                    backtrace: match backtrace.status() {
                        BacktraceStatus::Captured => Some(backtrace.to_string()),
                        _ => None,
                    },
                };
                let _ = LAST_PANIC.try_with(|slot| *slot.borrow_mut() = Some(site));
            }
            previous(info);
        }));
    });
}

fn take_last_panic() -> Option<PanicSite> {
    LAST_PANIC
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
}

/// Forget the site of a panic that was caught and handled inside the crate.
pub(crate) fn discard_last_panic() {
    take_last_panic();
}

/// The recorded site, if it belongs to `payload`.
///
/// `resume_unwind` skips the hook, so the slot may still hold an earlier,
/// already caught panic.
fn site_for(payload: &(dyn Any + Send)) -> Option<PanicSite> {
    let message = panic_message(payload);
    take_last_panic().filter(|site| site.message == message)
}

/// A panic caught while running a test body.
pub struct PanicFailure {
    payload: Box<dyn Any + Send>,
    site: Option<PanicSite>,
}

impl PanicFailure {
    pub fn new(payload: Box<dyn Any + Send>, site: Option<PanicSite>) -> Self {
        Self { payload, site }
    }

    pub fn message(&self) -> String {
        panic_message(self.payload.as_ref())
    }

    pub fn site(&self) -> Option<&PanicSite> {
        self.site.as_ref()
    }

    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }

    /// Continue unwinding with the original payload, as if never caught.
    pub fn resume(self) -> ! {
        panic::resume_unwind(self.payload)
    }

    fn describe(&self) -> OriginalFailure {
        let location = self.site.as_ref().and_then(|site| site.location.clone());
        let repr = match &location {
            Some(location) => format!("panicked at {}: {}", location, self.message()),
            None => format!("panicked: {}", self.message()),
        };

        let mut original = OriginalFailure::new(repr);
        if let Some(location) = location {
            original = original.with_location(location);
        }
        if let Some(backtrace) = self.site.as_ref().and_then(|site| site.backtrace.clone()) {
            original = original.with_backtrace(backtrace);
        }
        original
    }
}

impl fmt::Debug for PanicFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicFailure")
            .field("message", &self.message())
            .field("site", &self.site)
            .finish()
    }
}

/// A failure the test body produced on its own.
#[derive(Debug)]
pub enum HardFailure<E> {
    /// The body returned `Err`.
    Error(E),
    /// The body panicked.
    Panic(PanicFailure),
}

impl<E: fmt::Debug> HardFailure<E> {
    /// Description used for the `Original Failure` block.
    pub fn describe(&self) -> OriginalFailure {
        match self {
            HardFailure::Error(err) => OriginalFailure::new(format!("Err({:?})", err)),
            HardFailure::Panic(panic) => panic.describe(),
        }
    }
}

/// Final result of one wrapped test unit.
#[derive(Debug)]
pub enum UnitOutcome<T, E> {
    Passed(T),
    /// The body failed and no assumption failed; the failure is unchanged.
    HardFailed(HardFailure<E>),
    /// At least one assumption failed.
    SoftFailed(AggregatedFailure),
}

impl<T, E> UnitOutcome<T, E> {
    pub fn is_passed(&self) -> bool {
        matches!(self, UnitOutcome::Passed(_))
    }

    pub fn is_soft_failed(&self) -> bool {
        matches!(self, UnitOutcome::SoftFailed(_))
    }

    pub fn aggregated(&self) -> Option<&AggregatedFailure> {
        match self {
            UnitOutcome::SoftFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Runs test bodies inside an assumption scope and aggregates their failures.
#[derive(Clone)]
pub struct TestInvocationWrapper {
    settings: Settings,
    resolver: Arc<dyn CallSiteResolver>,
    formatter: Arc<dyn ValueFormatter>,
}

impl TestInvocationWrapper {
    /// Wrapper using the process-wide settings, the source-reading resolver
    /// and the `Debug` formatter.
    pub fn new() -> Self {
        Self {
            settings: Settings::global().clone(),
            resolver: SourceCallSiteResolver::shared(),
            formatter: Arc::new(SafeReprFormatter),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_resolver<R: CallSiteResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_formatter<F: ValueFormatter + 'static>(mut self, formatter: F) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `body` and classify its result without raising anything.
    pub fn invoke<T, E, F>(&self, body: F) -> UnitOutcome<T, E>
    where
        E: fmt::Debug,
        F: FnOnce(&Assume) -> Result<T, E>,
    {
        install_panic_capture();
        take_last_panic();

        let assume = Assume::new(
            self.settings.clone(),
            Arc::clone(&self.resolver),
            Arc::clone(&self.formatter),
        );
        let mut scope = AssumptionScope::enter(assume.clone());
        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&assume)));
        let records = scope.finish();
        drop(scope);

        let hard = match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(HardFailure::Error(err)),
            Err(payload) => {
                let site = site_for(payload.as_ref());
                Err(HardFailure::Panic(PanicFailure::new(payload, site)))
            }
        };

        if records.is_empty() {
            return match hard {
                Ok(value) => UnitOutcome::Passed(value),
                Err(failure) => UnitOutcome::HardFailed(failure),
            };
        }

        let original = hard.err().map(|failure| failure.describe());
        UnitOutcome::SoftFailed(AggregatedFailure::new(records, original))
    }

    /// Run `body` the way a test runner expects: return normally on success,
    /// re-raise an untouched panic, or panic with the aggregated report.
    #[track_caller]
    pub fn run<F>(&self, body: F)
    where
        F: FnOnce(&Assume),
    {
        match self.invoke(|assume| {
            body(assume);
            Ok::<(), Infallible>(())
        }) {
            UnitOutcome::Passed(()) => {}
            UnitOutcome::HardFailed(HardFailure::Panic(panic)) => panic.resume(),
            UnitOutcome::HardFailed(HardFailure::Error(never)) => match never {},
            UnitOutcome::SoftFailed(failure) => failure.raise(),
        }
    }

    /// [`TestInvocationWrapper::run`] for bodies returning `Result`.
    ///
    /// With no failed assumptions an `Err` is returned unchanged. With failed
    /// assumptions the aggregated report is raised as a panic and carries the
    /// `Err` as its original failure.
    #[track_caller]
    pub fn run_fallible<T, E, F>(&self, body: F) -> Result<T, E>
    where
        E: fmt::Debug,
        F: FnOnce(&Assume) -> Result<T, E>,
    {
        match self.invoke(body) {
            UnitOutcome::Passed(value) => Ok(value),
            UnitOutcome::HardFailed(HardFailure::Error(err)) => Err(err),
            UnitOutcome::HardFailed(HardFailure::Panic(panic)) => panic.resume(),
            UnitOutcome::SoftFailed(failure) => failure.raise(),
        }
    }
}

impl Default for TestInvocationWrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TestInvocationWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestInvocationWrapper")
            .field("settings", &self.settings)
            .finish()
    }
}

/// Run a test body with the default wrapper. See [`TestInvocationWrapper::run`].
#[track_caller]
pub fn run<F>(body: F)
where
    F: FnOnce(&Assume),
{
    TestInvocationWrapper::new().run(body)
}

/// Run a fallible test body with the default wrapper. See
/// [`TestInvocationWrapper::run_fallible`].
#[track_caller]
pub fn run_fallible<T, E, F>(body: F) -> Result<T, E>
where
    E: fmt::Debug,
    F: FnOnce(&Assume) -> Result<T, E>,
{
    TestInvocationWrapper::new().run_fallible(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callsite::{CallSite, CheckSite};

    /// Resolver that never touches the file system.
    struct FixedResolver;

    impl CallSiteResolver for FixedResolver {
        fn resolve(&self, site: &CheckSite<'_>) -> CallSite {
            CallSite {
                file: "tests/fixed.rs".to_string(),
                line: 7,
                column: 1,
                function: site.function.map(str::to_string),
                source_line: Some("    fixed(source);".to_string()),
            }
        }
    }

    fn wrapper() -> TestInvocationWrapper {
        TestInvocationWrapper::new()
            .with_settings(Settings::default())
            .with_resolver(FixedResolver)
    }

    #[test]
    fn test_all_checks_pass() {
        let outcome = wrapper().invoke(|cx| {
            cx.check(1 == 1, "");
            cx.check(true, "never shown");
            Ok::<_, Infallible>(5)
        });
        assert!(matches!(outcome, UnitOutcome::Passed(5)));
    }

    #[test]
    fn test_soft_failures_in_order() {
        let outcome = wrapper().invoke(|cx| {
            cx.check(false, "first");
            cx.check(true, "skipped");
            cx.check(false, "second");
            cx.check(false, "");
            Ok::<_, Infallible>(())
        });

        let failure = outcome.aggregated().unwrap();
        assert_eq!(failure.count(), 3);
        let contexts: Vec<&str> = failure.records().iter().map(|r| r.context()).collect();
        assert_eq!(contexts, vec!["first", "second", "fixed(source);"]);
        assert!(failure.original().is_none());
        assert!(failure.report().starts_with("\n3 Failed Assumptions:\n"));
    }

    #[test]
    fn test_error_without_soft_failures_is_untouched() {
        let outcome = wrapper().invoke(|_| Err::<(), _>("database unavailable"));
        match outcome {
            UnitOutcome::HardFailed(HardFailure::Error(err)) => {
                assert_eq!(err, "database unavailable")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_panic_without_soft_failures_is_untouched() {
        let outcome = wrapper().invoke(|_| -> Result<(), Infallible> { panic!("boom") });
        match outcome {
            UnitOutcome::HardFailed(HardFailure::Panic(panic)) => {
                assert_eq!(panic.message(), "boom");
                assert_eq!(panic.into_payload().downcast_ref::<&str>(), Some(&"boom"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_soft_failure_with_error_keeps_original() {
        let outcome = wrapper().invoke(|cx| {
            cx.check(false, "soft");
            Err::<(), _>("hard")
        });

        let failure = outcome.aggregated().unwrap();
        assert_eq!(failure.count(), 1);
        assert_eq!(failure.original().unwrap().repr(), "Err(\"hard\")");
        assert!(failure
            .report()
            .starts_with("\nOriginal Failure: \n>> Err(\"hard\")\n\n1 Failed Assumptions:\n"));
    }

    #[test]
    fn test_soft_failure_with_panic_keeps_location() {
        let panic_line = line!() + 3;
        let outcome = wrapper().invoke(|cx| -> Result<(), Infallible> {
            cx.check(false, "soft");
            panic!("hard failure");
        });

        let failure = outcome.aggregated().unwrap();
        let original = failure.original().unwrap();
        let expected_location = format!("src/wrapper.rs:{}:13", panic_line);
        assert_eq!(original.location(), Some(expected_location.as_str()));
        assert_eq!(
            original.repr(),
            format!("panicked at {}: hard failure", expected_location)
        );
        assert!(failure.report().contains("1 Failed Assumptions"));
        assert!(failure.report().contains("hard failure"));
    }

    #[test]
    fn test_resumed_payload_ignores_stale_panic_site() {
        let outcome = wrapper().invoke(|cx| -> Result<(), Infallible> {
            let inner = panic::catch_unwind(|| panic!("expected inner panic"));
            assert!(inner.is_err());
            cx.check(false, "soft");
            panic::resume_unwind(Box::new("real failure"))
        });

        let original = outcome.aggregated().unwrap().original().unwrap();
        assert_eq!(original.location(), None);
        assert_eq!(original.repr(), "panicked: real failure");
    }

    #[test]
    fn test_formatter_panic_does_not_become_original_site() {
        struct Exploding;

        impl fmt::Debug for Exploding {
            fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
                panic!("real failure")
            }
        }

        let outcome = wrapper()
            .with_settings(Settings::default().show_locals(true))
            .invoke(|cx| -> Result<(), Infallible> {
                let value = Exploding;
                let locals: &[(&'static str, &dyn fmt::Debug)] = &[("value", &value)];
                cx.check_with(
                    false,
                    crate::Check {
                        locals,
                        ..crate::Check::default()
                    },
                );
                panic::resume_unwind(Box::new("real failure"))
            });

        let failure = outcome.aggregated().unwrap();
        assert_eq!(failure.original().unwrap().location(), None);
        assert!(failure.records()[0].captured_locals().unwrap()[0]
            .value
            .starts_with("<unprintable value: Debug implementation panicked: real failure"));
    }

    #[test]
    fn test_buffer_is_fresh_per_invocation() {
        let wrapper = wrapper();
        let first = wrapper.invoke(|cx| {
            cx.check(false, "only in first");
            Ok::<_, Infallible>(())
        });
        assert_eq!(first.aggregated().unwrap().count(), 1);

        let second = wrapper.invoke(|cx| {
            assert_eq!(cx.pending(), 0);
            Ok::<_, Infallible>(())
        });
        assert!(second.is_passed());
    }

    #[test]
    fn test_run_passes_through() {
        wrapper().run(|cx| {
            cx.check(true, "");
        });
        assert_eq!(wrapper().run_fallible(|_| Ok::<_, String>(3)), Ok(3));
        assert_eq!(
            wrapper().run_fallible(|_| Err::<(), _>("no".to_string())),
            Err("no".to_string())
        );
    }

    #[test]
    #[should_panic(expected = "1 Failed Assumptions:")]
    fn test_run_raises_aggregated_failure() {
        wrapper().run(|cx| {
            cx.check(false, "");
        });
    }

    #[test]
    #[should_panic(expected = "original panic")]
    fn test_run_resumes_original_panic() {
        wrapper().run(|_| panic!("original panic"));
    }

    #[test]
    fn test_raised_report_is_string_payload() {
        let payload = panic::catch_unwind(|| {
            wrapper().run(|cx| {
                cx.check(false, "checked");
            })
        })
        .unwrap_err();

        let message = payload.downcast_ref::<String>().unwrap();
        assert!(message.contains("1 Failed Assumptions:"));
        assert!(message.contains(">>\tchecked"));
    }

    #[test]
    fn test_scope_is_removed_after_invoke() {
        let _ = wrapper().invoke(|_| -> Result<(), Infallible> { panic!("gone") });
        assert!(assume::current().is_none());
        assert!(!assume::in_scope());
    }
}
