//! Runner for executing test units through the invocation wrapper.

use crate::expected::ExpectedFailures;
use crate::outcome::{RunOutcome, UnitReport, UnitStatus};
use crate::unit::{BoxError, Expectation, TestUnit, XFail};
use soft_assume::{Settings, TestInvocationWrapper, UnitOutcome};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::thread;

/// Runs units sequentially or on a pool of worker threads.
///
/// Each unit runs inside its own wrapper invocation on the worker that picked
/// it up, so failures recorded by one unit never reach another.
#[derive(Debug, Clone)]
pub struct Runner {
    workers: usize,
    wrapper: TestInvocationWrapper,
    expected: ExpectedFailures,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            workers: 1,
            wrapper: TestInvocationWrapper::new(),
            expected: ExpectedFailures::default(),
        }
    }

    /// Number of worker threads. Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.wrapper = self.wrapper.with_settings(settings);
        self
    }

    pub fn with_wrapper(mut self, wrapper: TestInvocationWrapper) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Expected-failure manifest consulted for units without their own marker.
    pub fn with_expected(mut self, expected: ExpectedFailures) -> Self {
        self.expected = expected;
        self
    }

    /// Run every unit and return the reports in input order.
    pub fn run(&self, units: Vec<TestUnit>) -> RunOutcome {
        let reports = if self.workers == 1 || units.len() < 2 {
            units.into_iter().map(|unit| self.run_unit(unit)).collect()
        } else {
            self.run_parallel(units)
        };

        let outcome = RunOutcome::from_reports(reports);
        tracing::info!(
            total = outcome.result.total,
            passed = outcome.result.passed,
            failed = outcome.result.failed,
            xfailed = outcome.result.xfailed,
            xpassed = outcome.result.xpassed,
            "run finished"
        );
        outcome
    }

    fn run_parallel(&self, units: Vec<TestUnit>) -> Vec<UnitReport> {
        let total = units.len();
        let queue = Mutex::new(units.into_iter().enumerate().collect::<VecDeque<_>>());
        let slots: Mutex<Vec<Option<UnitReport>>> = Mutex::new((0..total).map(|_| None).collect());

        thread::scope(|scope| {
            for worker in 0..self.workers.min(total) {
                let queue = &queue;
                let slots = &slots;
                scope.spawn(move || loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some((index, unit)) = next else {
                        break;
                    };
                    tracing::trace!(worker, unit = unit.name(), "picked up unit");
                    let report = self.run_unit(unit);
                    slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(report);
                });
            }
        });

        slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .flatten()
            .collect()
    }

    /// Run one unit on the current thread and classify it.
    pub fn run_unit(&self, unit: TestUnit) -> UnitReport {
        let (name, expectation, body) = unit.into_parts();
        let marker = match expectation {
            Expectation::Fail(marker) => Some(marker),
            Expectation::Pass => self.expected.marker_for(&name),
        };

        if let Some(marker) = marker.as_ref().filter(|marker| !marker.run) {
            tracing::debug!(unit = %name, "not run, expected to fail");
            return UnitReport::new(name, UnitStatus::XFailed)
                .with_detail("[NOTRUN]")
                .with_reason(marker.reason.clone());
        }

        let outcome = self.wrapper.invoke(body);
        let report = classify(name, marker.as_ref(), outcome);
        tracing::debug!(unit = %report.name, status = %report.status, "unit finished");
        report
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

/// Text describing why a unit failed, if it did.
fn failure_text(outcome: &UnitOutcome<(), BoxError>) -> Option<String> {
    match outcome {
        UnitOutcome::Passed(()) => None,
        UnitOutcome::HardFailed(failure) => Some(failure.describe().repr().to_string()),
        UnitOutcome::SoftFailed(failure) => Some(failure.report().to_string()),
    }
}

fn classify(name: String, marker: Option<&XFail>, outcome: UnitOutcome<(), BoxError>) -> UnitReport {
    let failure = failure_text(&outcome);
    let reason = marker.and_then(|marker| marker.reason.clone());

    match (marker, failure) {
        (None, None) => UnitReport::new(name, UnitStatus::Passed),
        (None, Some(text)) => UnitReport::new(name, UnitStatus::Failed).with_detail(text),
        (Some(marker), None) if marker.strict => UnitReport::new(name, UnitStatus::Failed)
            .with_detail("[XPASS(strict)]")
            .with_reason(reason),
        (Some(_), None) => UnitReport::new(name, UnitStatus::XPassed).with_reason(reason),
        (Some(marker), Some(text)) if marker.accepts(&text) => {
            UnitReport::new(name, UnitStatus::XFailed)
                .with_detail(text)
                .with_reason(reason)
        }
        (Some(_), Some(text)) => UnitReport::new(name, UnitStatus::Failed)
            .with_detail(text)
            .with_reason(reason),
    }
}
