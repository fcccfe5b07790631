//! The aggregated failure raised at the end of a test unit.

use crate::record::FailureRecord;
use crate::report;
use std::any::Any;
use thiserror::Error;

/// The hard failure that was already in flight when soft failures were
/// aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{repr}")]
pub struct OriginalFailure {
    repr: String,
    location: Option<String>,
    stack: Option<String>,
}

impl OriginalFailure {
    pub fn new(repr: impl Into<String>) -> Self {
        Self {
            repr: repr.into(),
            location: None,
            stack: None,
        }
    }

    /// Where the original panic was raised, as `file:line:column`.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Backtrace captured when the original panic was raised.
    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.stack = Some(backtrace.into());
        self
    }

    /// One-line description used in the `Original Failure` block.
    pub fn repr(&self) -> &str {
        &self.repr
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn backtrace(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

/// Every soft failure of one test unit, plus the hard failure if there was one.
///
/// `Display` is the full report; the hard failure is exposed as the error
/// `source`.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct AggregatedFailure {
    records: Vec<FailureRecord>,
    #[source]
    original: Option<OriginalFailure>,
    report: String,
}

impl AggregatedFailure {
    /// Aggregate drained records. `records` is expected to be non-empty.
    pub fn new(records: Vec<FailureRecord>, original: Option<OriginalFailure>) -> Self {
        let report = report::render_report(&records, original.as_ref());
        Self {
            records,
            original,
            report,
        }
    }

    /// Number of failed assumptions.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Failed assumptions in the order they were recorded.
    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    /// Each failed assumption rendered as one report entry.
    pub fn entries(&self) -> Vec<String> {
        self.records.iter().map(report::render_entry).collect()
    }

    pub fn original(&self) -> Option<&OriginalFailure> {
        self.original.as_ref()
    }

    pub fn report(&self) -> &str {
        &self.report
    }

    /// Fail the running test with the rendered report.
    ///
    /// The panic payload is a plain `String`, so `#[should_panic(expected =
    /// "...")]` and other expected-failure matching see it like any other
    /// panic.
    #[track_caller]
    pub fn raise(self) -> ! {
        panic!("{}", self.report)
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
