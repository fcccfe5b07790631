#![doc(
    issue_tracker_base_url = "https://github.com/storyscript/soft-assume/issues/"
)]

//! Reference host runner for `soft-assume`.
//!
//! Test units are run through the invocation wrapper, classified against
//! expected-failure markers and counted.
//!
//! ```
//! use soft_assume::assume;
//! use soft_assume_harness::{format_summary, Runner, TestUnit, XFail};
//!
//! let outcome = Runner::new().with_workers(2).run(vec![
//!     TestUnit::new("adds", |_| {
//!         assume!(1 + 1 == 2);
//!     }),
//!     TestUnit::new("rounds", |_| {
//!         assume!(0.1 + 0.2 == 0.3);
//!     })
//!     .xfail(XFail::new().reason("binary floating point")),
//! ]);
//!
//! assert_eq!(format_summary(&outcome.result), "1 passed, 1 xfailed");
//! ```
//!
//! ## Modules
//!
//! - [`unit`] - Test units and expected-failure markers
//! - [`runner`] - Sequential and multi-worker execution
//! - [`outcome`] - Per-unit classification and run totals
//! - [`expected`] - Expected failures tracking via TOML
//! - [`formatter`] - Failure blocks and the summary line
//! - [`errors`] - Error types for manifest loading

pub mod errors;
pub mod expected;
pub mod formatter;
pub mod outcome;
pub mod runner;
pub mod unit;

// Re-exports for convenient access to core types
pub use errors::{HarnessError, ManifestResult};
pub use expected::{ExpectedFailures, XFailEntry};
pub use formatter::{format_failure, format_run, format_summary};
pub use outcome::{HarnessResult, RunOutcome, UnitReport, UnitStatus};
pub use runner::Runner;
pub use unit::{BoxError, Expectation, TestUnit, XFail};
