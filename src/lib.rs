#![doc(
    issue_tracker_base_url = "https://github.com/storyscript/soft-assume/issues/"
)]

//! Soft assertions for Rust tests.
//!
//! A soft check records a failure instead of panicking. Every failure of a
//! test unit is reported together when the unit finishes, alongside any hard
//! failure (a panic or returned `Err`) the unit also produced.
//!
//! ```should_panic
//! use soft_assume::assume;
//!
//! soft_assume::run(|_| {
//!     let a = 1;
//!     let b = 2;
//!     assume!(a == b);
//!     assume!(a > b, "a:{} b:{}", a, b);
//! });
//! // panics with:
//! //
//! // 2 Failed Assumptions:
//! // src/lib.rs:8: AssumptionFailure
//! // >>	assume!(a == b);
//! // ...
//! ```
//!
//! ## Modules
//!
//! - [`assume`] - The check primitive and the thread's current scope
//! - [`wrapper`] - Running a test body and aggregating its failures
//! - [`buffer`] - Per-scope storage of failed checks
//! - [`record`] - The record kept for each failed check
//! - [`failure`] - The aggregated failure raised at the end of a unit
//! - [`report`] - Text rendering of failed assumptions
//! - [`callsite`] - Call-site resolution
//! - [`formatter`] - Bounded formatting of captured values
//! - [`config`] - Run-wide settings
//! - [`errors`] - Error types for configuration loading

#[macro_use]
mod macros;

pub mod assume;
pub mod buffer;
pub mod callsite;
pub mod config;
pub mod errors;
pub mod failure;
pub mod formatter;
pub mod record;
pub mod report;
pub mod wrapper;

// Re-exports for convenient access to core types
pub use assume::{assume, current, Assume, AssumptionScope, Check, Truthy};
pub use buffer::AssumptionBuffer;
pub use callsite::{CallSite, CallSiteResolver, CheckSite, SourceCallSiteResolver};
pub use config::Settings;
pub use errors::{AssumeError, AssumeResult};
pub use failure::{AggregatedFailure, OriginalFailure};
pub use formatter::{SafeReprFormatter, ValueFormatter};
pub use record::{CapturedLocal, FailureRecord, RecordLocation};
pub use wrapper::{
    run, run_fallible, HardFailure, PanicFailure, PanicSite, TestInvocationWrapper, UnitOutcome,
};

#[cfg(test)]
mod tests;
