//! Text rendering of failed assumptions.
//!
//! The layout is fixed so existing tooling that scrapes reports keeps working:
//!
//! ```text
//!
//! Original Failure:
//! >> panicked at tests/login.rs:12:5: boom
//!
//! 2 Failed Assumptions:
//! tests/login.rs:9: AssumptionFailure
//! >>	assume!(a == b);
//!
//! tests/login.rs:10: AssumptionFailure
//! >>	expected a redirect
//! ```

use crate::failure::OriginalFailure;
use crate::record::{CapturedLocal, FailureRecord};
use unicode_width::UnicodeWidthStr;

/// Column width that local names are padded to.
pub const LOCAL_NAME_WIDTH: usize = 10;

/// `"<file>:<line>: AssumptionFailure\n>>\t<context>"`
pub fn render_entry(record: &FailureRecord) -> String {
    format!(
        "{}: AssumptionFailure\n>>\t{}",
        record.location(),
        record.context()
    )
}

/// One `"\t<name> = <value>"` line per local, names left-aligned.
pub fn render_locals(locals: &[CapturedLocal]) -> String {
    locals
        .iter()
        .map(|local| {
            let pad = LOCAL_NAME_WIDTH.saturating_sub(local.name.width());
            format!("\t{}{} = {}", local.name, " ".repeat(pad), local.value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render every record in order.
///
/// With locals capture each record is followed by its `Locals:` block and a
/// blank line; otherwise records are separated by a blank line. A record that
/// captured no locals gets no `Locals:` block.
pub fn render_records(records: &[FailureRecord]) -> String {
    if !records.iter().any(has_locals) {
        return records
            .iter()
            .map(render_entry)
            .collect::<Vec<_>>()
            .join("\n\n");
    }

    let mut output = String::new();
    for record in records {
        match record.captured_locals().filter(|locals| !locals.is_empty()) {
            Some(locals) => output.push_str(&format!(
                "{}\nLocals:\n{}\n\n",
                render_entry(record),
                render_locals(locals)
            )),
            None => output.push_str(&format!("{}\n\n", render_entry(record))),
        }
    }
    output
}

fn has_locals(record: &FailureRecord) -> bool {
    record
        .captured_locals()
        .map_or(false, |locals| !locals.is_empty())
}

/// `"\n<N> Failed Assumptions:\n"`
pub fn render_header(count: usize) -> String {
    format!("\n{} Failed Assumptions:\n", count)
}

/// `"\nOriginal Failure: \n>> <repr>\n"`
pub fn render_original(repr: &str) -> String {
    format!("\nOriginal Failure: \n>> {}\n", repr)
}

/// The complete aggregated report for one test unit.
pub fn render_report(records: &[FailureRecord], original: Option<&OriginalFailure>) -> String {
    let mut output = String::new();

    if let Some(original) = original {
        output.push_str(&render_original(original.repr()));
    }
    output.push_str(&render_header(records.len()));
    output.push_str(&render_records(records));

    if let Some(backtrace) = original.and_then(OriginalFailure::backtrace) {
        output.push_str(&format!("\nOriginal Backtrace:\n{}", backtrace));
    }

    output
}
