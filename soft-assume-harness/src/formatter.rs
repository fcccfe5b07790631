//! Text output for a finished run.

use crate::outcome::{HarnessResult, RunOutcome, UnitReport, UnitStatus};

/// Format a failed unit with its failure text.
pub fn format_failure(report: &UnitReport) -> String {
    let mut output = format!("\nFAIL: {}\n", report.name);
    if let Some(detail) = &report.detail {
        output.push_str(detail);
        output.push('\n');
    }
    output
}

/// One-line totals, e.g. `1 failed, 2 passed, 1 xfailed`.
///
/// Zero counts are left out.
pub fn format_summary(result: &HarnessResult) -> String {
    let parts: Vec<String> = [
        (result.failed, UnitStatus::Failed),
        (result.passed, UnitStatus::Passed),
        (result.xfailed, UnitStatus::XFailed),
        (result.xpassed, UnitStatus::XPassed),
    ]
    .iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, status)| format!("{} {}", count, status.label()))
    .collect();

    if parts.is_empty() {
        "no tests ran".to_string()
    } else {
        parts.join(", ")
    }
}

/// Every failure block followed by the summary line.
pub fn format_run(outcome: &RunOutcome) -> String {
    let mut output: String = outcome.failures().map(format_failure).collect();
    output.push('\n');
    output.push_str(&format_summary(&outcome.result));
    output
}
