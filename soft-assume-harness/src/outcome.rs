//! Per-unit outcomes and run totals.

use std::fmt;

/// Final classification of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Passed,
    Failed,
    /// Failed as its expected-failure marker said it would.
    XFailed,
    /// Passed despite a non-strict expected-failure marker.
    XPassed,
}

impl UnitStatus {
    pub fn label(&self) -> &'static str {
        match self {
            UnitStatus::Passed => "passed",
            UnitStatus::Failed => "failed",
            UnitStatus::XFailed => "xfailed",
            UnitStatus::XPassed => "xpassed",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened to one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub name: String,
    pub status: UnitStatus,
    /// Failure text: the aggregated report, or the untouched hard failure.
    pub detail: Option<String>,
    /// Reason from the expected-failure marker.
    pub reason: Option<String>,
}

impl UnitReport {
    pub fn new(name: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            name: name.into(),
            status,
            detail: None,
            reason: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub xfailed: usize,
    pub xpassed: usize,
}

impl HarnessResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: UnitStatus) {
        self.total += 1;
        match status {
            UnitStatus::Passed => self.passed += 1,
            UnitStatus::Failed => self.failed += 1,
            UnitStatus::XFailed => self.xfailed += 1,
            UnitStatus::XPassed => self.xpassed += 1,
        }
    }

    /// Get the exit code (0 = pass, 1 = failures).
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }

    /// Expected failures and unexpected passes do not fail a run.
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Everything a run produced, in input order.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub units: Vec<UnitReport>,
    pub result: HarnessResult,
}

impl RunOutcome {
    pub fn from_reports(units: Vec<UnitReport>) -> Self {
        let mut result = HarnessResult::new();
        for unit in &units {
            result.record(unit.status);
        }
        Self { units, result }
    }

    pub fn get(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|unit| unit.name == name)
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units
            .iter()
            .filter(|unit| unit.status == UnitStatus::Failed)
    }
}
