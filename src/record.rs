//! The record kept for each failed check.

use std::fmt;

/// Where a failed check was called from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordLocation {
    /// File path, relative to the project root when possible.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl RecordLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A local binding captured when a check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLocal {
    /// Binding name as written at the call site.
    pub name: String,
    /// Formatted value at the moment of the check.
    pub value: String,
}

impl CapturedLocal {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One failed soft check.
///
/// Records are immutable once built: the buffer hands them out by value on
/// drain and nothing else touches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    location: RecordLocation,
    context: String,
    captured_locals: Option<Vec<CapturedLocal>>,
}

impl FailureRecord {
    /// Create a record with the source text or message describing the check.
    pub fn new(location: RecordLocation, context: impl Into<String>) -> Self {
        Self {
            location,
            context: context.into(),
            captured_locals: None,
        }
    }

    /// Attach the locals captured at the call site.
    pub fn with_locals(mut self, locals: Vec<CapturedLocal>) -> Self {
        self.captured_locals = Some(locals);
        self
    }

    pub fn location(&self) -> &RecordLocation {
        &self.location
    }

    /// The caller's message, or the call-site source text when none was given.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Captured locals, present only when locals capture was enabled.
    pub fn captured_locals(&self) -> Option<&[CapturedLocal]> {
        self.captured_locals.as_deref()
    }
}
