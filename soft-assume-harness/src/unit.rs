//! Test units and expected-failure markers.

use serde::{Deserialize, Serialize};
use soft_assume::Assume;
use std::fmt;

/// Error type returned by fallible unit bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type Body = Box<dyn FnOnce(&Assume) -> Result<(), BoxError> + Send + 'static>;

/// Expected-failure marker.
///
/// A marked unit that fails is reported `xfailed`; one that passes is
/// `xpassed`, or `failed` when the marker is strict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XFail {
    pub reason: Option<String>,
    /// Report an unexpected pass as a failure.
    pub strict: bool,
    /// When false the body is not executed at all.
    pub run: bool,
    /// Only failures whose text contains this string count as expected.
    pub matches: Option<String>,
}

impl XFail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn run(mut self, run: bool) -> Self {
        self.run = run;
        self
    }

    pub fn matches(mut self, needle: impl Into<String>) -> Self {
        self.matches = Some(needle.into());
        self
    }

    /// Whether `failure_text` is the kind of failure this marker expects.
    pub fn accepts(&self, failure_text: &str) -> bool {
        match &self.matches {
            Some(needle) => failure_text.contains(needle.as_str()),
            None => true,
        }
    }
}

impl Default for XFail {
    fn default() -> Self {
        Self {
            reason: None,
            strict: false,
            run: true,
            matches: None,
        }
    }
}

/// What the host expects of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Expectation {
    #[default]
    Pass,
    Fail(XFail),
}

/// One independently executed test case.
pub struct TestUnit {
    name: String,
    expectation: Expectation,
    body: Body,
}

impl TestUnit {
    /// A unit whose body only fails by panicking or through soft checks.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&Assume) + Send + 'static,
    {
        Self::fallible(name, move |assume| {
            body(assume);
            Ok(())
        })
    }

    /// A unit whose body may also return an error.
    pub fn fallible<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&Assume) -> Result<(), BoxError> + Send + 'static,
    {
        Self {
            name: name.into(),
            expectation: Expectation::Pass,
            body: Box::new(body),
        }
    }

    /// Mark the unit as expected to fail.
    pub fn xfail(mut self, marker: XFail) -> Self {
        self.expectation = Expectation::Fail(marker);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }

    pub(crate) fn into_parts(self) -> (String, Expectation, Body) {
        (self.name, self.expectation, self.body)
    }
}

impl fmt::Debug for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestUnit")
            .field("name", &self.name)
            .field("expectation", &self.expectation)
            .finish()
    }
}
