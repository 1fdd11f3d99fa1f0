//! Test case registration.

use anyhow::{Result, bail};

use crate::context::TestContext;
use crate::core::types::SourceLocation;

/// Signature of a test body.
pub type TestFn = fn(&TestContext) -> crate::TestResult;

/// A named test body.
#[derive(Debug, Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub location: SourceLocation,
    pub func: TestFn,
}

impl TestCase {
    pub const fn new(name: &'static str, location: SourceLocation, func: TestFn) -> Self {
        Self {
            name,
            location,
            func,
        }
    }
}

/// Ordered collection of test cases, run in registration order.
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a case. Names must be unique within the suite.
    pub fn add(&mut self, case: TestCase) -> Result<&mut Self> {
        if self.cases.iter().any(|existing| existing.name == case.name) {
            bail!("duplicate test case name '{}'", case.name);
        }
        self.cases.push(case);
        Ok(self)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|case| case.name == name)
    }

    /// Cases matching `names` exactly, in the order given; all cases when
    /// `names` is empty.
    pub fn select(&self, names: &[String]) -> Result<Vec<&TestCase>> {
        if names.is_empty() {
            return Ok(self.cases.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| anyhow::anyhow!("no test case named '{}'", name))
            })
            .collect()
    }
}

/// Register a `fn(&TestContext) -> TestResult` under its own name.
#[macro_export]
macro_rules! test_case {
    ($func:path) => {
        $crate::TestCase::new(stringify!($func), $crate::location!(), $func)
    };
    ($name:expr, $func:path) => {
        $crate::TestCase::new($name, $crate::location!(), $func)
    };
}
