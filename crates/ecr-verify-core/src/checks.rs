// crates/ecr-verify-core/src/checks.rs
// ============================================================================
// Module: Check Collector
// Description: Non-aborting assertion recorder for deployed-state checks.
// Purpose: Keep evaluating independent checks after one of them fails.
// Dependencies: crate::comparator
// ============================================================================

//! ## Overview
//! [`Checks`] records the outcome of named assertions against a subject (a
//! component output set or a repository). A failed check never stops later
//! checks; callers inspect the collected failures once verification is done.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::comparator::PolicyComparison;

// ============================================================================
// SECTION: Failures
// ============================================================================

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailure {
    /// Subject under test, e.g. a repository name.
    pub subject: String,
    /// Attribute that diverged.
    pub attribute: String,
    /// Rendered expected value.
    pub expected: String,
    /// Rendered actual value.
    pub actual: String,
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: expected {}, got {}",
            self.subject, self.attribute, self.expected, self.actual
        )
    }
}

// ============================================================================
// SECTION: Collector
// ============================================================================

/// Collected check outcomes for one verification pass.
#[derive(Debug, Clone, Default)]
pub struct Checks {
    /// Number of checks that held.
    passed: usize,
    /// Failed checks in evaluation order.
    failures: Vec<CheckFailure>,
}

impl Checks {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `actual` equals `expected`.
    pub fn equal<T>(&mut self, subject: &str, attribute: &str, expected: &T, actual: &T) -> bool
    where
        T: PartialEq + fmt::Display + ?Sized,
    {
        if expected == actual {
            self.passed += 1;
            return true;
        }
        self.fail(subject, attribute, expected.to_string(), actual.to_string());
        false
    }

    /// Checks that a flag is set.
    pub fn is_true(&mut self, subject: &str, attribute: &str, actual: bool) -> bool {
        self.equal(subject, attribute, &true, &actual)
    }

    /// Checks that a string value is empty.
    pub fn is_empty(&mut self, subject: &str, attribute: &str, actual: &str) -> bool {
        if actual.is_empty() {
            self.passed += 1;
            return true;
        }
        self.fail(subject, attribute, "<empty>", actual);
        false
    }

    /// Records every difference of a policy comparison.
    pub fn policy(&mut self, subject: &str, comparison: &PolicyComparison) -> bool {
        if comparison.is_equal() {
            self.passed += 1;
            return true;
        }
        for difference in comparison.differences() {
            self.fail(
                subject,
                &format!("lifecyclePolicy.{}", difference.path),
                difference.expected.clone(),
                difference.actual.clone(),
            );
        }
        false
    }

    /// Records an unconditional failure.
    pub fn fail(
        &mut self,
        subject: &str,
        attribute: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) {
        self.failures.push(CheckFailure {
            subject: subject.to_string(),
            attribute: attribute.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        });
    }

    /// Appends the outcomes of another collector.
    pub fn merge(&mut self, other: Self) {
        self.passed += other.passed;
        self.failures.extend(other.failures);
    }

    /// Returns the number of checks that held.
    #[must_use]
    pub const fn passed(&self) -> usize {
        self.passed
    }

    /// Returns the failed checks.
    #[must_use]
    pub fn failures(&self) -> &[CheckFailure] {
        &self.failures
    }

    /// Returns true when no check failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consumes the collector, returning the failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<CheckFailure> {
        self.failures
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
