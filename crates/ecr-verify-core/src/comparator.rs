// crates/ecr-verify-core/src/comparator.rs
// ============================================================================
// Module: Lifecycle Policy Comparator
// Description: Deep, ordered comparison of lifecycle policies.
// Purpose: Report every field where a live policy diverges from expectation.
// Dependencies: crate::policy, serde, serde_json
// ============================================================================

//! ## Overview
//! The comparator walks expected and actual policies rule by rule in
//! declaration order. Every diverging field is reported with a path such as
//! `rules[0].selection.countNumber`. An absent tag list differs from an empty
//! one, and missing or extra rules are reported as whole-rule differences.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::policy::LifecyclePolicy;
use crate::policy::Rule;
use crate::policy::Selection;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rendering used for fields or rules that are not present.
pub const ABSENT: &str = "<absent>";

// ============================================================================
// SECTION: Comparison Result
// ============================================================================

/// One diverging field between two policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDifference {
    /// Field path, e.g. `rules[1].selection.tagStatus`.
    pub path: String,
    /// Rendered expected value.
    pub expected: String,
    /// Rendered actual value.
    pub actual: String,
}

impl fmt::Display for PolicyDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.path, self.expected, self.actual)
    }
}

/// Outcome of comparing an expected policy with an actual one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyComparison {
    /// Differences in traversal order.
    differences: Vec<PolicyDifference>,
}

impl PolicyComparison {
    /// Returns true when the policies are structurally identical.
    #[must_use]
    pub fn is_equal(&self) -> bool {
        self.differences.is_empty()
    }

    /// Returns every difference in traversal order.
    #[must_use]
    pub fn differences(&self) -> &[PolicyDifference] {
        &self.differences
    }

    /// Returns the first difference, if any.
    #[must_use]
    pub fn first(&self) -> Option<&PolicyDifference> {
        self.differences.first()
    }
}

impl fmt::Display for PolicyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.differences.is_empty() {
            return f.write_str("policies are equal");
        }
        for (index, difference) in self.differences.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{difference}")?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares `actual` against `expected`, collecting every difference.
#[must_use]
pub fn compare_policies(expected: &LifecyclePolicy, actual: &LifecyclePolicy) -> PolicyComparison {
    let mut differences = Vec::new();
    let longest = expected.rules.len().max(actual.rules.len());
    for index in 0 .. longest {
        let path = format!("rules[{index}]");
        match (expected.rules.get(index), actual.rules.get(index)) {
            (Some(expected_rule), Some(actual_rule)) => {
                compare_rules(&path, expected_rule, actual_rule, &mut differences);
            }
            (Some(expected_rule), None) => differences.push(PolicyDifference {
                path,
                expected: describe_rule(expected_rule),
                actual: ABSENT.to_string(),
            }),
            (None, Some(actual_rule)) => differences.push(PolicyDifference {
                path,
                expected: ABSENT.to_string(),
                actual: describe_rule(actual_rule),
            }),
            (None, None) => {}
        }
    }
    PolicyComparison {
        differences,
    }
}

/// Compares two rules at the same position.
fn compare_rules(path: &str, expected: &Rule, actual: &Rule, out: &mut Vec<PolicyDifference>) {
    push_if_diff(
        out,
        format!("{path}.rulePriority"),
        &expected.rule_priority,
        &actual.rule_priority,
    );
    push_if_diff(out, format!("{path}.description"), &expected.description, &actual.description);
    compare_selections(&format!("{path}.selection"), &expected.selection, &actual.selection, out);

    let keys: BTreeSet<&String> = expected.action.keys().chain(actual.action.keys()).collect();
    for key in keys {
        push_if_diff(
            out,
            format!("{path}.action.{key}"),
            &expected.action.get(key),
            &actual.action.get(key),
        );
    }
}

/// Compares two selections field by field.
fn compare_selections(
    path: &str,
    expected: &Selection,
    actual: &Selection,
    out: &mut Vec<PolicyDifference>,
) {
    push_if_diff(out, format!("{path}.tagStatus"), &expected.tag_status, &actual.tag_status);
    push_if_diff(
        out,
        format!("{path}.tagPrefixList"),
        &expected.tag_prefix_list,
        &actual.tag_prefix_list,
    );
    push_if_diff(
        out,
        format!("{path}.tagPatternList"),
        &expected.tag_pattern_list,
        &actual.tag_pattern_list,
    );
    push_if_diff(out, format!("{path}.countType"), &expected.count_type, &actual.count_type);
    push_if_diff(out, format!("{path}.countUnit"), &expected.count_unit, &actual.count_unit);
    push_if_diff(out, format!("{path}.countNumber"), &expected.count_number, &actual.count_number);
}

/// Records a difference when the two values are not equal.
fn push_if_diff<T>(out: &mut Vec<PolicyDifference>, path: String, expected: &T, actual: &T)
where
    T: PartialEq + Serialize + ?Sized,
{
    if expected != actual {
        out.push(PolicyDifference {
            path,
            expected: render(expected),
            actual: render(actual),
        });
    }
}

/// Renders a value as compact JSON, using [`ABSENT`] for `null`.
fn render<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::Null) => ABSENT.to_string(),
        Ok(value) => value.to_string(),
        Err(err) => format!("<unrenderable: {err}>"),
    }
}

/// Short description of a whole rule for missing/extra reports.
fn describe_rule(rule: &Rule) -> String {
    if rule.description.is_empty() {
        format!("rule priority {}", rule.rule_priority)
    } else {
        format!("rule priority {} ({})", rule.rule_priority, rule.description)
    }
}
