// crates/ecr-verify-core/src/policy.rs
// ============================================================================
// Module: Lifecycle Policy Model
// Description: Typed model and JSON codec for registry lifecycle policies.
// Purpose: Decode live retention rules and describe expected ones.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A lifecycle policy is an ordered list of rules. Each rule selects images by
//! tag status and a count condition and applies an action (only `expire` has
//! been observed). Decoding ignores unknown fields and leaves absent optional
//! fields as `None`, so decode → encode → decode is stable.
//!
//! The action is kept as an open string map: the registry grammar may grow
//! new action kinds and the comparator treats the map as plain data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Action map key naming the action kind.
pub const ACTION_TYPE_KEY: &str = "type";
/// Action kind that expires matched images.
pub const ACTION_EXPIRE: &str = "expire";
/// Count unit used with [`CountType::SinceImagePushed`].
pub const COUNT_UNIT_DAYS: &str = "days";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Lifecycle policy codec errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy document is not a well-formed lifecycle policy.
    #[error("lifecycle policy decode failed: {0}")]
    Decode(String),
    /// The policy could not be serialized.
    #[error("lifecycle policy encode failed: {0}")]
    Encode(String),
}

/// Structural invariant violations reported by [`LifecyclePolicy::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// Two rules share the same priority.
    #[error("rule priority {priority} is used more than once")]
    DuplicatePriority {
        /// Offending priority.
        priority: u32,
    },
    /// A tag list is set on a rule that does not select tagged images.
    #[error("rule {priority} sets a tag list but selects {tag_status} images")]
    TagListWithoutTagged {
        /// Rule priority.
        priority: u32,
        /// Tag status declared by the rule.
        tag_status: TagStatus,
    },
    /// A rule selecting tagged images declares neither prefixes nor patterns.
    #[error("rule {priority} selects tagged images without a prefix or pattern list")]
    TaggedWithoutTagList {
        /// Rule priority.
        priority: u32,
    },
    /// A rule declares both a prefix list and a pattern list.
    #[error("rule {priority} declares both tagPrefixList and tagPatternList")]
    ConflictingTagLists {
        /// Rule priority.
        priority: u32,
    },
    /// A count unit is set on a count-based rule.
    #[error("rule {priority} sets countUnit with countType {count_type}")]
    CountUnitWithoutAge {
        /// Rule priority.
        priority: u32,
        /// Count type declared by the rule.
        count_type: CountType,
    },
    /// An age-based rule does not declare its unit.
    #[error("rule {priority} uses sinceImagePushed without countUnit")]
    AgeWithoutCountUnit {
        /// Rule priority.
        priority: u32,
    },
    /// The count threshold is zero.
    #[error("rule {priority} has a zero countNumber")]
    ZeroCountNumber {
        /// Rule priority.
        priority: u32,
    },
    /// The action map does not name an action kind.
    #[error("rule {priority} has no action type")]
    MissingActionType {
        /// Rule priority.
        priority: u32,
    },
}

// ============================================================================
// SECTION: Selection Enums
// ============================================================================

/// Tag status matched by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    /// Images carrying at least one tag.
    Tagged,
    /// Images without tags.
    Untagged,
    /// Every image.
    Any,
}

impl TagStatus {
    /// Returns the wire name of the tag status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tagged => "tagged",
            Self::Untagged => "untagged",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for TagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count condition applied by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CountType {
    /// Expire once more than `countNumber` images match.
    ImageCountMoreThan,
    /// Expire images older than `countNumber` `countUnit`s.
    SinceImagePushed,
}

impl CountType {
    /// Returns the wire name of the count type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImageCountMoreThan => "imageCountMoreThan",
            Self::SinceImagePushed => "sinceImagePushed",
        }
    }
}

impl fmt::Display for CountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Policy Types
// ============================================================================

/// Image selection criteria for a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Tag status matched by the rule.
    pub tag_status: TagStatus,
    /// Tag prefixes matched when `tag_status` is tagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_prefix_list: Option<Vec<String>>,
    /// Tag glob patterns matched when `tag_status` is tagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_pattern_list: Option<Vec<String>>,
    /// Count condition.
    pub count_type: CountType,
    /// Unit for age-based conditions, e.g. `days`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_unit: Option<String>,
    /// Count threshold.
    pub count_number: u32,
}

impl Selection {
    /// Selects images once more than `count` of them match `tag_status`.
    #[must_use]
    pub const fn image_count_more_than(tag_status: TagStatus, count: u32) -> Self {
        Self {
            tag_status,
            tag_prefix_list: None,
            tag_pattern_list: None,
            count_type: CountType::ImageCountMoreThan,
            count_unit: None,
            count_number: count,
        }
    }

    /// Selects images matching `tag_status` pushed more than `days` days ago.
    #[must_use]
    pub fn since_image_pushed_days(tag_status: TagStatus, days: u32) -> Self {
        Self {
            tag_status,
            tag_prefix_list: None,
            tag_pattern_list: None,
            count_type: CountType::SinceImagePushed,
            count_unit: Some(COUNT_UNIT_DAYS.to_string()),
            count_number: days,
        }
    }

    /// Restricts the selection to the given tag prefixes.
    #[must_use]
    pub fn with_tag_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_prefix_list = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the selection to the given tag glob patterns.
    #[must_use]
    pub fn with_tag_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_pattern_list = Some(patterns.into_iter().map(Into::into).collect());
        self
    }
}

/// Single retention rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Evaluation precedence; lower values are evaluated first.
    pub rule_priority: u32,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Image selection criteria.
    pub selection: Selection,
    /// Action applied to selected images.
    #[serde(default)]
    pub action: BTreeMap<String, String>,
}

impl Rule {
    /// Builds a rule that expires the selected images.
    #[must_use]
    pub fn expire(priority: u32, description: impl Into<String>, selection: Selection) -> Self {
        let mut action = BTreeMap::new();
        action.insert(ACTION_TYPE_KEY.to_string(), ACTION_EXPIRE.to_string());
        Self {
            rule_priority: priority,
            description: description.into(),
            selection,
            action,
        }
    }

    /// Returns the action kind, if declared.
    #[must_use]
    pub fn action_type(&self) -> Option<&str> {
        self.action.get(ACTION_TYPE_KEY).map(String::as_str)
    }
}

/// Ordered set of retention rules attached to a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    /// Rules in declaration order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl LifecyclePolicy {
    /// Builds a policy from rules in declaration order.
    #[must_use]
    pub const fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
        }
    }

    /// Decodes a policy document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Decode`] when the document is not valid JSON or
    /// lacks a required rule field.
    pub fn from_json(text: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(text).map_err(|err| PolicyError::Decode(err.to_string()))
    }

    /// Encodes the policy as a compact JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Encode`] when serialization fails.
    pub fn to_json(&self) -> Result<String, PolicyError> {
        serde_json::to_string(self).map_err(|err| PolicyError::Encode(err.to_string()))
    }

    /// Returns the rule with the given priority.
    #[must_use]
    pub fn rule_by_priority(&self, priority: u32) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.rule_priority == priority)
    }

    /// Reports every structural invariant the policy violates.
    #[must_use]
    pub fn validate(&self) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        let mut seen = BTreeSet::new();
        for rule in &self.rules {
            let priority = rule.rule_priority;
            if !seen.insert(priority) {
                violations.push(PolicyViolation::DuplicatePriority {
                    priority,
                });
            }
            validate_selection(priority, &rule.selection, &mut violations);
            if rule.action_type().is_none() {
                violations.push(PolicyViolation::MissingActionType {
                    priority,
                });
            }
        }
        violations
    }
}

/// Appends selection-level violations for one rule.
fn validate_selection(priority: u32, selection: &Selection, out: &mut Vec<PolicyViolation>) {
    let has_prefixes = selection.tag_prefix_list.is_some();
    let has_patterns = selection.tag_pattern_list.is_some();
    match selection.tag_status {
        TagStatus::Tagged => {
            if !has_prefixes && !has_patterns {
                out.push(PolicyViolation::TaggedWithoutTagList {
                    priority,
                });
            }
        }
        tag_status @ (TagStatus::Untagged | TagStatus::Any) => {
            if has_prefixes || has_patterns {
                out.push(PolicyViolation::TagListWithoutTagged {
                    priority,
                    tag_status,
                });
            }
        }
    }
    if has_prefixes && has_patterns {
        out.push(PolicyViolation::ConflictingTagLists {
            priority,
        });
    }
    match (selection.count_type, selection.count_unit.is_some()) {
        (CountType::SinceImagePushed, false) => {
            out.push(PolicyViolation::AgeWithoutCountUnit {
                priority,
            });
        }
        (count_type @ CountType::ImageCountMoreThan, true) => {
            out.push(PolicyViolation::CountUnitWithoutAge {
                priority,
                count_type,
            });
        }
        _ => {}
    }
    if selection.count_number == 0 {
        out.push(PolicyViolation::ZeroCountNumber {
            priority,
        });
    }
}
