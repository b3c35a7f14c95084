// system-tests/src/driver.rs
// ============================================================================
// Module: Deployment Driver
// Description: Interface to the tool that provisions and destroys components.
// Purpose: Decouple case orchestration from the concrete deployment tool.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`DeploymentDriver`] provisions a [`ComponentCase`] (component path,
//! stack, and input map), exposes its outputs, re-plans it for drift, counts
//! managed resources, and tears it down. Calls block until the tool returns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Input key toggling every resource of a component.
pub const ENABLED_INPUT: &str = "enabled";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Deployment driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The tool could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The tool exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The input var-file could not be written.
    #[error("failed to write input file: {0}")]
    Inputs(String),
    /// The output document could not be parsed.
    #[error("invalid output document: {0}")]
    Outputs(String),
    /// A named output is not present.
    #[error("missing output `{0}`")]
    MissingOutput(String),
    /// A named output does not have the requested shape.
    #[error("output `{name}` has unexpected shape: {reason}")]
    OutputShape {
        /// Output name.
        name: String,
        /// Decoding failure.
        reason: String,
    },
}

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Input variables passed to a component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentInputs {
    /// Variables by name.
    values: Map<String, Value>,
}

impl ComponentInputs {
    /// Creates an empty input map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Sets a list-of-strings variable.
    #[must_use]
    pub fn with_strings<I, S>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = values.into_iter().map(|value| Value::String(value.into())).collect();
        self.with(name, Value::Array(list))
    }

    /// Returns a copy with the component's resources switched off.
    #[must_use]
    pub fn disabled(self) -> Self {
        self.with(ENABLED_INPUT, Value::Bool(false))
    }

    /// Returns the variable map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Returns a variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns true when no variable is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// SECTION: Component Case
// ============================================================================

/// A component deployed into a stack with a fixed input map.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentCase {
    /// Component path, e.g. `ecr/basic`.
    pub component: String,
    /// Stack name, e.g. `default-test`.
    pub stack: String,
    /// Input variables.
    pub inputs: ComponentInputs,
    /// Re-plan after verification and require no pending changes.
    pub drift_check: bool,
}

impl ComponentCase {
    /// Creates a case without a drift check.
    #[must_use]
    pub fn new(
        component: impl Into<String>,
        stack: impl Into<String>,
        inputs: ComponentInputs,
    ) -> Self {
        Self {
            component: component.into(),
            stack: stack.into(),
            inputs,
            drift_check: false,
        }
    }

    /// Enables the post-verification drift check.
    #[must_use]
    pub const fn with_drift_check(mut self) -> Self {
        self.drift_check = true;
        self
    }

    /// Returns a copy with the component disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.inputs = self.inputs.disabled();
        self
    }
}

impl fmt::Display for ComponentCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.component, self.stack)
    }
}

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Named outputs of a deployed component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeploymentOutputs {
    /// Output values by name.
    values: BTreeMap<String, Value>,
}

impl DeploymentOutputs {
    /// Builds outputs from already-unwrapped values.
    #[must_use]
    pub const fn new(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
        }
    }

    /// Parses a `terraform output -json` document.
    ///
    /// Each entry is an object whose `value` field carries the output; `null`
    /// values are dropped because the tool omits unset outputs the same way.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Outputs`] when the document is not a JSON object.
    pub fn from_terraform_json(text: &str) -> Result<Self, DriverError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let document: Map<String, Value> =
            serde_json::from_str(trimmed).map_err(|err| DriverError::Outputs(err.to_string()))?;
        let values = document
            .into_iter()
            .filter_map(|(name, entry)| {
                let value = match entry {
                    Value::Object(mut fields) if fields.contains_key("value") => {
                        fields.remove("value").unwrap_or(Value::Null)
                    }
                    other => other,
                };
                (!value.is_null()).then_some((name, value))
            })
            .collect();
        Ok(Self {
            values,
        })
    }

    /// Returns a string output; `null` outputs read as empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the output is missing or not a string.
    pub fn string(&self, name: &str) -> Result<String, DriverError> {
        match self.values.get(name) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(Value::Null) => Ok(String::new()),
            Some(other) => Err(DriverError::OutputShape {
                name: name.to_string(),
                reason: format!("expected string, got {other}"),
            }),
            None => Err(DriverError::MissingOutput(name.to_string())),
        }
    }

    /// Returns a string output, reading a missing output as empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the output is present but not a string.
    pub fn string_or_empty(&self, name: &str) -> Result<String, DriverError> {
        match self.string(name) {
            Err(DriverError::MissingOutput(_)) => Ok(String::new()),
            other => other,
        }
    }

    /// Decodes a structured output.
    ///
    /// # Errors
    ///
    /// Returns an error when the output is missing or does not decode as `T`.
    pub fn decode<T: DeserializeOwned>(&self, name: &str) -> Result<T, DriverError> {
        let value =
            self.values.get(name).ok_or_else(|| DriverError::MissingOutput(name.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|err| DriverError::OutputShape {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    /// Returns the output names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of outputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the component exposes no outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// SECTION: Driver Interface
// ============================================================================

/// Result of re-planning a deployed component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Live state matches the configuration.
    NoChanges,
    /// Applying again would change resources.
    Changes,
}

impl fmt::Display for PlanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChanges => f.write_str("no changes"),
            Self::Changes => f.write_str("pending changes"),
        }
    }
}

/// Tool that provisions and destroys components.
pub trait DeploymentDriver {
    /// Applies the case and returns its outputs.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the apply or the output read fails.
    fn deploy(&self, case: &ComponentCase) -> Result<DeploymentOutputs, DriverError>;

    /// Plans the case against live state.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when planning fails.
    fn plan(&self, case: &ComponentCase) -> Result<PlanOutcome, DriverError>;

    /// Counts the resources the case currently manages.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when state cannot be listed.
    fn resource_count(&self, case: &ComponentCase) -> Result<usize, DriverError>;

    /// Destroys everything the case manages.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the destroy fails.
    fn destroy(&self, case: &ComponentCase) -> Result<(), DriverError>;
}
