// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 or empty values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Region used when no override is configured.
pub const DEFAULT_REGION: &str = "us-east-2";
/// Atmos executable resolved from `PATH` when no override is configured.
pub const DEFAULT_ATMOS_BINARY: &str = "atmos";

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional AWS region override.
    Region,
    /// Optional path to the Atmos executable.
    AtmosBinary,
    /// Optional Atmos base path (directory holding `atmos.yaml`).
    AtmosBasePath,
    /// Optional stack name override.
    Stack,
    /// Optional run root override for artifacts.
    RunRoot,
    /// Optional AWS endpoint override (for emulators).
    EndpointUrl,
    /// Optional log format (`pretty` or `json`).
    LogFormat,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Region => "ECR_VERIFY_AWS_REGION",
            Self::AtmosBinary => "ECR_VERIFY_ATMOS_BIN",
            Self::AtmosBasePath => "ECR_VERIFY_ATMOS_BASE_PATH",
            Self::Stack => "ECR_VERIFY_STACK",
            Self::RunRoot => "ECR_VERIFY_RUN_ROOT",
            Self::EndpointUrl => "ECR_VERIFY_ENDPOINT_URL",
            Self::LogFormat => "ECR_VERIFY_LOG_FORMAT",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Output format of the test log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemTestConfig {
    /// AWS region the component is deployed to.
    pub region: String,
    /// Atmos executable.
    pub atmos_binary: PathBuf,
    /// Optional Atmos base path.
    pub atmos_base_path: Option<PathBuf>,
    /// Optional stack name override.
    pub stack: Option<String>,
    /// Optional run root override.
    pub run_root: Option<PathBuf>,
    /// Optional AWS endpoint override.
    pub endpoint_url: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for SystemTestConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            atmos_binary: PathBuf::from(DEFAULT_ATMOS_BINARY),
            atmos_base_path: None,
            stack: None,
            run_root: None,
            endpoint_url: None,
            log_format: LogFormat::default(),
        }
    }
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is empty,
    /// or fails validation (for example, an unknown log format).
    pub fn load() -> Result<Self, String> {
        let defaults = Self::default();
        let region = read_env_nonempty(SystemTestEnv::Region.as_str())?
            .map(|value| value.trim().to_string())
            .unwrap_or(defaults.region);
        let atmos_binary = read_env_nonempty(SystemTestEnv::AtmosBinary.as_str())?
            .map_or(defaults.atmos_binary, PathBuf::from);
        let atmos_base_path =
            read_env_nonempty(SystemTestEnv::AtmosBasePath.as_str())?.map(PathBuf::from);
        let stack = read_env_nonempty(SystemTestEnv::Stack.as_str())?;
        let run_root = read_env_nonempty(SystemTestEnv::RunRoot.as_str())?.map(PathBuf::from);
        let endpoint_url = read_env_nonempty(SystemTestEnv::EndpointUrl.as_str())?
            .map(|value| parse_endpoint(SystemTestEnv::EndpointUrl.as_str(), &value))
            .transpose()?;
        let log_format = read_env_nonempty(SystemTestEnv::LogFormat.as_str())?
            .map(|value| parse_log_format(SystemTestEnv::LogFormat.as_str(), &value))
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            region,
            atmos_binary,
            atmos_base_path,
            stack,
            run_root,
            endpoint_url,
            log_format,
        })
    }

    /// Returns the stack override or the supplied default.
    #[must_use]
    pub fn stack_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.stack.as_deref().unwrap_or(default)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses an endpoint override, requiring an explicit HTTP(S) scheme.
///
/// # Errors
///
/// Returns an error when the value lacks an `http://` or `https://` scheme.
fn parse_endpoint(name: &str, raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }
    Err(format!("{name} must start with http:// or https://"))
}

/// Parses the log format literal.
///
/// # Errors
///
/// Returns an error when the value is not `pretty` or `json`.
fn parse_log_format(name: &str, raw: &str) -> Result<LogFormat, String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("pretty") {
        return Ok(LogFormat::Pretty);
    }
    if trimmed.eq_ignore_ascii_case("json") {
        return Ok(LogFormat::Json);
    }
    Err(format!("{name} must be pretty or json"))
}
