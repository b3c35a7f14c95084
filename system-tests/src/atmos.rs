// system-tests/src/atmos.rs
// ============================================================================
// Module: Atmos Driver
// Description: Deployment driver backed by the Atmos CLI.
// Purpose: Apply, plan, inspect, and destroy Terraform components via Atmos.
// Dependencies: std::process, tempfile, tracing, serde_json
// ============================================================================

//! ## Overview
//! [`AtmosDriver`] shells out to `atmos terraform <subcommand> <component> -s
//! <stack>`. Inputs are written to a JSON var-file in a private temporary
//! directory and passed with `-var-file`. Plans use `-detailed-exitcode`, so
//! exit code 2 means pending changes rather than failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use tempfile::TempDir;
use tracing::debug;
use tracing::info;

use crate::config::SystemTestConfig;
use crate::driver::ComponentCase;
use crate::driver::DeploymentDriver;
use crate::driver::DeploymentOutputs;
use crate::driver::DriverError;
use crate::driver::PlanOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable Atmos reads its base path from.
const ATMOS_BASE_PATH_ENV: &str = "ATMOS_BASE_PATH";
/// Exit code `terraform plan -detailed-exitcode` uses for pending changes.
const PLAN_CHANGES_EXIT_CODE: i32 = 2;

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Deployment driver invoking the Atmos CLI.
#[derive(Debug)]
pub struct AtmosDriver {
    /// Atmos executable.
    binary: PathBuf,
    /// Optional Atmos base path, also used as the working directory.
    base_path: Option<PathBuf>,
    /// Scratch directory holding var-files.
    scratch: TempDir,
}

impl AtmosDriver {
    /// Creates a driver for the given executable and base path.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Inputs`] when the scratch directory cannot be
    /// created.
    pub fn new(binary: impl Into<PathBuf>, base_path: Option<PathBuf>) -> Result<Self, DriverError> {
        let scratch = tempfile::Builder::new()
            .prefix("ecr-verify-")
            .tempdir()
            .map_err(|err| DriverError::Inputs(err.to_string()))?;
        Ok(Self {
            binary: binary.into(),
            base_path,
            scratch,
        })
    }

    /// Creates a driver from system-test configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Inputs`] when the scratch directory cannot be
    /// created.
    pub fn from_config(config: &SystemTestConfig) -> Result<Self, DriverError> {
        Self::new(config.atmos_binary.clone(), config.atmos_base_path.clone())
    }

    /// Writes the case inputs to a var-file and returns its path.
    fn write_var_file(&self, case: &ComponentCase) -> Result<PathBuf, DriverError> {
        let path = self.scratch.path().join(var_file_name(case));
        let bytes = serde_json::to_vec_pretty(case.inputs.as_map())
            .map_err(|err| DriverError::Inputs(err.to_string()))?;
        fs::write(&path, bytes).map_err(|err| DriverError::Inputs(err.to_string()))?;
        Ok(path)
    }

    /// Builds `atmos terraform <subcommand..> <component> -s <stack> [extra..]`.
    fn terraform_args(
        subcommand: &[&str],
        case: &ComponentCase,
        extra: &[OsString],
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["terraform".into()];
        args.extend(subcommand.iter().map(OsString::from));
        args.extend([case.component.clone().into(), "-s".into(), case.stack.clone().into()]);
        args.extend(extra.iter().cloned());
        args
    }

    /// Runs Atmos and returns its output without judging the exit status.
    fn invoke(&self, args: &[OsString]) -> Result<Output, DriverError> {
        let mut command = Command::new(&self.binary);
        command.args(args);
        if let Some(base_path) = &self.base_path {
            command.current_dir(base_path).env(ATMOS_BASE_PATH_ENV, base_path);
        }
        debug!(command = %render_command(&self.binary, args), "invoking atmos");
        command.output().map_err(|source| DriverError::Spawn {
            program: self.binary.display().to_string(),
            source,
        })
    }

    /// Runs Atmos and requires a zero exit status.
    fn run(&self, args: &[OsString]) -> Result<Output, DriverError> {
        let output = self.invoke(args)?;
        if output.status.success() {
            return Ok(output);
        }
        Err(command_failed(&self.binary, args, &output))
    }

    /// Returns the `-var-file=<path>` argument for a case.
    fn var_file_arg(&self, case: &ComponentCase) -> Result<OsString, DriverError> {
        let path = self.write_var_file(case)?;
        let mut arg = OsString::from("-var-file=");
        arg.push(path.as_os_str());
        Ok(arg)
    }
}

impl DeploymentDriver for AtmosDriver {
    fn deploy(&self, case: &ComponentCase) -> Result<DeploymentOutputs, DriverError> {
        info!(case = %case, "applying component");
        let var_file = self.var_file_arg(case)?;
        self.run(&Self::terraform_args(&["deploy"], case, &[var_file]))?;

        let output_args: [OsString; 2] = ["--skip-init".into(), "-json".into()];
        let output = self.run(&Self::terraform_args(&["output"], case, &output_args))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        DeploymentOutputs::from_terraform_json(json_document(&stdout))
    }

    fn plan(&self, case: &ComponentCase) -> Result<PlanOutcome, DriverError> {
        info!(case = %case, "planning component for drift");
        let var_file = self.var_file_arg(case)?;
        let args = Self::terraform_args(
            &["plan"],
            case,
            &["-detailed-exitcode".into(), "-input=false".into(), var_file],
        );
        let output = self.invoke(&args)?;
        match output.status.code() {
            Some(0) => Ok(PlanOutcome::NoChanges),
            Some(PLAN_CHANGES_EXIT_CODE) => Ok(PlanOutcome::Changes),
            _ => Err(command_failed(&self.binary, &args, &output)),
        }
    }

    fn resource_count(&self, case: &ComponentCase) -> Result<usize, DriverError> {
        let output = self.run(&Self::terraform_args(&["state", "list"], case, &[]))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter(|line| !line.trim().is_empty()).count())
    }

    fn destroy(&self, case: &ComponentCase) -> Result<(), DriverError> {
        info!(case = %case, "destroying component");
        let var_file = self.var_file_arg(case)?;
        self.run(&Self::terraform_args(&["destroy"], case, &["-auto-approve".into(), var_file]))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Var-file name derived from component and stack.
fn var_file_name(case: &ComponentCase) -> String {
    let sanitized: String = format!("{}-{}", case.component, case.stack)
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    format!("{sanitized}.tfvars.json")
}

/// Returns the JSON object in `stdout`; Atmos may print banner lines first.
fn json_document(stdout: &str) -> &str {
    stdout.find('{').map_or("", |start| &stdout[start ..])
}

/// Renders a command line for logs and errors.
fn render_command(binary: &Path, args: &[OsString]) -> String {
    let mut rendered = binary.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

/// Builds a [`DriverError::CommandFailed`] from a finished process.
fn command_failed(binary: &Path, args: &[OsString], output: &Output) -> DriverError {
    DriverError::CommandFailed {
        command: render_command(binary, args),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
