// system-tests/src/artifacts.rs
// ============================================================================
// Module: Case Artifacts
// Description: Per-case artifact roots and deterministic run summaries.
// Purpose: Leave a machine-readable record of every case, even on panic.
// Dependencies: crate::{case, config, verify}, ecr-verify-core, serde, serde_jcs, tracing
// ============================================================================

//! ## Overview
//! Every case writes its artifacts under a run root: `ECR_VERIFY_RUN_ROOT`
//! when set, otherwise `target/system-tests/run_<ms>/<case>`. JSON artifacts
//! are serialized with JCS so summaries diff cleanly across runs. A
//! [`TestReporter`] that is dropped without an explicit summary still writes
//! one, marked `panic` or `unknown`. Drifted lifecycle policies are written
//! next to the summary as `<repository>.expected_policy.json` and
//! `<repository>.actual_policy.json`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use ecr_verify_core::LifecyclePolicy;
use serde::Serialize;
use tracing::warn;

use crate::case::CaseReport;
use crate::config::SystemTestConfig;
use crate::verify::LivePolicy;

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Serialized summary of one case.
#[derive(Debug, Serialize)]
struct CaseSummary {
    /// Test name.
    test_name: String,
    /// `pass`, `fail`, `panic`, or `unknown`.
    status: String,
    /// Start time in Unix milliseconds.
    started_at_ms: u64,
    /// End time in Unix milliseconds.
    ended_at_ms: u64,
    /// Wall-clock duration.
    duration_ms: u64,
    /// Outcome notes.
    notes: Vec<String>,
    /// Artifact file names written by the case.
    artifacts: Vec<String>,
}

/// Returns the current Unix time in milliseconds.
///
/// `serde_jcs` cannot encode `u128`, so timestamps are `u64`.
fn now_millis() -> u64 {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Default run root for a test.
fn default_run_root(test_name: &str) -> PathBuf {
    let stamp = now_millis();
    PathBuf::from("target/system-tests").join(format!("run_{stamp}")).join(test_name)
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Artifact directory for a single case.
#[derive(Debug, Clone)]
pub struct TestArtifacts {
    /// Root directory.
    root: PathBuf,
}

impl TestArtifacts {
    /// Creates the artifact root for a test.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn new(config: &SystemTestConfig, test_name: &str) -> io::Result<Self> {
        let root = config.run_root.clone().unwrap_or_else(|| default_run_root(test_name));
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }
}

// ============================================================================
// SECTION: Reporter
// ============================================================================

/// Writes `summary.json` and `summary.md` for a case, even when it panics.
#[derive(Debug)]
pub struct TestReporter {
    /// Artifact directory.
    artifacts: TestArtifacts,
    /// Test name.
    test_name: String,
    /// Start time in Unix milliseconds.
    started_at_ms: u64,
    /// Artifact names recorded so far.
    written: Vec<String>,
    /// Set once a summary has been written.
    finalized: bool,
}

impl TestReporter {
    /// Creates a reporter for the named test.
    ///
    /// # Errors
    ///
    /// Returns an error when the artifact root cannot be created.
    pub fn new(config: &SystemTestConfig, test_name: &str) -> io::Result<Self> {
        Ok(Self {
            artifacts: TestArtifacts::new(config, test_name)?,
            test_name: test_name.to_string(),
            started_at_ms: now_millis(),
            written: Vec::new(),
            finalized: false,
        })
    }

    /// Returns the artifact directory.
    #[must_use]
    pub const fn artifacts(&self) -> &TestArtifacts {
        &self.artifacts
    }

    /// Writes a JSON artifact and lists it in the summary.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn record_json<T: Serialize>(&mut self, name: &str, value: &T) -> io::Result<()> {
        self.artifacts.write_json(name, value)?;
        self.written.push(name.to_string());
        Ok(())
    }

    /// Writes both policies of a repository whose live policy drifted.
    ///
    /// Returns true when artifacts were written.
    ///
    /// # Errors
    ///
    /// Returns an error when a write fails.
    pub fn record_policy_drift(
        &mut self,
        repository: &str,
        expected: &LifecyclePolicy,
        live: &LivePolicy,
    ) -> io::Result<bool> {
        if !live.drifted() {
            return Ok(false);
        }
        self.record_json(&format!("{repository}.expected_policy.json"), expected)?;
        self.record_json(&format!("{repository}.actual_policy.json"), &live.actual)?;
        Ok(true)
    }

    /// Writes the summary for a finished case.
    ///
    /// # Errors
    ///
    /// Returns an error when the summary cannot be written.
    pub fn finish_case(&mut self, report: &CaseReport) -> io::Result<()> {
        self.finish(report.status(), report.notes())
    }

    /// Writes the final summary.
    ///
    /// # Errors
    ///
    /// Returns an error when the summary cannot be written.
    pub fn finish(&mut self, status: &str, notes: Vec<String>) -> io::Result<()> {
        let ended_at_ms = now_millis();
        let summary = CaseSummary {
            test_name: self.test_name.clone(),
            status: status.to_string(),
            started_at_ms: self.started_at_ms,
            ended_at_ms,
            duration_ms: ended_at_ms.saturating_sub(self.started_at_ms),
            notes,
            artifacts: self.written.clone(),
        };
        self.finalized = true;
        self.artifacts.write_json("summary.json", &summary)?;
        self.artifacts.write_text("summary.md", &summary_markdown(&summary))?;
        Ok(())
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "unknown" };
        if let Err(err) =
            self.finish(status, vec!["test terminated without explicit summary".to_string()])
        {
            warn!(test = %self.test_name, error = %err, "failed to write summary on drop");
        }
    }
}

/// Renders the Markdown summary.
fn summary_markdown(summary: &CaseSummary) -> String {
    let mut out = String::new();
    out.push_str("# Registry Verification Summary\n\n## Status\n\n");
    let _ = writeln!(out, "- Test: {}", summary.test_name);
    let _ = writeln!(out, "- Status: {}", summary.status);
    let _ = writeln!(out, "- Duration (ms): {}", summary.duration_ms);
    for (heading, items) in [("Notes", &summary.notes), ("Artifacts", &summary.artifacts)] {
        let _ = write!(out, "\n## {heading}\n\n");
        if items.is_empty() {
            out.push_str("- None\n");
        }
        for item in items {
            let _ = writeln!(out, "- {item}");
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
