//! Run reports: structured outcomes plus human rendering.
//!
//! Reports are JSON blobs so CI can archive and diff them; the human
//! rendering prints the same data as an indented expected-vs-observed
//! transcript.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const REPORT_SCHEMA_VERSION: u32 = 1;

/// Terminal state for one scenario.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Aborted,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Passed => "passed",
            ScenarioStatus::Failed => "failed",
            ScenarioStatus::Aborted => "aborted",
        }
    }
}

/// Terminal state for one step.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Errored,
    Aborted,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Passed => "passed",
            StepStatus::Failed => "failed",
            StepStatus::Errored => "errored",
            StepStatus::Aborted => "aborted",
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, StepStatus::Passed)
    }
}

/// One failed assertion, expected and observed values already rendered.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    pub step: String,
    pub kind: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionFailure {
    /// Single-line rendering used by transcripts and the report.
    pub fn describe(&self) -> String {
        format!(
            "{}: expected {}, observed {}",
            self.kind, self.expected, self.actual
        )
    }
}

/// Outcome for a single step.
#[derive(Debug, Deserialize, Serialize)]
pub struct StepOutcome {
    pub step: String,
    pub method: String,
    pub target: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AssertionFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captured: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body_snippet: String,
}

/// Outcome for a single scenario.
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub status: ScenarioStatus,
    pub duration_ms: u128,
    pub steps: Vec<StepOutcome>,
}

/// Suite report, the `--report` artifact and `--json` output.
#[derive(Debug, Deserialize, Serialize)]
pub struct SuiteReport {
    pub schema_version: u32,
    pub generated_at_epoch_ms: u128,
    pub suite: String,
    pub base_url: String,
    pub failure_policy: String,
    pub scenario_count: usize,
    pub scenario_pass_count: usize,
    pub scenario_fail_count: usize,
    pub scenario_abort_count: usize,
    pub step_count: usize,
    pub step_pass_count: usize,
    pub pass: bool,
    pub scenarios: Vec<ScenarioOutcome>,
}

/// Assemble a report from per-scenario outcomes, computing rollup counts.
pub fn build_report(
    suite: &str,
    base_url: &str,
    failure_policy: &str,
    scenarios: Vec<ScenarioOutcome>,
) -> SuiteReport {
    let scenario_pass_count = scenarios
        .iter()
        .filter(|scenario| scenario.status == ScenarioStatus::Passed)
        .count();
    let scenario_fail_count = scenarios
        .iter()
        .filter(|scenario| scenario.status == ScenarioStatus::Failed)
        .count();
    let scenario_abort_count = scenarios
        .iter()
        .filter(|scenario| scenario.status == ScenarioStatus::Aborted)
        .count();
    let step_count = scenarios.iter().map(|scenario| scenario.steps.len()).sum();
    let step_pass_count = scenarios
        .iter()
        .flat_map(|scenario| &scenario.steps)
        .filter(|step| step.status.passed())
        .count();
    let pass = scenario_pass_count == scenarios.len();
    SuiteReport {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at_epoch_ms: now_epoch_ms(),
        suite: suite.to_string(),
        base_url: base_url.to_string(),
        failure_policy: failure_policy.to_string(),
        scenario_count: scenarios.len(),
        scenario_pass_count,
        scenario_fail_count,
        scenario_abort_count,
        step_count,
        step_pass_count,
        pass,
        scenarios,
    }
}

/// Write the JSON report artifact.
pub fn write_report(report: &SuiteReport, path: &Path) -> Result<()> {
    let rendered = serde_json::to_string_pretty(report).context("serialize report")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create report directory {}", parent.display()))?;
        }
    }
    fs::write(path, rendered.as_bytes())
        .with_context(|| format!("write report {}", path.display()))?;
    tracing::debug!(path = %path.display(), "report written");
    Ok(())
}

/// Print the human-readable report to stdout.
pub fn print_report(report: &SuiteReport) {
    println!("suite: {}", report.suite);
    println!("base url: {}", report.base_url);
    println!("policy: {}", report.failure_policy);
    println!(
        "scenarios: {} total, {} passed, {} failed, {} aborted",
        report.scenario_count,
        report.scenario_pass_count,
        report.scenario_fail_count,
        report.scenario_abort_count
    );
    println!(
        "steps: {} total, {} passed",
        report.step_count, report.step_pass_count
    );
    for scenario in &report.scenarios {
        println!();
        println!(
            "scenario {}: {} ({} steps, {} ms)",
            scenario.scenario,
            scenario.status.as_str(),
            scenario.steps.len(),
            scenario.duration_ms
        );
        for step in &scenario.steps {
            if step.status.passed() {
                continue;
            }
            let observed = step
                .observed_status
                .map(|status| format!(", observed {status}"))
                .unwrap_or_default();
            println!(
                "  - step {}: {} ({} {}{observed})",
                step.step,
                step.status.as_str(),
                step.method,
                step.target
            );
            for failure in &step.failures {
                println!("      {}", failure.describe());
            }
            if let Some(error) = step.error.as_deref() {
                println!("      error: {error}");
            }
            if !step.body_snippet.is_empty() {
                println!("      body: {}", step.body_snippet);
            }
        }
    }
    println!();
    if report.pass {
        println!("result: passed");
    } else {
        println!(
            "result: failed ({} of {} steps passed)",
            report.step_pass_count, report.step_count
        );
    }
}

pub(crate) fn now_epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or_default()
}
