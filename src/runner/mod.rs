//! Sequential scenario execution with policy-driven failure handling.
//!
//! One step's full request/assert/capture cycle completes before the next
//! begins, so later steps can read state captured by earlier ones. Each
//! scenario starts from an empty store.
mod asserts;
mod step;

use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use crate::http::HttpClient;
use crate::report::{
    build_report, ScenarioOutcome, ScenarioStatus, StepOutcome, StepStatus, SuiteReport,
};
use crate::store::StateStore;
use crate::suite::{ContractSuite, FailurePolicy, ScenarioSpec};

use step::{aborted_outcome, execute_step};

pub(crate) const BODY_SNIPPET_MAX_BYTES: usize = 256;

/// Inputs for one suite run.
pub struct RunSuiteArgs<'a> {
    pub suite: &'a ContractSuite,
    pub verbose: bool,
}

/// Run every scenario in declared order and assemble the suite report.
pub fn run_suite(args: &RunSuiteArgs<'_>) -> Result<SuiteReport> {
    let suite = args.suite;
    let timeout = Duration::try_from_secs_f64(suite.timeout_seconds)
        .with_context(|| format!("invalid timeout_seconds {}", suite.timeout_seconds))?;
    let client = HttpClient::new(timeout);

    let started = Instant::now();
    let mut outcomes = Vec::with_capacity(suite.scenarios.len());
    let mut store = StateStore::new();
    let mut abort_rest = false;
    for scenario in &suite.scenarios {
        if abort_rest {
            outcomes.push(aborted_scenario(scenario));
            continue;
        }
        outcomes.push(run_scenario(
            &client,
            suite,
            scenario,
            &mut store,
            args.verbose,
            &mut abort_rest,
        ));
    }

    let report = build_report(
        &suite.name,
        &suite.base_url,
        suite.failure_policy.as_str(),
        outcomes,
    );
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis(),
        scenarios = report.scenario_count,
        steps = report.step_count,
        pass = report.pass,
        "suite run complete"
    );
    if args.verbose {
        eprintln!(
            "suite summary: {} scenarios, {} passed, {} failed, {} aborted",
            report.scenario_count,
            report.scenario_pass_count,
            report.scenario_fail_count,
            report.scenario_abort_count
        );
    }
    Ok(report)
}

fn run_scenario(
    client: &HttpClient,
    suite: &ContractSuite,
    scenario: &ScenarioSpec,
    store: &mut StateStore,
    verbose: bool,
    abort_rest: &mut bool,
) -> ScenarioOutcome {
    if verbose {
        eprintln!("running scenario {}", scenario.name);
    }
    store.reset();
    let started = Instant::now();
    let mut steps = Vec::with_capacity(scenario.steps.len());
    let mut abort_scenario = false;
    for spec in &scenario.steps {
        if abort_scenario {
            steps.push(aborted_outcome(spec));
            continue;
        }
        if verbose {
            eprintln!("running step {} ({} {})", spec.name, spec.method.as_str(), spec.target);
        }
        let execution =
            execute_step(client, &suite.base_url, &suite.headers, spec, store, verbose);
        if !execution.outcome.status.passed() {
            if execution.fatal {
                abort_scenario = true;
            }
            if suite.failure_policy == FailurePolicy::AbortSuite {
                abort_scenario = true;
                *abort_rest = true;
            }
        }
        steps.push(execution.outcome);
    }
    let duration_ms = started.elapsed().as_millis();
    let status = scenario_status(&steps);
    if verbose {
        eprintln!("scenario {}: {}", scenario.name, status.as_str());
    }
    ScenarioOutcome {
        scenario: scenario.name.clone(),
        status,
        duration_ms,
        steps,
    }
}

fn scenario_status(steps: &[StepOutcome]) -> ScenarioStatus {
    if steps.iter().all(|step| step.status.passed()) {
        return ScenarioStatus::Passed;
    }
    if steps.iter().all(|step| step.status == StepStatus::Aborted) {
        return ScenarioStatus::Aborted;
    }
    ScenarioStatus::Failed
}

fn aborted_scenario(scenario: &ScenarioSpec) -> ScenarioOutcome {
    ScenarioOutcome {
        scenario: scenario.name.clone(),
        status: ScenarioStatus::Aborted,
        duration_ms: 0,
        steps: scenario.steps.iter().map(aborted_outcome).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{aborted_scenario, scenario_status};
    use crate::report::{ScenarioStatus, StepOutcome, StepStatus};
    use crate::suite::{Method, ScenarioSpec, StepSpec};

    fn outcome(status: StepStatus) -> StepOutcome {
        StepOutcome {
            step: "list".to_string(),
            method: "GET".to_string(),
            target: "/extintor".to_string(),
            status,
            observed_status: None,
            duration_ms: None,
            failures: Vec::new(),
            error: None,
            captured: Vec::new(),
            body_snippet: String::new(),
        }
    }

    #[test]
    fn scenario_status_rolls_up_step_states() {
        assert_eq!(
            scenario_status(&[outcome(StepStatus::Passed)]),
            ScenarioStatus::Passed
        );
        assert_eq!(
            scenario_status(&[outcome(StepStatus::Passed), outcome(StepStatus::Failed)]),
            ScenarioStatus::Failed
        );
        assert_eq!(
            scenario_status(&[outcome(StepStatus::Aborted), outcome(StepStatus::Aborted)]),
            ScenarioStatus::Aborted
        );
        // A scenario stopped partway is failed, not aborted.
        assert_eq!(
            scenario_status(&[outcome(StepStatus::Errored), outcome(StepStatus::Aborted)]),
            ScenarioStatus::Failed
        );
    }

    #[test]
    fn aborted_scenarios_carry_every_planned_step() {
        let scenario = ScenarioSpec {
            name: "error-contract".to_string(),
            summary: None,
            steps: vec![
                StepSpec {
                    name: "read-unknown".to_string(),
                    method: Method::Get,
                    target: "/extintor/999999".to_string(),
                    headers: Default::default(),
                    query: Default::default(),
                    body: None,
                    expect_status: Some(404),
                    assertions: Vec::new(),
                    capture: Default::default(),
                },
                StepSpec {
                    name: "delete-unknown".to_string(),
                    method: Method::Delete,
                    target: "/extintor/999999".to_string(),
                    headers: Default::default(),
                    query: Default::default(),
                    body: None,
                    expect_status: Some(404),
                    assertions: Vec::new(),
                    capture: Default::default(),
                },
            ],
        };
        let outcome = aborted_scenario(&scenario);
        assert_eq!(outcome.status, ScenarioStatus::Aborted);
        assert_eq!(outcome.steps.len(), 2);
        assert!(outcome
            .steps
            .iter()
            .all(|step| step.status == StepStatus::Aborted));
        assert_eq!(outcome.steps[0].step, "read-unknown");
    }
}
