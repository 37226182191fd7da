//! `apivet` entrypoint: route CLI commands to the suite/runner modules.
//!
//! Exit codes form the CI gate: 0 when every step passed, 1 when any step
//! failed, 2 for usage, load, and validation errors.
use anyhow::{anyhow, Context, Result};
use clap::Parser;

mod cli;
mod http;
mod report;
mod runner;
mod store;
mod suite;
mod templates;

use crate::suite::{ContractSuite, FailurePolicy};

fn main() {
    init_tracing();
    let args = cli::RootArgs::parse();
    let code = match run_command(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            2
        }
    };
    std::process::exit(code);
}

fn run_command(args: cli::RootArgs) -> Result<i32> {
    match args.command {
        cli::Command::Init(args) => cmd_init(args).map(|()| 0),
        cli::Command::Validate(args) => cmd_validate(args).map(|()| 0),
        cli::Command::Run(args) => cmd_run(args),
    }
}

fn cmd_init(args: cli::InitArgs) -> Result<()> {
    if args.suite.exists() && !args.force {
        return Err(anyhow!(
            "refusing to overwrite {} without --force",
            args.suite.display()
        ));
    }
    let stub = suite::suite_stub(args.base_url.as_deref());
    if let Some(parent) = args.suite.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
    }
    std::fs::write(&args.suite, stub)
        .with_context(|| format!("write suite {}", args.suite.display()))?;
    println!("wrote starter suite to {}", args.suite.display());
    println!("point base_url and the x-api-token header at your server, then `apivet validate`");
    Ok(())
}

fn cmd_validate(args: cli::ValidateArgs) -> Result<()> {
    let suite = suite::load_suite(&args.suite)?;
    let warnings = suite::validate_suite(&suite)?;
    println!("suite {} is valid", suite.name);
    println!("  base url: {}", suite.base_url);
    println!("  failure policy: {}", suite.failure_policy.as_str());
    for scenario in &suite.scenarios {
        println!("  scenario {}: {} steps", scenario.name, scenario.steps.len());
    }
    for warning in &warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}

fn cmd_run(args: cli::RunArgs) -> Result<i32> {
    let mut suite = suite::load_suite(&args.suite)?;
    apply_run_overrides(&mut suite, &args)?;
    let report = runner::run_suite(&runner::RunSuiteArgs {
        suite: &suite,
        verbose: args.verbose,
    })?;
    if let Some(path) = &args.report {
        report::write_report(&report, path)?;
        if !args.json {
            println!("wrote report to {}", path.display());
        }
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_report(&report);
    }
    Ok(if report.pass { 0 } else { 1 })
}

fn apply_run_overrides(suite: &mut ContractSuite, args: &cli::RunArgs) -> Result<()> {
    if let Some(base_url) = &args.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(anyhow!("--base-url must start with http:// or https://"));
        }
        suite.base_url = base_url.clone();
    }
    if let Some(token) = &args.token {
        suite
            .headers
            .insert("x-api-token".to_string(), token.clone());
    }
    if let Some(timeout) = args.timeout_seconds {
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(anyhow!("--timeout-seconds must be a positive number"));
        }
        suite.timeout_seconds = timeout;
    }
    if let Some(policy) = args.failure_policy.as_deref() {
        suite.failure_policy = parse_failure_policy(policy)?;
    }
    Ok(())
}

fn parse_failure_policy(raw: &str) -> Result<FailurePolicy> {
    match raw {
        "abort_suite" => Ok(FailurePolicy::AbortSuite),
        "continue" => Ok(FailurePolicy::Continue),
        other => Err(anyhow!(
            "unknown failure policy {other:?} (expected abort_suite or continue)"
        )),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
