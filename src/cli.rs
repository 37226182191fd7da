//! CLI argument parsing for the contract-verification workflow.
//!
//! The CLI is intentionally thin: it routes to one command function per
//! subcommand and keeps run policy inside the suite file, with flags only
//! for per-invocation overrides.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the contract verifier.
///
/// Keeping a single `RootArgs` type makes command routing obvious and avoids
/// hidden defaults in subcommand constructors.
#[derive(Parser, Debug)]
#[command(
    name = "apivet",
    version,
    about = "Scenario-driven contract verification for HTTP resource APIs",
    after_help = "Commands:\n  init --suite <file>      Write a starter contract suite\n  validate --suite <file>  Validate a suite without sending requests\n  run --suite <file>       Execute every scenario and report results\n\nExamples:\n  apivet init --suite suite.json --base-url http://localhost:3000\n  apivet validate --suite suite.json\n  apivet run --suite suite.json --verbose\n  apivet run --suite suite.json --report report.json --failure-policy abort_suite",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level verifier commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Validate(ValidateArgs),
    Run(RunArgs),
}

/// Init command inputs for writing a starter suite.
#[derive(Parser, Debug)]
#[command(about = "Write a starter contract suite")]
pub struct InitArgs {
    /// Suite file to create
    #[arg(long, value_name = "FILE")]
    pub suite: PathBuf,

    /// Base URL recorded in the generated suite
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Overwrite an existing suite file
    #[arg(long)]
    pub force: bool,
}

/// Validate command inputs for static suite checks.
#[derive(Parser, Debug)]
#[command(about = "Validate a contract suite without sending requests")]
pub struct ValidateArgs {
    /// Suite file to validate
    #[arg(long, value_name = "FILE")]
    pub suite: PathBuf,
}

/// Run command inputs for executing a suite against a live server.
#[derive(Parser, Debug)]
#[command(about = "Execute every scenario in a suite and report results")]
pub struct RunArgs {
    /// Suite file to execute
    #[arg(long, value_name = "FILE")]
    pub suite: PathBuf,

    /// Override the suite's base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the suite's x-api-token header
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Override the suite's request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_seconds: Option<f64>,

    /// Override the suite's failure policy (abort_suite or continue)
    #[arg(long, value_name = "POLICY")]
    pub failure_policy: Option<String>,

    /// Write the JSON report to this path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Print the JSON report to stdout instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Emit a verbose transcript of the run
    #[arg(long)]
    pub verbose: bool,
}
