//! Contract suite loading and stub generation.
use crate::templates;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::{validate_suite, ContractSuite};

/// Load and validate a contract suite from disk.
pub fn load_suite(path: &Path) -> Result<ContractSuite> {
    let bytes = fs::read(path).with_context(|| format!("read suite {}", path.display()))?;
    let suite: ContractSuite = serde_json::from_slice(&bytes).context("parse suite JSON")?;
    let warnings = validate_suite(&suite)?;
    for warning in &warnings {
        tracing::warn!("suite warning: {warning}");
    }
    Ok(suite)
}

/// Render the built-in contract suite with the base URL substituted.
pub fn suite_stub(base_url: Option<&str>) -> String {
    let mut suite: ContractSuite =
        serde_json::from_str(templates::SUITE_JSON).expect("parse suite template");
    if let Some(base_url) = base_url {
        suite.base_url = base_url.to_string();
    }
    serde_json::to_string_pretty(&suite).expect("serialize suite stub")
}
