//! Contract suite schema, loading, and static validation.
//!
//! Suites declare intent; validation front-loads authoring errors so the
//! runner only ever executes known-good contracts.
pub(crate) const SUITE_SCHEMA_VERSION: u32 = 1;

mod load;
mod types;
mod validate;

pub use load::{load_suite, suite_stub};
pub use types::*;
pub use validate::validate_suite;
