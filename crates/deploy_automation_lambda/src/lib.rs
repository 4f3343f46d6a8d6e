//! AWS-oriented adapters and handlers for the deployment pipeline automation.
//!
//! This crate owns runtime integration details (Lambda handlers, AWS SDK
//! adapters, deadline racing) and exposes a single runtime module boundary for
//! the contract, configuration and state primitives of
//! `deploy_automation_core`.

pub mod adapters;
pub mod archive;
pub mod deadline;
pub mod error;
pub mod handlers;
pub mod job_result;
pub mod marker_store;
pub mod runtime;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
