//! Shared deployment-pipeline automation primitives.
//!
//! This crate owns event and response contracts, per-handler configuration,
//! the approval gate and the provider-facing state types. It intentionally
//! excludes AWS SDK and Lambda runtime concerns, which live in
//! `deploy_automation_lambda`.

pub mod approval_gate;
pub mod change_set;
pub mod config;
pub mod contract;
pub mod drift;
pub mod error;
pub mod rollback;
