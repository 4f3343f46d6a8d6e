//! Collaborator seams consumed by the handlers.
//!
//! Each trait has an AWS SDK implementation in [`aws`] and an in-memory fake in
//! `crate::test_helpers`.

pub mod aws;
pub mod job_reporter;
pub mod notifier;
pub mod object_store;
pub mod parameter_store;
pub mod resource_state;
