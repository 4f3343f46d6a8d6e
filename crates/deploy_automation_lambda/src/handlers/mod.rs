pub mod changeset_validator;
pub mod drift_detection;
pub mod rollback_change;
pub mod stage_artifact_creator;
pub mod stage_artifact_putter;
