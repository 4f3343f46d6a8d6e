pub use deploy_automation_core::{
    approval_gate, change_set, config, contract, drift, error, rollback,
};
