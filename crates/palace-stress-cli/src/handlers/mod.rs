//! Command handlers - extracted from main.rs for testability

pub mod stress;

pub use stress::{build_stress_config, execute_stress_test, write_report};
