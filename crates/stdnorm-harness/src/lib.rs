//! Numeric-contract harness for the mean/stddev normalization kernel.
//!
//! Runs the kernel over every storage layout and precision mode a backend
//! supports and compares the results pointwise against hand-computed values.

pub mod config;
pub mod config_loader;
pub mod environment;
pub mod error;
pub mod matcher;
pub mod scenarios;

pub use config::{BackendKind, HarnessConfig};
pub use config_loader::{load_config, load_config_from_path};
pub use environment::{execute_operation, Configuration, TestEnvironment};
pub use error::{HarnessError, HarnessResult};
pub use matcher::{assert_pointwise_near, check_pointwise_near, max_abs_diff};
pub use scenarios::{Scenario, SCENARIOS};
