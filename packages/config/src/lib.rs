// ABOUTME: Seedplan configuration library
// ABOUTME: Environment variable names and the planner configuration loaded from them

pub mod constants;
pub mod settings;

pub use settings::{ConfigError, PlannerConfig, SUPPORTED_LANGUAGES};
