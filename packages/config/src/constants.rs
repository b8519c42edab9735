// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Seedplan

// Generative backend credentials
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const SEEDPLAN_API_URL: &str = "SEEDPLAN_API_URL";

// Backend call behaviour
pub const SEEDPLAN_REQUEST_TIMEOUT_SECS: &str = "SEEDPLAN_REQUEST_TIMEOUT_SECS";
pub const SEEDPLAN_RETRY_ATTEMPTS: &str = "SEEDPLAN_RETRY_ATTEMPTS";

// Planning defaults
pub const SEEDPLAN_LANGUAGE: &str = "SEEDPLAN_LANGUAGE";

// Export
pub const SEEDPLAN_EXPORT_PAGE_HEIGHT: &str = "SEEDPLAN_EXPORT_PAGE_HEIGHT";

// Logging (read by tracing-subscriber's EnvFilter)
pub const RUST_LOG: &str = "RUST_LOG";
