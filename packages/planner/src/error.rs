// ABOUTME: Error types for the planner package
// ABOUTME: Local precondition failures, backend failures and schema violations

use std::time::Duration;

use seedplan_ai::AIServiceError;
use seedplan_config::ConfigError;
use thiserror::Error;

/// Shown in the conversation when a generation stage fails
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Sorry, something went wrong while preparing your plan. Please try again.";

/// Shown in the conversation when a stage exceeds its time budget
pub const TIMEOUT_FAILURE_MESSAGE: &str =
    "The planning service took too long to respond. Please try again in a moment.";

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("A {0} is already in progress")]
    Busy(&'static str),

    #[error("No business plan has been generated yet")]
    NoPlan,

    #[error("Index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Backend call failed: {0}")]
    BackendCall(String),

    #[error("Backend call timed out after {0:?}")]
    BackendTimeout(Duration),

    #[error("Response does not match the {contract} schema: {detail}")]
    SchemaViolation {
        contract: &'static str,
        detail: String,
    },

    #[error("Response is not valid JSON: {0}")]
    Parse(String),

    #[error("Result discarded because the session was reset")]
    Stale,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PlannerError {
    pub fn schema(contract: &'static str, detail: impl Into<String>) -> Self {
        PlannerError::SchemaViolation {
            contract,
            detail: detail.into(),
        }
    }

    /// True for failures raised by (or while talking to) the generative backend
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            PlannerError::BackendCall(_)
                | PlannerError::BackendTimeout(_)
                | PlannerError::SchemaViolation { .. }
                | PlannerError::Parse(_)
        )
    }

    /// Conversational text appended to the turn log when a stage fails
    pub fn user_message(&self) -> &'static str {
        match self {
            PlannerError::BackendTimeout(_) => TIMEOUT_FAILURE_MESSAGE,
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }
}

impl From<AIServiceError> for PlannerError {
    fn from(err: AIServiceError) -> Self {
        match err {
            AIServiceError::Timeout(after) => PlannerError::BackendTimeout(after),
            AIServiceError::ParseError(detail) => PlannerError::Parse(detail),
            other => PlannerError::BackendCall(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_errors_map_onto_taxonomy() {
        let timeout: PlannerError = AIServiceError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(timeout, PlannerError::BackendTimeout(d) if d == Duration::from_secs(3)));

        let parse: PlannerError = AIServiceError::ParseError("eof".into()).into();
        assert!(matches!(parse, PlannerError::Parse(_)));

        let api: PlannerError = AIServiceError::ApiError {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert!(matches!(api, PlannerError::BackendCall(ref m) if m.contains("502")));
    }

    #[test]
    fn test_user_message_distinguishes_timeouts() {
        assert_eq!(
            PlannerError::BackendTimeout(Duration::from_secs(1)).user_message(),
            TIMEOUT_FAILURE_MESSAGE
        );
        assert_eq!(
            PlannerError::schema("BusinessPlan", "missing field").user_message(),
            GENERIC_FAILURE_MESSAGE
        );
    }

    #[test]
    fn test_local_errors_are_not_backend_failures() {
        assert!(!PlannerError::EmptyInput.is_backend_failure());
        assert!(!PlannerError::Busy("submission").is_backend_failure());
        assert!(PlannerError::Parse("x".into()).is_backend_failure());
    }
}
