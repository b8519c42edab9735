// ABOUTME: Generative backend integration
// ABOUTME: Anthropic Messages API client with structured output, web search and bounded retry

pub mod retry;
pub mod service;

pub use retry::{with_retry, RetryPolicy};
pub use service::{AIResponse, AIService, AIServiceError, AIServiceResult, Usage};
