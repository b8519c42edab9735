// ABOUTME: AI service for making structured generation calls to Anthropic Claude
// ABOUTME: Handles API requests, code-fence stripping, JSON parsing, web search and timeouts

use std::time::Duration;

use reqwest::{Client, StatusCode};
use seedplan_config::PlannerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const PLAN_MAX_TOKENS: u32 = 8192;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const WEB_SEARCH_TOOL: &str = "web_search_20250305";
const WEB_SEARCH_MAX_USES: u32 = 5;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Calculate appropriate max_tokens for a given model
fn get_max_tokens_for_model(model: &str) -> u32 {
    if model.contains("haiku") {
        DEFAULT_MAX_TOKENS
    } else {
        PLAN_MAX_TOKENS
    }
}

#[derive(Debug, Error)]
pub enum AIServiceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No API key configured")]
    NoApiKey,

    #[error("Invalid response format")]
    InvalidResponse,
}

impl AIServiceError {
    /// Network failures, timeouts, rate limits and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            AIServiceError::RequestFailed(_) => true,
            AIServiceError::Timeout(_) => true,
            AIServiceError::ApiError { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            AIServiceError::ParseError(_)
            | AIServiceError::NoApiKey
            | AIServiceError::InvalidResponse => false,
        }
    }
}

pub type AIServiceResult<T> = Result<T, AIServiceError>;

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[allow(dead_code)]
    id: String,
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug)]
pub struct AIResponse<T> {
    pub data: T,
    pub usage: Usage,
}

/// AI service for making structured and free-text generation calls
#[derive(Debug, Clone)]
pub struct AIService {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
    timeout: Duration,
}

impl AIService {
    fn create_client(timeout: Duration) -> AIServiceResult<Client> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(AIServiceError::RequestFailed)
    }

    /// Creates a service from the planner configuration
    pub fn from_config(config: &PlannerConfig) -> AIServiceResult<Self> {
        Ok(Self {
            client: Self::create_client(config.request_timeout)?,
            api_key: config.api_key.clone(),
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            model: config.model.clone(),
            timeout: config.request_timeout,
        })
    }

    /// Get the model being used by this service
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a structured generation call.
    /// The prompt should request JSON output; the first text block is parsed as `T`.
    pub async fn generate_structured<T: for<'de> Deserialize<'de>>(
        &self,
        prompt: String,
        system_prompt: Option<String>,
    ) -> AIServiceResult<AIResponse<T>> {
        let response = self.send(prompt, system_prompt, Vec::new()).await?;
        let json_text = strip_code_fences(&response.data);

        debug!(
            "Raw JSON response (first 2000 chars): {}",
            &json_text[..floor_char_boundary(json_text, 2000)]
        );

        let data: T = serde_json::from_str(json_text).map_err(|e| {
            error!(
                "JSON parsing failed: {}. JSON snippet: {}",
                e,
                &json_text[..floor_char_boundary(json_text, 500)]
            );
            AIServiceError::ParseError(format!("Failed to parse JSON: {}", e))
        })?;

        Ok(AIResponse {
            data,
            usage: response.usage,
        })
    }

    /// Makes a free-text generation call
    pub async fn generate_text(
        &self,
        prompt: String,
        system_prompt: Option<String>,
    ) -> AIServiceResult<AIResponse<String>> {
        self.send(prompt, system_prompt, Vec::new()).await
    }

    /// Makes a free-text generation call with the backend's web search tool enabled
    pub async fn generate_text_with_search(
        &self,
        prompt: String,
        system_prompt: Option<String>,
    ) -> AIServiceResult<AIResponse<String>> {
        let tool = serde_json::json!({
            "type": WEB_SEARCH_TOOL,
            "name": "web_search",
            "max_uses": WEB_SEARCH_MAX_USES,
        });
        self.send(prompt, system_prompt, vec![tool]).await
    }

    async fn send(
        &self,
        prompt: String,
        system_prompt: Option<String>,
        tools: Vec<serde_json::Value>,
    ) -> AIServiceResult<AIResponse<String>> {
        let api_key = self.api_key.as_ref().ok_or(AIServiceError::NoApiKey)?;

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: get_max_tokens_for_model(&self.model),
            temperature: DEFAULT_TEMPERATURE,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            system: system_prompt,
            tools,
        };

        info!(
            "Making Anthropic API request: model={}, max_tokens={}, tools={}, timeout={:?}",
            request.model,
            request.max_tokens,
            request.tools.len(),
            self.timeout
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        info!("Received response from Anthropic API: status={}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Anthropic API error: {} - {}", status, error_text);
            return Err(AIServiceError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| self.classify_body_error(e))?;

        // Web search interleaves tool blocks with text; only the text blocks carry the answer
        let text: String = anthropic_response
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(AIServiceError::InvalidResponse);
        }

        info!(
            "Anthropic API call complete (tokens: {})",
            anthropic_response.usage.total_tokens()
        );

        Ok(AIResponse {
            data: text,
            usage: anthropic_response.usage,
        })
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> AIServiceError {
        if e.is_timeout() {
            error!("Anthropic API request timed out after {:?}", self.timeout);
            AIServiceError::Timeout(self.timeout)
        } else {
            error!("Anthropic API request failed: {}", e);
            AIServiceError::RequestFailed(e)
        }
    }

    fn classify_body_error(&self, e: reqwest::Error) -> AIServiceError {
        if e.is_timeout() {
            AIServiceError::Timeout(self.timeout)
        } else {
            AIServiceError::ParseError(e.to_string())
        }
    }
}

/// Strip markdown code fences if present (```json ... ```)
pub fn strip_code_fences(text: &str) -> &str {
    let cleaned = text.trim();
    if !cleaned.starts_with("```") {
        return cleaned;
    }
    // Find the first newline after opening fence
    let start = cleaned.find('\n').map(|i| i + 1).unwrap_or(cleaned.len());
    // Search for the closing fence after the opening one
    let end = cleaned[start..]
        .rfind("```")
        .map(|i| i + start)
        .unwrap_or(cleaned.len());
    cleaned[start..end].trim()
}

fn floor_char_boundary(text: &str, max: usize) -> usize {
    if max >= text.len() {
        return text.len();
    }
    let mut idx = max;
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_with_language() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_plain() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_unterminated() {
        assert_eq!(strip_code_fences("```\n[1,2]"), "[1,2]");
    }

    #[test]
    fn test_floor_char_boundary_multibyte() {
        let text = "₹₹₹";
        // each rupee sign is three bytes
        assert_eq!(floor_char_boundary(text, 4), 3);
        assert_eq!(floor_char_boundary(text, 100), text.len());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AIServiceError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(AIServiceError::ApiError { status: 503, message: String::new() }.is_retryable());
        assert!(AIServiceError::ApiError { status: 429, message: String::new() }.is_retryable());
        assert!(!AIServiceError::ApiError { status: 400, message: String::new() }.is_retryable());
        assert!(!AIServiceError::ParseError("x".into()).is_retryable());
        assert!(!AIServiceError::NoApiKey.is_retryable());
    }

    #[test]
    fn test_max_tokens_for_model() {
        assert_eq!(get_max_tokens_for_model("claude-haiku-4"), DEFAULT_MAX_TOKENS);
        assert_eq!(get_max_tokens_for_model("claude-sonnet-4-20250514"), PLAN_MAX_TOKENS);
    }
}
