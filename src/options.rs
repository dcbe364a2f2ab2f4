//! Generic options structures for model and transport configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::splitter::MarkerPolicy;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "qwen3-14b";

/// Sampling temperature of the chat front-end.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// System prompt asking the model to wrap its reasoning in `<think>` markers.
pub const DEFAULT_SYSTEM_PROMPT: &str = "think like an architect of large language models. \
Use the <think> tag for your reasoning and close it </think> before the main answer.";

const API_KEY_ENV: &str = "THINKCHAT_API_KEY";
const BASE_URL_ENV: &str = "THINKCHAT_BASE_URL";
const MODEL_ENV: &str = "THINKCHAT_MODEL";

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Generic model options containing common model behavior parameters
/// and provider-specific model configuration.
///
/// # Type Parameters
/// - `T`: Provider-specific model options type
///
/// # Example
/// ```rust
/// use thinkchat::options::{ModelOptions, OpenAiModel};
///
/// let options = ModelOptions {
///     model: Some("qwen3-14b".to_string()),
///     instructions: None,
///     temperature: Some(0.7),
///     top_p: Some(0.9),
///     max_tokens: Some(100),
///     provider: OpenAiModel::default(),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelOptions<T> {
    /// Model identifier (e.g., "qwen3-14b")
    pub model: Option<String>,

    // System prompt sent ahead of the conversation
    pub instructions: Option<String>,

    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,

    /// Top-p (nucleus) sampling parameter
    pub top_p: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Provider-specific model options
    pub provider: T,
}

/// Generic transport options containing truly generic transport fields
/// and provider-specific transport configuration.
///
/// # Type Parameters
/// - `T`: Provider-specific transport options type
///
/// # Example
/// ```rust
/// use thinkchat::options::{TransportOptions, HttpTransport, SecretString};
/// use std::time::Duration;
///
/// let options = TransportOptions {
///     timeout: Some(Duration::from_secs(30)),
///     provider: HttpTransport {
///         api_key: Some(SecretString::new("sk-...".to_string())),
///         base_url: Some("http://localhost:8080".to_string()),
///         proxy: None,
///         extra_headers: None,
///     },
/// };
/// ```
#[derive(Debug, Clone)]
pub struct TransportOptions<T> {
    /// Request timeout (applies to all transports)
    pub timeout: Option<Duration>,

    /// Provider-specific transport options
    pub provider: T,
}

/// HTTP-specific transport options.
/// Used as the provider field in `TransportOptions<HttpTransport>`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    /// Bearer token, sent unchanged in the `Authorization` header when set
    pub api_key: Option<SecretString>,

    /// Base URL for API endpoints
    pub base_url: Option<String>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl HttpTransport {
    /// Create new HTTP transport options with an API key.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: None,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Transport configured from `THINKCHAT_API_KEY` and
    /// `THINKCHAT_BASE_URL`. Both are optional; a local server usually
    /// needs neither.
    pub fn from_env() -> Self {
        Self {
            api_key: env_var(API_KEY_ENV).map(SecretString::new),
            base_url: env_var(BASE_URL_ENV),
            proxy: None,
            extra_headers: None,
        }
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

/// Options for OpenAI-compatible chat-completions endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAiModel {
    /// How `<think>` markers split across stream fragments are handled.
    #[serde(default)]
    pub marker_policy: MarkerPolicy,
}

impl OpenAiModel {
    pub fn with_marker_policy(mut self, marker_policy: MarkerPolicy) -> Self {
        self.marker_policy = marker_policy;
        self
    }
}

impl ModelOptions<OpenAiModel> {
    /// Defaults of the chat front-end: `qwen3-14b`, temperature 0.7 and a
    /// system prompt asking for `<think>` reasoning.
    pub fn chat_defaults() -> Self {
        Self::new(OpenAiModel::default())
            .with_model(DEFAULT_MODEL.to_string())
            .with_instructions(DEFAULT_SYSTEM_PROMPT.to_string())
            .with_temperature(DEFAULT_TEMPERATURE)
    }

    /// [`chat_defaults`](Self::chat_defaults) with the model overridden by
    /// `THINKCHAT_MODEL` when set.
    pub fn from_env() -> Self {
        let options = Self::chat_defaults();
        match env_var(MODEL_ENV) {
            Some(model) => options.with_model(model),
            None => options,
        }
    }
}

impl<T> ModelOptions<T> {
    /// Create new model options with provider-specific configuration.
    pub fn new(provider: T) -> Self {
        Self {
            model: None,
            instructions: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            provider,
        }
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the system prompt.
    pub fn with_instructions(mut self, instructions: String) -> Self {
        self.instructions = Some(instructions);
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-p sampling parameter.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl<T> TransportOptions<T> {
    /// Create new transport options with provider-specific configuration.
    pub fn new(provider: T) -> Self {
        Self {
            timeout: None,
            provider,
        }
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_redacted() {
        let secret = SecretString::from("sk-live");
        assert_eq!(format!("{:?}", secret), "SecretString([REDACTED])");
        assert_eq!(secret.expose_secret(), "sk-live");
    }

    #[test]
    fn test_chat_defaults() {
        let options = ModelOptions::chat_defaults();
        assert_eq!(options.model.as_deref(), Some(DEFAULT_MODEL));
        assert_eq!(options.temperature, Some(DEFAULT_TEMPERATURE));
        assert!(options.instructions.unwrap().contains("<think>"));
        assert_eq!(options.provider.marker_policy, MarkerPolicy::PerFragment);
    }

    #[test]
    fn test_http_transport_builders() {
        let transport = HttpTransport::new("token")
            .with_base_url("http://localhost:8080".to_string())
            .with_header("X-Trace".to_string(), "1".to_string());

        assert_eq!(transport.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(
            transport.extra_headers.unwrap().get("X-Trace").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_open_ai_model_policy_deserializes_with_default() {
        let model: OpenAiModel = serde_json::from_str("{}").unwrap();
        assert_eq!(model.marker_policy, MarkerPolicy::PerFragment);

        let model: OpenAiModel = serde_json::from_str(r#"{"marker_policy":"hold_back"}"#).unwrap();
        assert_eq!(model.marker_policy, MarkerPolicy::HoldBack);
    }
}
