//! OpenAI-compatible Chat Completions client.
//!
//! Replies are requested non-streaming; the assistant endpoint answers with a
//! single JSON body, so there is nothing to stream to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assistant::session::{Turn, TurnRole};

/// Fallback when no context was found.
const NO_CONTEXT: &str = "No additional context available";

/// Connection settings for the LLM API.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier for text replies.
    pub model: String,
    /// Model used for image captions; falls back to `model`.
    pub vision_model: Option<String>,
    /// Provider type (auto-detected from `base_url`).
    pub provider: Provider,
}

impl LlmSettings {
    /// Model used for image captions.
    #[must_use]
    pub fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(&self.model)
    }
}

/// Supported LLM providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// Deployment name (required for Azure)
        deployment_name: String,
        /// API version (e.g., "2024-08-01-preview")
        api_version: String,
    },
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible provider
    Generic,
}

impl Provider {
    /// Detect provider from base URL.
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: "2024-08-01-preview".to_string(),
            }
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Build the chat completions URL for this provider.
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => format!(
                "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
            ),
            Self::OpenRouter | Self::Groq if base.ends_with("/v1") => {
                format!("{base}/chat/completions")
            }
            _ => format!("{base}/v1/chat/completions"),
        }
    }

    /// Azure authenticates with an `api-key` header instead of a bearer token.
    fn uses_api_key_header(&self) -> bool {
        matches!(self, Self::AzureOpenAI { .. })
    }
}

/// Failure talking to the LLM API.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion contained no text")]
    EmptyCompletion,
}

/// One part of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message content: plain text or multimodal parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A chat completion request message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

impl ChatMessage {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying a prompt and an image data URL.
    #[must_use]
    pub fn user_with_image(text: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_url.into(),
                    },
                },
            ]),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Non-streaming Chat Completions client.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("provider", &self.settings.provider)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Request a completion and return the first choice's text.
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, LlmError> {
        let url = self
            .settings
            .provider
            .build_chat_url(&self.settings.base_url);

        let body = serde_json::json!({
            "model": model,
            "stream": false,
            "messages": messages,
        });

        let mut rb = self.http.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", key)
            } else {
                rb.bearer_auth(key)
            };
        }

        tracing::debug!(url = %url, model = %model, message_count = messages.len(), "Requesting completion");

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = resp.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

/// Produces the assistant's reply text.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Reply to `message` given the prior `history` (which ends with the
    /// current user turn) and retrieved `context`.
    async fn generate(
        &self,
        message: &str,
        history: &[Turn],
        context: &str,
    ) -> Result<String, LlmError>;
}

#[async_trait::async_trait]
impl TextGenerator for LlmClient {
    async fn generate(
        &self,
        message: &str,
        history: &[Turn],
        context: &str,
    ) -> Result<String, LlmError> {
        let prompt = build_prompt(message, history, context);
        self.complete(&self.settings.model, vec![ChatMessage::user(prompt)])
            .await
    }
}

/// Assemble the single-message prompt.
///
/// The last entry of `history` is the current user turn and is left out of
/// the transcript; it is restated as the current message.
#[must_use]
pub fn build_prompt(message: &str, history: &[Turn], context: &str) -> String {
    let context = if context.trim().is_empty() {
        NO_CONTEXT
    } else {
        context
    };

    let previous = history.split_last().map_or(&[][..], |(_, rest)| rest);
    let transcript = previous
        .iter()
        .map(|turn| {
            let label = match turn.role {
                TurnRole::User => "User",
                TurnRole::System | TurnRole::Assistant => "Assistant",
            };
            format!("{label}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Context information: {context}\n\n\
         Previous conversation:\n{transcript}\n\n\
         Current user message: {message}\n\n\
         Please provide a helpful response based on the above information."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_provider() {
        assert_eq!(Provider::detect_from_url("https://api.openai.com"), Provider::OpenAI);
        assert_eq!(Provider::detect_from_url("https://openrouter.ai/api/v1"), Provider::OpenRouter);
        assert_eq!(Provider::detect_from_url("https://api.groq.com/openai/v1"), Provider::Groq);
        assert_eq!(Provider::detect_from_url("http://localhost:11434"), Provider::Generic);
        assert!(matches!(
            Provider::detect_from_url("https://my-resource.openai.azure.com"),
            Provider::AzureOpenAI { .. }
        ));
    }

    #[test]
    fn test_build_url_openai() {
        let url = Provider::OpenAI.build_chat_url("https://api.openai.com/");
        assert_eq!(url, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_build_url_versioned_base() {
        let url = Provider::OpenRouter.build_chat_url("https://openrouter.ai/api/v1");
        assert_eq!(url, "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn test_build_url_azure() {
        let provider = Provider::AzureOpenAI {
            deployment_name: "gpt-4o".to_string(),
            api_version: "2024-08-01-preview".to_string(),
        };
        assert_eq!(
            provider.build_chat_url("https://my-resource.openai.azure.com"),
            "https://my-resource.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
    }

    #[test]
    fn test_prompt_excludes_latest_user_turn() {
        let history = vec![
            Turn::system("I am an AI assistant that helps with property-related queries."),
            Turn::user("Hi"),
            Turn::assistant("Hello!"),
            Turn::user("Is a deposit required?"),
        ];
        let prompt = build_prompt("Is a deposit required?", &history, "Deposits are capped.");
        assert_eq!(
            prompt,
            "Context information: Deposits are capped.\n\n\
             Previous conversation:\n\
             Assistant: I am an AI assistant that helps with property-related queries.\n\
             User: Hi\n\
             Assistant: Hello!\n\n\
             Current user message: Is a deposit required?\n\n\
             Please provide a helpful response based on the above information."
        );
    }

    #[test]
    fn test_prompt_without_context() {
        let prompt = build_prompt("Hello", &[Turn::user("Hello")], "");
        assert!(prompt.starts_with("Context information: No additional context available\n\n"));
        assert!(prompt.contains("Previous conversation:\n\n\nCurrent user message: Hello"));
    }

    #[test]
    fn test_image_message_shape() {
        let msg = ChatMessage::user_with_image("Describe", "data:image/png;base64,AAAA");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(json["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_vision_model_fallback() {
        let mut settings = LlmSettings {
            base_url: "http://localhost".to_string(),
            api_key: None,
            model: "text-model".to_string(),
            vision_model: None,
            provider: Provider::Generic,
        };
        assert_eq!(settings.vision_model(), "text-model");
        settings.vision_model = Some("vision-model".to_string());
        assert_eq!(settings.vision_model(), "vision-model");
    }
}
