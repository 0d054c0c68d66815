//! Wire types and the HTTP transport for the chat endpoint.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/chat";

/// Body of a chat request.
///
/// `session_id` is always present (as `null` before the first reply);
/// `image` is only present when an image is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Literal draft text.
    pub message: String,
    /// Identifier adopted from an earlier reply.
    pub session_id: Option<String>,
    /// Base64 image payload without the data URL prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Body of a successful chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant text (markdown).
    pub response: String,
    /// Session to use for later requests, if the server assigned one.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Transport failure.
///
/// The widget does not distinguish between these; they are kept apart for
/// logging.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, body or JSON decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The endpoint answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },
}

/// Something that can deliver a [`ChatRequest`] and return the reply.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one request and wait for its reply.
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;
}

/// JSON-over-HTTP transport posting to a fixed endpoint.
///
/// No authentication and no timeout: a hung endpoint keeps the widget in its
/// loading state.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the given endpoint URL.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self, TransportError> {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Create a transport with a custom reqwest client.
    pub fn with_client(
        endpoint: impl AsRef<str>,
        http: reqwest::Client,
    ) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self { endpoint, http })
    }

    /// Endpoint requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            session_id = ?request.session_id,
            has_image = request.image.is_some(),
            "Posting chat request"
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_without_image_serializes_null_session() {
        let request = ChatRequest {
            message: "Hi".into(),
            session_id: None,
            image: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"message":"Hi","session_id":null}"#
        );
    }

    #[test]
    fn test_request_with_image() {
        let request = ChatRequest {
            message: String::new(),
            session_id: Some("abc".into()),
            image: Some("QUJD".into()),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"message":"","session_id":"abc","image":"QUJD"}"#
        );
    }

    #[test]
    fn test_reply_session_is_optional() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"ok"}"#).unwrap();
        assert_eq!(reply.session_id, None);

        let reply: ChatReply =
            serde_json::from_str(r#"{"response":"ok","session_id":"s1"}"#).unwrap();
        assert_eq!(reply.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_reply_without_response_is_rejected() {
        assert!(serde_json::from_str::<ChatReply>(r#"{"error":"boom"}"#).is_err());
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
        let transport = HttpTransport::new(DEFAULT_ENDPOINT).unwrap();
        assert_eq!(transport.endpoint().path(), "/chat");
    }
}
