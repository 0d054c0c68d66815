//! Image captioning and property issue detection.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use thiserror::Error;

use super::llm::{ChatMessage, LlmClient, LlmError};

const CAPTION_PROMPT: &str = "Write a one-sentence caption describing this image. \
Mention any visible mold, damage or cracks.";

/// Keyword rules applied to the caption: (keyword, issue, description).
const ISSUE_RULES: [(&str, &str, &str); 3] = [
    (
        "mold",
        "Mold detected",
        "Presence of mold indicates potential health hazard and moisture problems",
    ),
    (
        "damage",
        "Structural damage",
        "Visible damage that may require immediate attention",
    ),
    (
        "crack",
        "Cracks present",
        "Cracks may indicate structural issues or settling",
    ),
];

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("image is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("image is empty")]
    Empty,

    #[error("unrecognized image format")]
    UnsupportedFormat,

    #[error("caption request failed: {0}")]
    Llm(#[from] LlmError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    High,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedIssue {
    pub issue: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAnalysis {
    pub description: String,
    pub detected_issues: Vec<DetectedIssue>,
}

/// A decoded, validated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl DecodedImage {
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Decode a base64 image, with or without a `data:...;base64,` prefix.
pub fn decode_image(data: &str) -> Result<DecodedImage, VisionError> {
    let payload = data
        .split_once("base64,")
        .map_or(data, |(_, payload)| payload)
        .trim();
    let bytes = STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Err(VisionError::Empty);
    }
    let mime = sniff_mime(&bytes).ok_or(VisionError::UnsupportedFormat)?;
    Ok(DecodedImage { bytes, mime })
}

/// Identify common image formats by their magic bytes.
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        _ => None,
    }
}

/// Issues suggested by keywords in a caption.
#[must_use]
pub fn detect_issues(caption: &str) -> Vec<DetectedIssue> {
    let lower = caption.to_lowercase();
    ISSUE_RULES
        .iter()
        .filter(|(keyword, _, _)| lower.contains(keyword))
        .map(|(_, issue, description)| DetectedIssue {
            issue: (*issue).to_string(),
            severity: Severity::High,
            description: (*description).to_string(),
        })
        .collect()
}

/// Describes an uploaded image.
#[async_trait::async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image: &str, query: &str) -> Result<ImageAnalysis, VisionError>;
}

/// Captions images with a vision-capable chat model.
#[derive(Debug, Clone)]
pub struct VisionAnalyzer {
    client: LlmClient,
}

impl VisionAnalyzer {
    #[must_use]
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ImageAnalyzer for VisionAnalyzer {
    async fn analyze(&self, image: &str, query: &str) -> Result<ImageAnalysis, VisionError> {
        let decoded = decode_image(image)?;
        tracing::debug!(
            mime = decoded.mime,
            bytes = decoded.bytes.len(),
            query_length = query.len(),
            "Captioning image"
        );

        let model = self.client.settings().vision_model().to_string();
        let caption = self
            .client
            .complete(
                &model,
                vec![ChatMessage::user_with_image(CAPTION_PROMPT, decoded.data_url())],
            )
            .await?;
        let description = caption.trim().to_string();

        Ok(ImageAnalysis {
            detected_issues: detect_issues(&description),
            description,
        })
    }
}
