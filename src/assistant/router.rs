//! Routes a chat turn to the image or text path and generates the reply.

use std::sync::Arc;

use thiserror::Error;

use super::knowledge::Retriever;
use super::llm::{LlmError, TextGenerator};
use super::session::Turn;
use super::vision::{ImageAnalysis, ImageAnalyzer, VisionError};

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("image analysis failed: {0}")]
    Vision(#[from] VisionError),

    #[error("text generation failed: {0}")]
    Generation(#[from] LlmError),
}

/// The assistant's reply and the context it was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedReply {
    pub response: String,
    pub context: String,
}

/// Dispatches turns to the image analyzer or the knowledge base, then to the
/// text generator.
#[derive(Clone)]
pub struct AgentRouter {
    generator: Arc<dyn TextGenerator>,
    analyzer: Arc<dyn ImageAnalyzer>,
    retriever: Arc<dyn Retriever>,
}

impl std::fmt::Debug for AgentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRouter").finish_non_exhaustive()
    }
}

impl AgentRouter {
    #[must_use]
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        analyzer: Arc<dyn ImageAnalyzer>,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            generator,
            analyzer,
            retriever,
        }
    }

    /// Produce a reply. `history` already ends with the current user turn.
    pub async fn route(
        &self,
        message: &str,
        history: &[Turn],
        image: Option<&str>,
    ) -> Result<RoutedReply, AssistantError> {
        let context = match image.filter(|data| !data.is_empty()) {
            Some(data) => {
                let analysis = self.analyzer.analyze(data, message).await?;
                tracing::info!(
                    issues = analysis.detected_issues.len(),
                    "Image analyzed"
                );
                image_context(&analysis)
            }
            None => match self.retriever.relevant_context(message).await {
                Ok(context) => context,
                Err(e) => {
                    tracing::warn!(error = %e, "Knowledge retrieval failed; continuing without context");
                    String::new()
                }
            },
        };

        let response = self.generator.generate(message, history, &context).await?;
        Ok(RoutedReply { response, context })
    }
}

/// Format an image analysis as generation context.
#[must_use]
pub fn image_context(analysis: &ImageAnalysis) -> String {
    let mut context = format!("Image Analysis:\n{}", analysis.description);
    if !analysis.detected_issues.is_empty() {
        context.push_str("\nDetected Issues:\n");
        let lines: Vec<String> = analysis
            .detected_issues
            .iter()
            .map(|issue| {
                format!(
                    "- {}: {} (Severity: {})",
                    issue.issue,
                    issue.description,
                    issue.severity.as_str()
                )
            })
            .collect();
        context.push_str(&lines.join("\n"));
    }
    context
}
