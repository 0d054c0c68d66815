//! Widget state and the send lifecycle.

use thiserror::Error;

use super::attachment::{AttachmentError, ImageAttachment};
use super::message::Message;
use super::transport::{ChatReply, ChatRequest, ChatTransport, TransportError};

/// Assistant message appended when the attached image cannot be encoded.
pub const IMAGE_ERROR_MESSAGE: &str = "Error processing image. Please try again.";

/// Assistant message appended when the request or its reply fails.
pub const SEND_ERROR_MESSAGE: &str = "Sorry, there was an error. Please try again.";

/// Reason a send was not started.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    /// Neither text nor an image was provided.
    #[error("nothing to send")]
    EmptyDraft,
    /// A previous request has not finished.
    #[error("a request is already in flight")]
    InFlight,
}

/// Conversation state of one chat widget.
#[derive(Debug, Default)]
pub struct ChatWidget {
    messages: Vec<Message>,
    draft: String,
    image: Option<ImageAttachment>,
    /// Bumped whenever the attachment changes.
    image_generation: u64,
    session_id: Option<String>,
    loading: bool,
    open: bool,
}

impl ChatWidget {
    /// Create a closed widget with an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the widget.
    pub fn open(&mut self) {
        self.open = true;
    }

    /// Hide the widget. The conversation is kept.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Whether the widget is visible.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Replace the draft text.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Current draft text.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Attach an image, replacing any previous one.
    pub fn attach_image(&mut self, image: ImageAttachment) {
        self.image = Some(image);
        self.image_generation += 1;
    }

    /// Drop the attached image, if any.
    pub fn remove_image(&mut self) {
        if self.image.take().is_some() {
            self.image_generation += 1;
        }
    }

    /// Currently attached image.
    #[must_use]
    pub fn attached_image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    /// Conversation in display order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Session identifier adopted from the server.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether [`begin_send`](Self::begin_send) would start a request.
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.check_send().is_ok()
    }

    fn check_send(&self) -> Result<(), SendRejected> {
        if self.loading {
            return Err(SendRejected::InFlight);
        }
        if self.draft.trim().is_empty() && self.image.is_none() {
            return Err(SendRejected::EmptyDraft);
        }
        Ok(())
    }

    /// Start a send.
    ///
    /// Appends the user message, clears the draft text, opens the widget and
    /// raises the loading flag. The returned [`PendingSend`] carries
    /// everything the network step needs, so the widget may be unlocked
    /// while it runs.
    pub fn begin_send(&mut self) -> Result<PendingSend, SendRejected> {
        self.check_send()?;

        let message = std::mem::take(&mut self.draft);
        self.open = true;
        self.loading = true;
        self.messages.push(Message::user(message.clone()));

        Ok(PendingSend {
            message,
            session_id: self.session_id.clone(),
            image: self.image.clone(),
            image_generation: self.image_generation,
        })
    }

    /// Apply the result of a dispatched send and clear the loading flag.
    pub fn complete(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Delivered {
                reply,
                sent_image_generation,
            } => {
                if let Some(id) = reply.session_id.filter(|id| !id.is_empty()) {
                    self.session_id = Some(id);
                }
                self.messages.push(Message::assistant(reply.response));
                // An image attached while the request was in flight is kept.
                if sent_image_generation == Some(self.image_generation) {
                    self.image = None;
                }
            }
            SendOutcome::EncodingFailed(_) => {
                self.messages.push(Message::assistant(IMAGE_ERROR_MESSAGE));
            }
            SendOutcome::TransportFailed(_) => {
                self.messages.push(Message::assistant(SEND_ERROR_MESSAGE));
            }
        }
        self.loading = false;
    }

    /// Run a whole send: begin, dispatch over `transport`, complete.
    pub async fn send(&mut self, transport: &dyn ChatTransport) -> Result<(), SendRejected> {
        let pending = self.begin_send()?;
        let outcome = pending.dispatch(transport).await;
        self.complete(outcome);
        Ok(())
    }
}

/// A send that has been accepted but not yet transmitted.
#[derive(Debug)]
pub struct PendingSend {
    message: String,
    session_id: Option<String>,
    image: Option<ImageAttachment>,
    image_generation: u64,
}

impl PendingSend {
    /// Text being sent.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Encode the image (if any), then issue the request.
    ///
    /// An encoding failure returns before the transport is touched.
    pub async fn dispatch(self, transport: &dyn ChatTransport) -> SendOutcome {
        let sent_image_generation = self.image.as_ref().map(|_| self.image_generation);

        let image = match &self.image {
            Some(attachment) => match attachment.encode().await {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    tracing::error!(
                        image = %attachment.name(),
                        error = %e,
                        "Failed to encode image attachment"
                    );
                    return SendOutcome::EncodingFailed(e);
                }
            },
            None => None,
        };

        let request = ChatRequest {
            message: self.message,
            session_id: self.session_id,
            image,
        };

        match transport.send(&request).await {
            Ok(reply) => {
                tracing::debug!(
                    session_id = ?reply.session_id,
                    response_length = reply.response.len(),
                    "Chat reply received"
                );
                SendOutcome::Delivered {
                    reply,
                    sent_image_generation,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Chat request failed");
                SendOutcome::TransportFailed(e)
            }
        }
    }
}

/// Result of [`PendingSend::dispatch`].
#[derive(Debug)]
pub enum SendOutcome {
    /// The endpoint replied.
    Delivered {
        /// Parsed reply.
        reply: ChatReply,
        /// Attachment generation that was sent, if an image was sent.
        sent_image_generation: Option<u64>,
    },
    /// The attached image could not be encoded; nothing was sent.
    EncodingFailed(AttachmentError),
    /// The request failed or the reply could not be parsed.
    TransportFailed(TransportError),
}
