//! Floating chat widget.
//!
//! The widget owns one conversation: the ordered message list, the draft
//! text, an optional image attachment, the session identifier handed out by
//! the chat endpoint, and the loading flag that keeps at most one request in
//! flight.
//!
//! # Structure
//!
//! - [`ChatWidget`]: state and the send lifecycle
//! - [`ChatTransport`] / [`HttpTransport`]: delivery of requests
//! - [`ImageAttachment`]: images and their base64 encoding
//!
//! # Example
//!
//! ```rust,no_run
//! use propertyloop::widget::{ChatWidget, HttpTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new("http://localhost:5000/chat")?;
//! let mut widget = ChatWidget::new();
//!
//! widget.set_draft("Is a deposit required?");
//! widget.send(&transport).await?;
//!
//! for message in widget.messages() {
//!     println!("{}: {}", message.role().as_str(), message.content());
//! }
//! # Ok(())
//! # }
//! ```

mod attachment;
mod message;
mod state;
mod transport;

pub use attachment::{
    AttachmentError, ImageAttachment, MAX_IMAGE_BYTES, base64_len, strip_data_url_prefix,
};
pub use message::{Message, Role};
pub use state::{
    ChatWidget, IMAGE_ERROR_MESSAGE, PendingSend, SEND_ERROR_MESSAGE, SendOutcome, SendRejected,
};
pub use transport::{
    ChatReply, ChatRequest, ChatTransport, DEFAULT_ENDPOINT, HttpTransport, TransportError,
};
