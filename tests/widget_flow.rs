//! Widget send lifecycle against a live HTTP endpoint.

use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use propertyloop::widget::{
    ChatWidget, HttpTransport, IMAGE_ERROR_MESSAGE, ImageAttachment, Role, SEND_ERROR_MESSAGE,
};
use serde_json::{Value, json};

/// Scripted reply: status and raw body.
type Script = Arc<Mutex<Vec<(StatusCode, String)>>>;

#[derive(Clone, Default)]
struct FakeEndpoint {
    requests: Arc<Mutex<Vec<Value>>>,
    replies: Script,
}

impl FakeEndpoint {
    fn reply(&self, status: StatusCode, body: impl Into<String>) {
        self.replies.lock().unwrap().push((status, body.into()));
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn chat(State(fake): State<FakeEndpoint>, Json(body): Json<Value>) -> (StatusCode, String) {
    fake.requests.lock().unwrap().push(body);
    let mut replies = fake.replies.lock().unwrap();
    if replies.is_empty() {
        (StatusCode::INTERNAL_SERVER_ERROR, "no scripted reply".to_string())
    } else {
        replies.remove(0)
    }
}

/// Start the fake endpoint and return it with a transport pointed at it.
async fn start() -> (FakeEndpoint, HttpTransport) {
    let fake = FakeEndpoint::default();
    let app = Router::new()
        .route("/chat", post(chat))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let transport = HttpTransport::new(format!("http://{addr}/chat")).unwrap();
    (fake, transport)
}

#[tokio::test]
async fn test_first_send_adopts_session_and_appends_reply() {
    let (fake, transport) = start().await;
    fake.reply(StatusCode::OK, r#"{"response":"**Hi!**","session_id":"abc"}"#);

    let mut widget = ChatWidget::new();
    widget.set_draft("Hello");
    widget.send(&transport).await.unwrap();

    assert_eq!(fake.requests(), vec![json!({"message": "Hello", "session_id": null})]);
    let messages = widget.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[0].content(), "Hello");
    assert_eq!(messages[1].role(), Role::Assistant);
    assert_eq!(messages[1].content(), "**Hi!**");
    assert_eq!(widget.session_id(), Some("abc"));
    assert!(!widget.is_loading());
    assert_eq!(widget.draft(), "");
}

#[tokio::test]
async fn test_session_carries_over_to_later_sends() {
    let (fake, transport) = start().await;
    fake.reply(StatusCode::OK, r#"{"response":"one","session_id":"abc"}"#);
    fake.reply(StatusCode::OK, r#"{"response":"two","session_id":"abc"}"#);

    let mut widget = ChatWidget::new();
    widget.set_draft("first");
    widget.send(&transport).await.unwrap();
    widget.set_draft("second");
    widget.send(&transport).await.unwrap();

    let requests = fake.requests();
    assert_eq!(requests[1], json!({"message": "second", "session_id": "abc"}));
    assert_eq!(widget.messages().len(), 4);
}

#[tokio::test]
async fn test_server_error_appends_generic_message_and_keeps_session() {
    let (fake, transport) = start().await;
    fake.reply(StatusCode::OK, r#"{"response":"ok","session_id":"abc"}"#);
    fake.reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"boom","session_id":"abc"}"#,
    );

    let mut widget = ChatWidget::new();
    widget.set_draft("first");
    widget.send(&transport).await.unwrap();
    widget.set_draft("second");
    widget.send(&transport).await.unwrap();

    let last = widget.messages().last().unwrap();
    assert_eq!(last.role(), Role::Assistant);
    assert_eq!(last.content(), SEND_ERROR_MESSAGE);
    assert_eq!(widget.session_id(), Some("abc"));
    assert!(!widget.is_loading());
}

#[tokio::test]
async fn test_malformed_reply_is_an_error() {
    let (fake, transport) = start().await;
    fake.reply(StatusCode::OK, r#"{"session_id":"abc"}"#);

    let mut widget = ChatWidget::new();
    widget.set_draft("Hello");
    widget.send(&transport).await.unwrap();

    assert_eq!(widget.messages()[1].content(), SEND_ERROR_MESSAGE);
    assert_eq!(widget.session_id(), None);
}

#[tokio::test]
async fn test_image_is_sent_as_bare_base64_and_cleared() {
    let (fake, transport) = start().await;
    fake.reply(StatusCode::OK, r#"{"response":"I see a wall","session_id":"s1"}"#);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wall.png");
    std::fs::write(&path, [1u8, 2, 3]).unwrap();

    let mut widget = ChatWidget::new();
    widget.attach_image(ImageAttachment::from_path(&path));
    widget.send(&transport).await.unwrap();

    assert_eq!(
        fake.requests(),
        vec![json!({"message": "", "session_id": null, "image": "AQID"})]
    );
    assert!(widget.attached_image().is_none());
    assert_eq!(widget.messages()[0].content(), "");
}

#[tokio::test]
async fn test_unreadable_image_sends_nothing() {
    let (fake, transport) = start().await;

    let mut widget = ChatWidget::new();
    widget.set_draft("What is this?");
    widget.attach_image(ImageAttachment::from_path("/definitely/missing.png"));
    widget.send(&transport).await.unwrap();

    assert!(fake.requests().is_empty());
    assert_eq!(widget.messages()[1].content(), IMAGE_ERROR_MESSAGE);
    assert!(widget.attached_image().is_some());
}

#[tokio::test]
async fn test_unreachable_endpoint_appends_generic_message() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(format!("http://{addr}/chat")).unwrap();
    let mut widget = ChatWidget::new();
    widget.set_draft("Hello");
    widget.send(&transport).await.unwrap();

    assert_eq!(widget.messages()[1].content(), SEND_ERROR_MESSAGE);
    assert!(!widget.is_loading());
}
