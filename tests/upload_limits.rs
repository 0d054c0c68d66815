//! The largest image the site accepts must also fit through the assistant
//! endpoint once it is base64 encoded.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use propertyloop::assistant::knowledge::KnowledgeBase;
use propertyloop::assistant::llm::{LlmError, TextGenerator};
use propertyloop::assistant::router::AgentRouter;
use propertyloop::assistant::session::{SessionStore, Turn};
use propertyloop::assistant::vision::{ImageAnalysis, ImageAnalyzer, VisionError};
use propertyloop::assistant::{AssistantState, api};
use propertyloop::config::WidgetConfig;
use propertyloop::site::{self, SiteState};
use propertyloop::widget::{HttpTransport, MAX_IMAGE_BYTES, SEND_ERROR_MESSAGE, base64_len};
use tower::ServiceExt;

struct FixedGenerator;

#[async_trait::async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(
        &self,
        _message: &str,
        _history: &[Turn],
        _context: &str,
    ) -> Result<String, LlmError> {
        Ok("That looks like a dry wall.".to_string())
    }
}

/// Remembers the length of every image it is shown.
#[derive(Default)]
struct SizeRecorder {
    sizes: Mutex<Vec<usize>>,
}

#[async_trait::async_trait]
impl ImageAnalyzer for SizeRecorder {
    async fn analyze(&self, image: &str, _query: &str) -> Result<ImageAnalysis, VisionError> {
        self.sizes.lock().unwrap().push(image.len());
        Ok(ImageAnalysis {
            description: "a wall".to_string(),
            detected_issues: Vec::new(),
        })
    }
}

/// Serve the assistant on a local port and build a site app relaying to it.
async fn start(analyzer: Arc<SizeRecorder>) -> Router {
    let router = AgentRouter::new(
        Arc::new(FixedGenerator),
        analyzer,
        Arc::new(KnowledgeBase::empty()),
    );
    let assistant = api::router(AssistantState::new(SessionStore::new(), router));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, assistant).await.unwrap();
    });

    let transport = HttpTransport::new(format!("http://{addr}/chat")).unwrap();
    site::router(SiteState::new(Arc::new(transport), WidgetConfig::default()))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn png_of_size(size: usize) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.resize(size, 0x5a);
    data
}

async fn upload_and_send(app: &Router, image: &[u8]) -> String {
    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let boundary = "LIMIT-BOUNDARY";
    let mut body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"wall.png\"\r\n\
         Content-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = app
        .clone()
        .oneshot(
            Request::post("/widget/image")
                .header(header::COOKIE, &cookie)
                .header("HX-Request", "true")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_text(response).await.contains(r#"role="alert""#));

    let response = app
        .clone()
        .oneshot(
            Request::post("/widget/send")
                .header(header::COOKIE, &cookie)
                .header("HX-Request", "true")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("message=Is+this+damp%3F"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_text(response).await
}

#[tokio::test]
async fn test_largest_accepted_upload_reaches_assistant() {
    let analyzer = Arc::new(SizeRecorder::default());
    let app = start(analyzer.clone()).await;

    let html = upload_and_send(&app, &png_of_size(MAX_IMAGE_BYTES)).await;

    assert!(!html.contains(SEND_ERROR_MESSAGE));
    assert!(html.contains("That looks like a dry wall."));
    assert_eq!(
        *analyzer.sizes.lock().unwrap(),
        vec![base64_len(MAX_IMAGE_BYTES)]
    );
}

#[tokio::test]
async fn test_eight_mebibyte_upload_reaches_assistant() {
    let analyzer = Arc::new(SizeRecorder::default());
    let app = start(analyzer.clone()).await;

    let html = upload_and_send(&app, &png_of_size(8 * 1024 * 1024)).await;

    assert!(!html.contains(SEND_ERROR_MESSAGE));
    assert!(html.contains("That looks like a dry wall."));
}

#[test]
fn test_assistant_limit_covers_encoded_upload() {
    assert!(api::BODY_LIMIT > base64_len(MAX_IMAGE_BYTES));
    assert!(site::UPLOAD_LIMIT > MAX_IMAGE_BYTES);
}
