//! Landing page and widget handlers.
//!
//! Every widget action answers an HTMX request with the re-rendered widget
//! fragment, and a plain form post with a redirect back to `/`. Rejected
//! uploads are the exception: they render the widget with a notice instead.

use axum::{
    Form,
    extract::{Multipart, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use super::SiteState;
use super::visitors::Visitor;
use crate::ui;
use crate::widget::{ChatWidget, ImageAttachment, MAX_IMAGE_BYTES, SendRejected};

/// Cookie holding the visitor id.
pub const VISITOR_COOKIE: &str = "pl_visitor";

/// Form field carrying the image upload.
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub message: String,
}

/// Resolve the visitor from the cookie jar, setting the cookie for new ones.
fn resolve_visitor(state: &SiteState, jar: CookieJar) -> (Visitor, CookieJar) {
    let (visitor, created) = state
        .widgets
        .resolve(jar.get(VISITOR_COOKIE).map(Cookie::value));
    if !created {
        return (visitor, jar);
    }

    tracing::debug!(visitor_id = %visitor.id(), "New visitor");
    let cookie = Cookie::build((VISITOR_COOKIE, visitor.id().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (visitor, jar.add(cookie))
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

fn fragment(state: &SiteState, widget: &ChatWidget) -> String {
    ui::chat::widget(widget, &state.config)
}

/// Fragment for HTMX, redirect home otherwise.
fn widget_response(state: &SiteState, visitor: &Visitor, headers: &HeaderMap) -> Response {
    if is_htmx(headers) {
        Html(visitor.with_widget(|w| fragment(state, w))).into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

/// GET / - Landing page with the visitor's widget.
pub async fn index(State(state): State<SiteState>, jar: CookieJar) -> impl IntoResponse {
    let (visitor, jar) = resolve_visitor(&state, jar);
    let widget_html = visitor.with_widget(|w| fragment(&state, w));
    (jar, Html(ui::landing::page(&widget_html)))
}

/// GET /widget - Current widget fragment.
pub async fn widget(State(state): State<SiteState>, jar: CookieJar) -> impl IntoResponse {
    let (visitor, jar) = resolve_visitor(&state, jar);
    let html = visitor.with_widget(|w| fragment(&state, w));
    (jar, Html(html))
}

/// POST /widget/open
pub async fn open(
    State(state): State<SiteState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let (visitor, jar) = resolve_visitor(&state, jar);
    visitor.with_widget(ChatWidget::open);
    (jar, widget_response(&state, &visitor, &headers))
}

/// POST /widget/close
pub async fn close(
    State(state): State<SiteState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let (visitor, jar) = resolve_visitor(&state, jar);
    visitor.with_widget(ChatWidget::close);
    (jar, widget_response(&state, &visitor, &headers))
}

/// Why an upload was not attached.
#[derive(Debug)]
enum UploadRejected {
    TooLarge,
    Unreadable(String),
}

impl UploadRejected {
    fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unreadable(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn notice(&self) -> String {
        match self {
            Self::TooLarge => format!(
                "That image is too large. Please choose one under {} MB.",
                MAX_IMAGE_BYTES / (1024 * 1024)
            ),
            Self::Unreadable(_) => "The image could not be read. Please try again.".to_string(),
        }
    }
}

impl From<MultipartError> for UploadRejected {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Unreadable(err.body_text())
        }
    }
}

/// Pull the first non-empty image field out of the form.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<ImageAttachment>, UploadRejected> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or("image").to_string();
        let mime = field
            .content_type()
            .filter(|ct| ct.starts_with("image/"))
            .map(ToString::to_string);
        let data = field.bytes().await?;

        if data.is_empty() {
            continue;
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(UploadRejected::TooLarge);
        }

        return Ok(Some(ImageAttachment::from_bytes(name, mime, data.to_vec())));
    }
    Ok(None)
}

/// POST /widget/image - Attach the uploaded image.
///
/// An empty upload (no file chosen) leaves the attachment unchanged. A
/// rejected upload re-renders the widget with a notice; HTMX requests get it
/// as a normal fragment so it is swapped in.
pub async fn attach_image(
    State(state): State<SiteState>,
    headers: HeaderMap,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let (visitor, jar) = resolve_visitor(&state, jar);

    let rejected = match read_upload(&mut multipart).await {
        Ok(Some(attachment)) => {
            tracing::info!(
                visitor_id = %visitor.id(),
                image = %attachment.name(),
                "Image attached"
            );
            visitor.with_widget(|w| w.attach_image(attachment));
            return (jar, widget_response(&state, &visitor, &headers)).into_response();
        }
        Ok(None) => return (jar, widget_response(&state, &visitor, &headers)).into_response(),
        Err(rejected) => rejected,
    };

    match &rejected {
        UploadRejected::TooLarge => tracing::warn!(
            visitor_id = %visitor.id(),
            max_bytes = MAX_IMAGE_BYTES,
            "Image upload too large"
        ),
        UploadRejected::Unreadable(error) => tracing::warn!(
            visitor_id = %visitor.id(),
            error = %error,
            "Image upload unreadable"
        ),
    }
    let notice = rejected.notice();
    let html = visitor.with_widget(|w| ui::chat::widget_with_notice(w, &state.config, Some(&notice)));
    if is_htmx(&headers) {
        (jar, Html(html)).into_response()
    } else {
        (rejected.status(), jar, Html(ui::landing::page(&html))).into_response()
    }
}

/// POST /widget/image/remove
pub async fn remove_image(
    State(state): State<SiteState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let (visitor, jar) = resolve_visitor(&state, jar);
    visitor.with_widget(ChatWidget::remove_image);
    (jar, widget_response(&state, &visitor, &headers))
}

/// POST /widget/send - Send the draft and wait for the reply.
///
/// The widget is unlocked while the request is in flight, so concurrent
/// fragment requests render the loading state.
pub async fn send(
    State(state): State<SiteState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<SendForm>,
) -> impl IntoResponse {
    let (visitor, jar) = resolve_visitor(&state, jar);

    let pending = visitor.with_widget(|w| {
        w.set_draft(form.message);
        w.begin_send()
    });

    match pending {
        Ok(pending) => {
            tracing::info!(
                visitor_id = %visitor.id(),
                message_length = pending.message().len(),
                "Sending chat message"
            );
            let outcome = pending.dispatch(state.transport.as_ref()).await;
            visitor.with_widget(|w| w.complete(outcome));
        }
        Err(SendRejected::EmptyDraft) => {}
        Err(SendRejected::InFlight) => {
            tracing::debug!(visitor_id = %visitor.id(), "Send ignored while a request is in flight");
        }
    }

    (jar, widget_response(&state, &visitor, &headers))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
