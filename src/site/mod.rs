//! Landing site server.
//!
//! Renders the marketing page and hosts one [`ChatWidget`](crate::widget::ChatWidget)
//! per visitor. Widget sends are relayed to the configured chat endpoint.

pub mod handlers;
pub mod visitors;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{ServerConfig, WidgetConfig};
use crate::widget::{ChatTransport, HttpTransport, MAX_IMAGE_BYTES};
use visitors::WidgetStore;

/// Multipart framing allowed on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Largest accepted request body.
pub const UPLOAD_LIMIT: usize = MAX_IMAGE_BYTES + MULTIPART_OVERHEAD;

/// State shared by the site handlers.
#[derive(Clone)]
pub struct SiteState {
    pub widgets: WidgetStore,
    pub transport: Arc<dyn ChatTransport>,
    pub config: Arc<WidgetConfig>,
}

impl std::fmt::Debug for SiteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteState")
            .field("widgets", &self.widgets.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SiteState {
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, config: WidgetConfig) -> Self {
        Self {
            widgets: WidgetStore::new(),
            transport,
            config: Arc::new(config),
        }
    }
}

/// Build the site router.
pub fn router(state: SiteState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/widget", get(handlers::widget))
        .route("/widget/open", post(handlers::open))
        .route("/widget/close", post(handlers::close))
        .route("/widget/image", post(handlers::attach_image))
        .route("/widget/image/remove", post(handlers::remove_image))
        .route("/widget/send", post(handlers::send))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the site server.
pub async fn serve(server: ServerConfig, widget: WidgetConfig) -> anyhow::Result<()> {
    let transport = HttpTransport::new(&widget.endpoint)?;
    info!(
        name: "widget.endpoint",
        endpoint = %transport.endpoint(),
        "Chat endpoint configured"
    );

    let idle_timeout = Duration::from_secs(widget.visitor_timeout_secs);
    let state = SiteState::new(Arc::new(transport), widget);
    spawn_visitor_cleanup(state.widgets.clone(), idle_timeout);

    let app = router(state);

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Site server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

fn spawn_visitor_cleanup(widgets: WidgetStore, timeout: Duration) {
    let period = (timeout / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = widgets.cleanup_idle(timeout);
            if removed > 0 {
                info!(name: "visitor.expired", removed, "Dropped idle visitors");
            }
        }
    });
}
