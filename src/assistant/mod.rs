//! Property assistant service.
//!
//! Serves the `/chat` endpoint the widget talks to. Each turn is stored in a
//! session, routed to image analysis or knowledge retrieval for context, and
//! answered by an OpenAI-compatible chat model.
//!
//! # Modules
//!
//! - [`api`]: HTTP handlers
//! - [`router`]: image / text routing
//! - [`llm`]: Chat Completions client and prompt
//! - [`vision`]: image captioning and issue detection
//! - [`knowledge`]: document chunking and retrieval
//! - [`session`]: conversation history

pub mod api;
pub mod knowledge;
pub mod llm;
pub mod router;
pub mod session;
pub mod vision;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::config::AssistantConfig;
use knowledge::{FastEmbedder, KnowledgeBase};
use llm::{LlmClient, LlmSettings};
use router::AgentRouter;
use session::SessionStore;
use vision::VisionAnalyzer;

/// State shared by the assistant handlers.
#[derive(Debug, Clone)]
pub struct AssistantState {
    pub sessions: SessionStore,
    pub router: AgentRouter,
}

impl AssistantState {
    #[must_use]
    pub fn new(sessions: SessionStore, router: AgentRouter) -> Self {
        Self { sessions, router }
    }
}

/// Load the knowledge base named in the config, or an empty one.
///
/// The embedding model is only loaded when there are documents to index.
pub async fn load_knowledge(config: &AssistantConfig) -> anyhow::Result<KnowledgeBase> {
    let Some(path) = &config.knowledge_path else {
        tracing::warn!("No knowledge_path configured; answering without retrieved context");
        return Ok(KnowledgeBase::empty());
    };

    let embedder = tokio::task::spawn_blocking(FastEmbedder::new)
        .await
        .context("Embedding model initialization panicked")??;
    let kb = KnowledgeBase::load_dir(
        path,
        config.chunk_size,
        config.chunk_overlap,
        config.top_k,
        Arc::new(embedder),
    )
    .await?;
    Ok(kb)
}

/// Start the assistant server.
pub async fn serve(config: AssistantConfig, settings: LlmSettings) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        vision_model = %settings.vision_model(),
        "LLM configuration loaded"
    );

    let knowledge = Arc::new(load_knowledge(&config).await?);
    let client = LlmClient::new(settings);
    let router = AgentRouter::new(
        Arc::new(client.clone()),
        Arc::new(VisionAnalyzer::new(client)),
        knowledge,
    );

    let sessions = SessionStore::new();
    spawn_session_cleanup(
        sessions.clone(),
        Duration::from_secs(config.session_timeout_secs),
    );

    let app = api::router(AssistantState::new(sessions, router));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Assistant server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

fn spawn_session_cleanup(sessions: SessionStore, timeout: Duration) {
    let period = (timeout / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(timeout);
            if removed > 0 {
                info!(name: "session.expired", removed, "Expired idle sessions");
            }
        }
    });
}
