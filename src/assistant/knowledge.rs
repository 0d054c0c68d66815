//! Document knowledge base with semantic retrieval.
//!
//! Documents are split into overlapping character chunks, embedded once at
//! load time, and ranked by cosine similarity against the embedded query.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use text_splitter::{Characters, ChunkConfig, ChunkConfigError, TextSplitter};
use thiserror::Error;
use walkdir::WalkDir;

const DOCUMENT_EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid chunk settings: {0}")]
    Chunking(#[from] ChunkConfigError),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

/// A retrievable piece of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Document the chunk came from.
    pub source: String,
    pub text: String,
}

/// Supplies context text for a query.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    async fn relevant_context(&self, query: &str) -> Result<String, KnowledgeError>;
}

/// Turns text into dense vectors.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, KnowledgeError>;
}

/// Local ONNX sentence embeddings (all-MiniLM-L6-v2).
#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model", &"all-MiniLM-L6-v2")
            .finish()
    }
}

impl FastEmbedder {
    /// Load the model, downloading it to the fastembed cache on first use.
    ///
    /// Blocking; call from `spawn_blocking` inside the runtime.
    pub fn new() -> Result<Self, KnowledgeError> {
        tracing::info!("Initializing fastembed model (all-MiniLM-L6-v2)...");
        let options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| KnowledgeError::Embedding(e.to_string()))?;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait::async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().unwrap_or_else(PoisonError::into_inner);
            guard.embed(texts, None)
        })
        .await
        .map_err(|e| KnowledgeError::Embedding(e.to_string()))?
        .map_err(|e| KnowledgeError::Embedding(e.to_string()))
    }
}

/// In-memory chunk index with one embedding per chunk.
#[derive(Default)]
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    /// Absent only for the empty knowledge base.
    embedder: Option<Arc<dyn Embedder>>,
    top_k: usize,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("chunks", &self.chunks.len())
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl KnowledgeBase {
    /// A knowledge base with no documents; every query yields empty context.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Chunk, embed and index `(source, text)` documents.
    pub async fn from_documents<I, S, T>(
        documents: I,
        chunk_size: usize,
        chunk_overlap: usize,
        top_k: usize,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, KnowledgeError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let config = ChunkConfig::new(chunk_size)
            .with_sizer(Characters)
            .with_trim(true)
            .with_overlap(chunk_overlap)?;
        let splitter = TextSplitter::new(config);

        let mut chunks = Vec::new();
        for (source, text) in documents {
            let source = source.into();
            chunks.extend(
                splitter
                    .chunks(text.as_ref())
                    .filter(|piece| !piece.trim().is_empty())
                    .map(|piece| Chunk {
                        source: source.clone(),
                        text: piece.to_string(),
                    }),
            );
        }

        let embeddings = if chunks.is_empty() {
            Vec::new()
        } else {
            tracing::info!(chunks = chunks.len(), "Generating chunk embeddings");
            let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect();
            embedder.embed(texts).await?
        };
        if embeddings.len() != chunks.len() {
            return Err(KnowledgeError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        Ok(Self {
            chunks,
            embeddings,
            embedder: Some(embedder),
            top_k,
        })
    }

    /// Load every `.txt` and `.md` file under `dir`.
    pub async fn load_dir(
        dir: impl AsRef<Path>,
        chunk_size: usize,
        chunk_overlap: usize,
        top_k: usize,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, KnowledgeError> {
        let dir = dir.as_ref();
        let documents = read_documents(dir)?;

        let kb = Self::from_documents(documents, chunk_size, chunk_overlap, top_k, embedder).await?;
        tracing::info!(
            path = %dir.display(),
            chunks = kb.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `k` chunks most similar to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<&Chunk>, KnowledgeError> {
        let Some(embedder) = &self.embedder else {
            return Ok(Vec::new());
        };
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::Embedding("no query embedding".to_string()))?;

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(index, embedding)| (index, cosine_similarity(&query_embedding, embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(index, _)| &self.chunks[index])
            .collect())
    }
}

#[async_trait::async_trait]
impl Retriever for KnowledgeBase {
    async fn relevant_context(&self, query: &str) -> Result<String, KnowledgeError> {
        let chunks = self.search(query, self.top_k).await?;
        tracing::debug!(found = chunks.len(), "Retrieved knowledge chunks");
        Ok(chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// `(source, text)` for every document file under `dir`, sorted by path.
fn read_documents(dir: &Path) -> Result<Vec<(String, String)>, KnowledgeError> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| KnowledgeError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_document = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if !entry.file_type().is_file() || !is_document {
            continue;
        }

        let text = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .display()
            .to_string();
        documents.push((source, text));
    }

    Ok(documents)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
