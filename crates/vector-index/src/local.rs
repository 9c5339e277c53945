use async_trait::async_trait;
use brief_core::{BriefError, TextEmbedder};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// all-MiniLM-L6-v2 running in-process. Holds the model weights in memory.
pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl LocalEmbedder {
    /// Load all-MiniLM-L6-v2 (384 dimensions), downloading it on first use
    pub fn new() -> Result<Self, BriefError> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| BriefError::NotConfigured(format!("failed to load embedding model: {}", e)))?;
        tracing::info!("Loaded local embedding model all-MiniLM-L6-v2");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl TextEmbedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BriefError> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        // Inference is CPU bound; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| BriefError::Index("embedding model lock poisoned".to_string()))?;
            model
                .embed(vec![text], None)
                .map_err(|e| BriefError::Index(format!("embedding generation failed: {}", e)))?
                .pop()
                .ok_or_else(|| BriefError::Index("no embedding returned".to_string()))
        })
        .await
        .map_err(|e| BriefError::Index(format!("embedding task failed: {}", e)))?
    }

    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }
}
