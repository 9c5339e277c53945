//! OpenAI-compatible `/embeddings` client (Ollama, vLLM, OpenAI, GitHub Models).

use async_trait::async_trait;
use brief_core::{BriefError, TextEmbedder};
use serde::{Deserialize, Serialize};

use crate::error::{AiError, AiResult};
use crate::AiConfig;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbedder {
    pub fn new(base_url: String, model: String, api_key: Option<String>, timeout: std::time::Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(
            config.embeddings_url.clone(),
            config.embeddings_model.clone(),
            config.embeddings_api_key.clone(),
            config.timeout,
        )
    }

    pub async fn create_embedding(&self, text: &str) -> AiResult<Vec<f32>> {
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AiError::from_response("embeddings", response).await);
        }

        let body: EmbeddingResponse = response.json().await?;
        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AiError::InvalidResponse("no embedding returned".to_string()))
    }
}

#[async_trait]
impl TextEmbedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BriefError> {
        Ok(self.create_embedding(text).await?)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,-0.2,0.3]}],"model":"all-minilm"}"#,
        )
        .unwrap();
        assert_eq!(body.data[0].embedding, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let embedder = HttpEmbedder::new(
            "http://localhost:11434/v1/".to_string(),
            "all-minilm".to_string(),
            None,
            std::time::Duration::from_secs(5),
        );
        assert_eq!(embedder.base_url, "http://localhost:11434/v1");
    }

    #[tokio::test]
    #[ignore] // requires a running embeddings endpoint
    async fn test_live_embedding() {
        let embedder = HttpEmbedder::from_config(&AiConfig::default());
        let embedding = embedder.embed("Tesla deliveries beat estimates").await.unwrap();
        assert!(!embedding.is_empty());
    }
}
