use async_trait::async_trait;
use brief_core::{BriefError, LanguageModel};
use serde::{Deserialize, Serialize};

use crate::error::{AiError, AiResult};
use crate::AiConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Reported when Gemini answers without any candidate text. Shown to the
/// user verbatim.
pub const UNEXPECTED_FORMAT: &str = "Received unexpected response format from Gemini.";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Google Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout: std::time::Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
        }
    }

    /// `None` when no API key is configured
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let api_key = config.gemini_api_key.clone()?;
        Some(Self::new(api_key, config.gemini_model.clone(), config.timeout))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn generate_content(&self, prompt: &str) -> AiResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::from_response("gemini", response).await);
        }

        let body: GenerateResponse = response.json().await?;
        extract_text(body)
    }
}

fn extract_text(response: GenerateResponse) -> AiResult<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::InvalidResponse(UNEXPECTED_FORMAT.to_string()));
    }
    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, BriefError> {
        tracing::debug!("Calling {} with a {} char prompt", self.model, prompt.len());
        Ok(self.generate_content(prompt).await?)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
