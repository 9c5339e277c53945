use async_trait::async_trait;
use brief_core::{BriefError, Transcriber};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::{AiError, AiResult};
use crate::AiConfig;

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper behind an OpenAI-compatible `/audio/transcriptions` endpoint
#[derive(Clone)]
pub struct WhisperClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperClient {
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
            config.whisper_url.clone(),
            config.whisper_model.clone(),
            config.whisper_api_key.clone(),
            config.timeout,
        )
    }

    pub async fn transcribe_bytes(&self, audio: &[u8], file_name: &str) -> AiResult<String> {
        if audio.is_empty() {
            return Err(AiError::InvalidResponse("empty audio upload".to_string()));
        }

        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", Part::bytes(audio.to_vec()).file_name(file_name.to_string()));

        let mut request = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AiError::from_response("whisper", response).await);
        }

        let body: TranscriptionResponse = response.json().await?;
        let text = body.text.trim().to_string();
        tracing::info!("Transcribed {} bytes of audio into {} chars", audio.len(), text.len());
        Ok(text)
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &[u8], file_name: &str) -> Result<String, BriefError> {
        Ok(self.transcribe_bytes(audio, file_name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_audio_rejected_before_request() {
        let client = WhisperClient::new(
            "http://127.0.0.1:9".to_string(),
            "whisper-1".to_string(),
            None,
            std::time::Duration::from_secs(1),
        );
        let err = client.transcribe(&[], "question.wav").await.unwrap_err();
        assert!(matches!(err, BriefError::InvalidResponse(_)));
    }

    #[test]
    fn test_response_shape() {
        let body: TranscriptionResponse =
            serde_json::from_str(r#"{"text":" What's Tesla's P/E ratio? "}"#).unwrap();
        assert_eq!(body.text.trim(), "What's Tesla's P/E ratio?");
    }
}
