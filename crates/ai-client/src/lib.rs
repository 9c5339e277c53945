pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod speech;
pub mod transcribe;

pub use embeddings::HttpEmbedder;
pub use error::{AiError, AiResult};
pub use gemini::GeminiClient;
pub use generator::{build_context, build_prompt, AnswerGenerator, MODEL_UNAVAILABLE};
pub use speech::GoogleTtsClient;
pub use transcribe::WhisperClient;

use std::time::Duration;

/// Configuration for the hosted AI services
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub embeddings_url: String,
    pub embeddings_api_key: Option<String>,
    pub embeddings_model: String,
    pub whisper_url: String,
    pub whisper_api_key: Option<String>,
    pub whisper_model: String,
    pub tts_lang: String,
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            embeddings_url: std::env::var("EMBEDDINGS_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            embeddings_api_key: non_empty_var("EMBEDDINGS_API_KEY"),
            embeddings_model: std::env::var("EMBEDDINGS_MODEL")
                .unwrap_or_else(|_| "all-minilm".to_string()),
            whisper_url: std::env::var("WHISPER_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            whisper_api_key: non_empty_var("WHISPER_API_KEY"),
            whisper_model: std::env::var("WHISPER_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),
            tts_lang: std::env::var("TTS_LANG").unwrap_or_else(|_| "en".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
