//! Text-to-speech through the Google Translate TTS endpoint.
//!
//! The endpoint only accepts short inputs, so text is split into chunks of at
//! most 100 characters and the returned MP3 segments are concatenated.

use async_trait::async_trait;
use brief_core::{BriefError, SpeechSynthesizer};

use crate::error::{AiError, AiResult};
use crate::AiConfig;

const TTS_URL: &str = "https://translate.google.com/translate_tts";
const MAX_CHUNK_CHARS: usize = 100;

#[derive(Clone)]
pub struct GoogleTtsClient {
    client: reqwest::Client,
    base_url: String,
    lang: String,
}

impl GoogleTtsClient {
    pub fn new(lang: String, timeout: std::time::Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url: TTS_URL.to_string(),
            lang,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(config.tts_lang.clone(), config.timeout)
    }

    pub async fn speak(&self, text: &str) -> AiResult<Vec<u8>> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(AiError::InvalidResponse("nothing to speak".to_string()));
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", self.lang.as_str()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .header("User-Agent", "Mozilla/5.0")
                .header("Referer", "https://translate.google.com/")
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(AiError::from_response("tts", response).await);
            }
            audio.extend_from_slice(&response.bytes().await?);
        }

        tracing::debug!("Synthesized {} bytes of audio from {} chunks", audio.len(), chunks.len());
        Ok(audio)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BriefError> {
        Ok(self.speak(text).await?)
    }
}

/// Split on whitespace into chunks of at most `max_chars` characters.
/// A single word longer than the limit is cut mid-word.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if current_len > 0 {
            chunks.push(std::mem::take(&mut current));
        }

        if word_len <= max_chars {
            current.push_str(word);
        } else {
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(max_chars).map(|c| c.iter().collect::<String>());
            let mut last = pieces.next().unwrap_or_default();
            for piece in pieces {
                chunks.push(std::mem::replace(&mut last, piece));
            }
            current = last;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
