use async_trait::async_trait;

use crate::{BriefError, LatestQuote, MarketSnapshot, Ticker};

/// Source of price history, fundamentals and corporate actions
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch a snapshot with `history_days` of daily bars.
    /// An empty history is `BriefError::NoData`.
    async fn snapshot(&self, ticker: &Ticker, history_days: u32) -> Result<MarketSnapshot, BriefError>;

    async fn latest_quote(&self, ticker: &Ticker) -> Result<LatestQuote, BriefError>;
}

/// Source of recent headlines for a ticker
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn headlines(&self, ticker: &Ticker, limit: usize) -> Result<Vec<String>, BriefError>;
}

/// Sentence-embedding backend
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BriefError>;

    fn model_name(&self) -> &str;
}

/// Remote generative model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, BriefError>;

    fn model_name(&self) -> &str;
}

/// Text-to-speech backend producing MP3 bytes
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BriefError>;
}

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8], file_name: &str) -> Result<String, BriefError>;
}
