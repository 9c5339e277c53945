//! End-to-end question answering: resolve, fetch, index, retrieve, generate, speak.

pub mod fetch;

#[cfg(test)]
mod tests;

pub use fetch::{fetch_sources, source_documents, FetchedSources};

use ai_client::AnswerGenerator;
use brief_core::{
    Answer, BriefError, DocumentMetadata, ErrorKind, LatestQuote, MarketDataProvider, ScoredDocument, SourceKind,
    SpeechSynthesizer, SymbolResolver, Ticker, Transcriber,
};
use news_feed::NewsFetcher;
use serde::Serialize;
use std::sync::Arc;
use vector_index::VectorIndex;

/// Shown when the query names no tracked company
pub const UNKNOWN_COMPANY_WARNING: &str =
    "Could not identify a company in your query. Try mentioning a company name like Apple or Microsoft.";

/// Trailing days of price history fetched per query
pub const DEFAULT_HISTORY_DAYS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Transcription,
    MarketData,
    News,
    Indexing,
    Retrieval,
    Generation,
    Speech,
}

/// A failure the pipeline tolerated and carried on past
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl StageFailure {
    fn new(stage: Stage, err: &BriefError) -> Self {
        Self {
            stage,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BriefOptions {
    /// Synthesize the answer to MP3
    pub speak: bool,
    /// Overrides the orchestrator's retrieval depth
    pub k: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Brief {
    pub query: String,
    pub ticker: Ticker,
    pub answer: Answer,
    pub sources: Vec<ScoredDocument>,
    pub indexed: Vec<SourceKind>,
    pub degraded: Vec<StageFailure>,
}

#[derive(Debug, Clone)]
pub enum BriefOutcome {
    UnknownCompany { message: String },
    Answered(Box<Brief>),
}

impl BriefOutcome {
    pub fn brief(&self) -> Option<&Brief> {
        match self {
            BriefOutcome::Answered(brief) => Some(brief),
            BriefOutcome::UnknownCompany { .. } => None,
        }
    }
}

pub struct BriefOrchestrator {
    resolver: SymbolResolver,
    market: Arc<dyn MarketDataProvider>,
    news: NewsFetcher,
    index: Arc<VectorIndex>,
    generator: AnswerGenerator,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    history_days: u32,
    k: usize,
}

impl BriefOrchestrator {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        news: NewsFetcher,
        index: Arc<VectorIndex>,
        generator: AnswerGenerator,
    ) -> Self {
        Self {
            resolver: SymbolResolver::default(),
            market,
            news,
            index,
            generator,
            speech: None,
            transcriber: None,
            history_days: DEFAULT_HISTORY_DAYS,
            k: vector_index::DEFAULT_K,
        }
    }

    pub fn with_resolver(mut self, resolver: SymbolResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days.max(1);
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn resolver(&self) -> &SymbolResolver {
        &self.resolver
    }

    pub fn generator(&self) -> &AnswerGenerator {
        &self.generator
    }

    /// Run the full pipeline for one query. Never fails: tolerated problems are
    /// listed in [`Brief::degraded`].
    pub async fn brief(&self, query: &str, options: BriefOptions) -> BriefOutcome {
        let Some(ticker) = self.resolver.resolve(query) else {
            tracing::info!("No tracked company found in query");
            return BriefOutcome::UnknownCompany {
                message: UNKNOWN_COMPANY_WARNING.to_string(),
            };
        };
        tracing::info!("Building brief for {}", ticker);

        let mut degraded = Vec::new();

        let sources = fetch_sources(self.market.as_ref(), &self.news, &ticker, self.history_days).await;
        if let Err(e) = &sources.snapshot {
            tracing::warn!("Market data unavailable for {}: {}", ticker, e);
            degraded.push(StageFailure::new(Stage::MarketData, e));
        }
        if let Err(e) = &sources.headlines {
            tracing::warn!("News unavailable for {}: {}", ticker, e);
            degraded.push(StageFailure::new(Stage::News, e));
        }

        let mut indexed = Vec::new();
        for (kind, text) in source_documents(&sources) {
            match self.index.add(text, DocumentMetadata::new(kind, ticker.clone())).await {
                Ok(_) => indexed.push(kind),
                Err(e) => {
                    let e = BriefError::from(e);
                    tracing::warn!("Failed to index {} for {}: {}", kind.as_str(), ticker, e);
                    degraded.push(StageFailure::new(Stage::Indexing, &e));
                }
            }
        }

        let sources = match self.retrieve(query, options.k.unwrap_or(self.k)).await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!("Retrieval failed: {}", e);
                degraded.push(StageFailure::new(Stage::Retrieval, &e));
                Vec::new()
            }
        };

        let text = match self.generator.try_generate(query, &sources).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Answer generation failed: {}", e);
                degraded.push(StageFailure::new(Stage::Generation, &e));
                self.generator.apology(&e)
            }
        };

        let mut answer = Answer::text_only(text);
        if options.speak {
            match self.speak(&answer.text).await {
                Ok(audio) => answer.audio = Some(audio),
                Err(e) => {
                    tracing::warn!("Speech synthesis failed: {}", e);
                    degraded.push(StageFailure::new(Stage::Speech, &e));
                }
            }
        }

        BriefOutcome::Answered(Box::new(Brief {
            query: query.to_string(),
            ticker,
            answer,
            sources,
            indexed,
            degraded,
        }))
    }

    /// Transcribe spoken input, then run [`BriefOrchestrator::brief`] on the text.
    /// Returns the transcript alongside the outcome.
    pub async fn brief_from_audio(
        &self,
        audio: &[u8],
        file_name: &str,
        options: BriefOptions,
    ) -> Result<(String, BriefOutcome), BriefError> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| BriefError::NotConfigured("speech-to-text is not configured".to_string()))?;

        let transcript = transcriber.transcribe(audio, file_name).await?;
        tracing::info!("Transcribed voice query: {}", transcript);
        let outcome = self.brief(&transcript, options).await;
        Ok((transcript, outcome))
    }

    /// Retrieval only, over everything indexed so far
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, BriefError> {
        Ok(self.index.search(query, k).await?)
    }

    pub async fn speak(&self, text: &str) -> Result<Vec<u8>, BriefError> {
        let speech = self
            .speech
            .as_ref()
            .ok_or_else(|| BriefError::NotConfigured("text-to-speech is not configured".to_string()))?;
        speech.synthesize(text).await
    }

    pub async fn latest_quote(&self, ticker: &Ticker) -> Result<LatestQuote, BriefError> {
        self.market.latest_quote(ticker).await
    }
}
