use super::*;
use ai_client::MODEL_UNAVAILABLE;
use async_trait::async_trait;
use brief_core::{Fundamentals, LanguageModel, MarketSnapshot, NewsSource, PriceBar, TextEmbedder};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Clone, Copy)]
enum MarketMode {
    Full,
    NoFundamentals,
    EmptyHistory,
    Down,
}

struct FakeMarket {
    mode: MarketMode,
}

fn snapshot(ticker: &Ticker, with_fundamentals: bool) -> MarketSnapshot {
    let mut profile = BTreeMap::new();
    profile.insert("trailingPE".to_string(), serde_json::json!(64.2));
    profile.insert("longName".to_string(), serde_json::json!("Tesla, Inc."));

    let mut fundamentals = Fundamentals::default();
    if with_fundamentals {
        fundamentals.period_end = NaiveDate::from_ymd_opt(2023, 12, 31);
        fundamentals
            .income_statement
            .insert("netIncome".to_string(), 14_997_000_000.0);
    }

    MarketSnapshot {
        ticker: ticker.clone(),
        history: vec![PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            open: 182.1,
            high: 184.9,
            low: 178.4,
            close: 181.2,
            volume: 75_000_000.0,
        }],
        profile,
        fundamentals,
        recommendations: Vec::new(),
        actions: Vec::new(),
        fetched_at: Utc::now(),
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn snapshot(&self, ticker: &Ticker, _history_days: u32) -> Result<MarketSnapshot, BriefError> {
        match self.mode {
            MarketMode::Full => Ok(snapshot(ticker, true)),
            MarketMode::NoFundamentals => Ok(snapshot(ticker, false)),
            MarketMode::EmptyHistory => Err(BriefError::NoData(format!("no price history for {}", ticker))),
            MarketMode::Down => Err(BriefError::Timeout("chart".to_string())),
        }
    }

    async fn latest_quote(&self, ticker: &Ticker) -> Result<LatestQuote, BriefError> {
        Ok(LatestQuote {
            ticker: ticker.clone(),
            price: 181.2,
            change_percent: -1.05,
        })
    }
}

struct FakeNews {
    fail: bool,
}

#[async_trait]
impl NewsSource for FakeNews {
    async fn headlines(&self, ticker: &Ticker, limit: usize) -> Result<Vec<String>, BriefError> {
        if self.fail {
            return Err(BriefError::Upstream("quote page returned HTTP 503".to_string()));
        }
        Ok([
            format!("{} shares slide as price war deepens", ticker),
            format!("Analysts debate {} valuation", ticker),
        ]
        .into_iter()
        .take(limit)
        .collect())
    }
}

/// Counts a handful of keywords so related texts land close together
struct KeywordEmbedder;

const KEYWORDS: &[&str] = &["tsla", "tesla", "pe", "statement", "shares", "price", "income"];

#[async_trait]
impl TextEmbedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BriefError> {
        let lowered = text.to_lowercase();
        Ok(KEYWORDS.iter().map(|k| lowered.matches(k).count() as f32).collect())
    }

    fn model_name(&self) -> &str {
        "keywords"
    }
}

#[derive(Default)]
struct RecordingModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn complete(&self, prompt: &str) -> Result<String, BriefError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Tesla trades at 64.2x trailing earnings; sentiment is cautious.".to_string())
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

struct FakeSpeech {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BriefError> {
        if self.fail {
            return Err(BriefError::Upstream("tts returned HTTP 429".to_string()));
        }
        Ok(text.as_bytes().to_vec())
    }
}

struct FakeTranscriber;

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &[u8], _file_name: &str) -> Result<String, BriefError> {
        Ok("What's Tesla's P/E ratio?".to_string())
    }
}

struct Harness {
    orchestrator: BriefOrchestrator,
    model: Arc<RecordingModel>,
}

fn harness(mode: MarketMode, news_fails: bool) -> Harness {
    let model = Arc::new(RecordingModel::default());
    let orchestrator = BriefOrchestrator::new(
        Arc::new(FakeMarket { mode }),
        NewsFetcher::new(Arc::new(FakeNews { fail: news_fails })),
        Arc::new(VectorIndex::new(Arc::new(KeywordEmbedder))),
        AnswerGenerator::new(model.clone()),
    );
    Harness { orchestrator, model }
}

fn answered(outcome: BriefOutcome) -> Brief {
    match outcome {
        BriefOutcome::Answered(brief) => *brief,
        BriefOutcome::UnknownCompany { message } => panic!("expected an answer, got: {}", message),
    }
}

#[tokio::test]
async fn test_tesla_pe_end_to_end() {
    let h = harness(MarketMode::Full, false);

    let brief = answered(
        h.orchestrator
            .brief("What's Tesla's P/E ratio?", BriefOptions::default())
            .await,
    );

    assert_eq!(brief.ticker.as_str(), "TSLA");
    assert_eq!(
        brief.indexed,
        vec![SourceKind::StockData, SourceKind::FilingsData, SourceKind::News]
    );
    assert_eq!(brief.sources.len(), 3);
    assert!(brief.sources.iter().all(|s| s.document.metadata.symbol.as_str() == "TSLA"));
    assert!(brief.sources.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(brief.degraded.is_empty());
    assert!(brief.answer.audio.is_none());
    assert!(brief.answer.text.contains("64.2x"));

    let prompts = h.model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("trailingPE: 64.2"));
    assert!(prompts[0].contains("TSLA shares slide"));
    assert!(prompts[0].ends_with("Give a professional, crisp answer with key figures and sentiment."));
}

#[tokio::test]
async fn test_empty_history_skips_market_documents() {
    let h = harness(MarketMode::EmptyHistory, false);

    let brief = answered(h.orchestrator.brief("How is Tesla doing?", BriefOptions::default()).await);

    assert_eq!(brief.indexed, vec![SourceKind::News]);
    assert_eq!(h.orchestrator.index().len().await, 1);
    assert_eq!(brief.degraded.len(), 1);
    assert_eq!(brief.degraded[0].stage, Stage::MarketData);
    assert_eq!(brief.degraded[0].kind, ErrorKind::NoData);
    assert_eq!(h.model.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_all_sources_down_still_answers() {
    let h = harness(MarketMode::Down, true);

    let brief = answered(h.orchestrator.brief("tesla outlook", BriefOptions::default()).await);

    assert!(brief.indexed.is_empty());
    assert!(brief.sources.is_empty());
    let stages: Vec<Stage> = brief.degraded.iter().map(|f| f.stage).collect();
    assert_eq!(stages, vec![Stage::MarketData, Stage::News]);
    assert!(brief.degraded.iter().all(|f| f.kind == ErrorKind::Transient));
    assert!(!brief.answer.text.is_empty());
}

#[tokio::test]
async fn test_filings_skipped_without_fundamentals() {
    let h = harness(MarketMode::NoFundamentals, false);
    let brief = answered(h.orchestrator.brief("tesla", BriefOptions::default()).await);
    assert_eq!(brief.indexed, vec![SourceKind::StockData, SourceKind::News]);
}

#[tokio::test]
async fn test_unknown_company() {
    let h = harness(MarketMode::Full, false);

    let outcome = h
        .orchestrator
        .brief("What's the weather like?", BriefOptions::default())
        .await;

    match outcome {
        BriefOutcome::UnknownCompany { message } => assert_eq!(message, UNKNOWN_COMPANY_WARNING),
        BriefOutcome::Answered(_) => panic!("weather query should not resolve"),
    }
    assert!(h.orchestrator.index().is_empty().await);
    assert!(h.model.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_index_is_append_only_across_queries() {
    let h = harness(MarketMode::Full, false);
    h.orchestrator.brief("tesla", BriefOptions::default()).await;
    h.orchestrator.brief("tesla", BriefOptions::default()).await;
    assert_eq!(h.orchestrator.index().len().await, 6);
}

#[tokio::test]
async fn test_retrieval_depth_override() {
    let h = harness(MarketMode::Full, false);
    let options = BriefOptions {
        k: Some(1),
        ..BriefOptions::default()
    };
    let brief = answered(h.orchestrator.brief("tesla", options).await);
    assert_eq!(brief.sources.len(), 1);
}

#[tokio::test]
async fn test_missing_model_apologizes() {
    let orchestrator = BriefOrchestrator::new(
        Arc::new(FakeMarket { mode: MarketMode::Full }),
        NewsFetcher::new(Arc::new(FakeNews { fail: false })),
        Arc::new(VectorIndex::new(Arc::new(KeywordEmbedder))),
        AnswerGenerator::unavailable(),
    );

    let brief = answered(orchestrator.brief("tesla", BriefOptions::default()).await);

    assert_eq!(brief.answer.text, MODEL_UNAVAILABLE);
    assert_eq!(brief.degraded.len(), 1);
    assert_eq!(brief.degraded[0].stage, Stage::Generation);
    assert_eq!(brief.degraded[0].kind, ErrorKind::Misconfigured);
}

#[tokio::test]
async fn test_speak_attaches_audio() {
    let h = harness(MarketMode::Full, false);
    let orchestrator = h.orchestrator.with_speech(Arc::new(FakeSpeech { fail: false }));

    let options = BriefOptions {
        speak: true,
        ..BriefOptions::default()
    };
    let brief = answered(orchestrator.brief("tesla", options).await);

    assert_eq!(brief.answer.audio.as_deref(), Some(brief.answer.text.as_bytes()));
}

#[tokio::test]
async fn test_speech_failure_is_degraded() {
    let h = harness(MarketMode::Full, false);
    let orchestrator = h.orchestrator.with_speech(Arc::new(FakeSpeech { fail: true }));

    let options = BriefOptions {
        speak: true,
        ..BriefOptions::default()
    };
    let brief = answered(orchestrator.brief("tesla", options).await);

    assert!(brief.answer.audio.is_none());
    assert!(!brief.answer.text.is_empty());
    assert_eq!(brief.degraded.last().map(|f| f.stage), Some(Stage::Speech));
}

#[tokio::test]
async fn test_brief_from_audio() {
    let h = harness(MarketMode::Full, false);
    let orchestrator = h.orchestrator.with_transcriber(Arc::new(FakeTranscriber));

    let (transcript, outcome) = orchestrator
        .brief_from_audio(b"RIFF....WAVE", "question.wav", BriefOptions::default())
        .await
        .unwrap();

    assert_eq!(transcript, "What's Tesla's P/E ratio?");
    assert_eq!(outcome.brief().map(|b| b.ticker.as_str()), Some("TSLA"));
}

#[tokio::test]
async fn test_brief_from_audio_without_transcriber() {
    let h = harness(MarketMode::Full, false);
    let err = h
        .orchestrator
        .brief_from_audio(b"RIFF", "question.wav", BriefOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Misconfigured);
}

#[tokio::test]
async fn test_latest_quote_passthrough() {
    let h = harness(MarketMode::Full, false);
    let quote = h.orchestrator.latest_quote(&Ticker::from("AAPL")).await.unwrap();
    assert_eq!(quote.ticker.as_str(), "AAPL");
    assert_eq!(quote.change_percent, -1.05);
}

#[test]
fn test_source_documents_order() {
    let ticker = Ticker::from("TSLA");
    let sources = FetchedSources {
        snapshot: Ok(snapshot(&ticker, true)),
        headlines: Ok(vec!["TSLA one".to_string(), "TSLA two".to_string()]),
    };
    let docs = source_documents(&sources);
    let kinds: Vec<SourceKind> = docs.iter().map(|(k, _)| *k).collect();
    assert_eq!(kinds, vec![SourceKind::StockData, SourceKind::FilingsData, SourceKind::News]);
    assert_eq!(docs[2].1, "TSLA one\nTSLA two");

    let empty = FetchedSources {
        snapshot: Err(BriefError::NoData("empty".to_string())),
        headlines: Ok(Vec::new()),
    };
    assert!(source_documents(&empty).is_empty());
}
