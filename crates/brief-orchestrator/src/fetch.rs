//! Concurrent source fetch and conversion of fetched data into index documents.

use brief_core::{BriefError, MarketDataProvider, MarketSnapshot, SourceKind, Ticker};
use news_feed::NewsFetcher;

/// Everything fetched for one query. Each source fails independently.
pub struct FetchedSources {
    pub snapshot: Result<MarketSnapshot, BriefError>,
    pub headlines: Result<Vec<String>, BriefError>,
}

/// Fetch the market snapshot and headlines concurrently
pub async fn fetch_sources(
    market: &dyn MarketDataProvider,
    news: &NewsFetcher,
    ticker: &Ticker,
    history_days: u32,
) -> FetchedSources {
    let (snapshot, headlines) = tokio::join!(
        market.snapshot(ticker, history_days),
        news.try_recent(ticker),
    );
    FetchedSources { snapshot, headlines }
}

/// Documents to index, in indexing order: stock data, filings, news.
///
/// A failed snapshot contributes nothing; filings are only emitted when the
/// snapshot carries statements; news only when there is at least one headline.
pub fn source_documents(sources: &FetchedSources) -> Vec<(SourceKind, String)> {
    let mut documents = Vec::new();

    if let Ok(snapshot) = &sources.snapshot {
        documents.push((SourceKind::StockData, snapshot.stock_document_text()));
        if let Some(filings) = snapshot.filings_document_text() {
            documents.push((SourceKind::FilingsData, filings));
        }
    }

    if let Ok(headlines) = &sources.headlines {
        if !headlines.is_empty() {
            documents.push((SourceKind::News, headlines.join("\n")));
        }
    }

    documents
}
