//! Recent headlines scraped from the Yahoo Finance quote page.
//!
//! The scrape is best effort: a layout change simply yields no headlines.

use async_trait::async_trait;
use brief_core::{BriefError, NewsSource, Ticker};
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;

/// Headlines kept per ticker
pub const DEFAULT_HEADLINE_LIMIT: usize = 5;

const QUOTE_PAGE_URL: &str = "https://finance.yahoo.com/quote";

/// Pulls `h3` headlines that mention the ticker from the quote page
#[derive(Clone)]
pub struct YahooNewsScraper {
    http_client: Client,
}

impl YahooNewsScraper {
    pub fn new(timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http_client }
    }

    async fn fetch_page(&self, ticker: &Ticker) -> Result<String, BriefError> {
        let url = format!("{}/{}", QUOTE_PAGE_URL, ticker);

        let response = self
            .http_client
            .get(&url)
            .query(&[("p", ticker.as_str())])
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BriefError::Timeout(e.to_string())
                } else {
                    BriefError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BriefError::Upstream(format!("quote page returned HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| BriefError::Upstream(e.to_string()))
    }
}

#[async_trait]
impl NewsSource for YahooNewsScraper {
    async fn headlines(&self, ticker: &Ticker, limit: usize) -> Result<Vec<String>, BriefError> {
        let page = self.fetch_page(ticker).await?;
        let headlines = extract_headlines(&page, ticker, limit);
        tracing::debug!("Scraped {} headlines for {}", headlines.len(), ticker);
        Ok(headlines)
    }
}

/// Text of every `h3` that mentions the ticker (case-insensitive), trimmed,
/// in page order, at most `limit` of them.
pub fn extract_headlines(html: &str, ticker: &Ticker, limit: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse("h3") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let needle = ticker.as_str().to_uppercase();

    document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .filter(|text| text.to_uppercase().contains(&needle))
        .map(|text| text.trim().to_string())
        .take(limit)
        .collect()
}

/// Wraps a [`NewsSource`] and turns every failure into "no headlines".
#[derive(Clone)]
pub struct NewsFetcher {
    source: Arc<dyn NewsSource>,
    limit: usize,
}

impl NewsFetcher {
    pub fn new(source: Arc<dyn NewsSource>) -> Self {
        Self {
            source,
            limit: DEFAULT_HEADLINE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Same as [`NewsFetcher::recent`] but keeps the failure for callers that report it
    pub async fn try_recent(&self, ticker: &Ticker) -> Result<Vec<String>, BriefError> {
        self.source.headlines(ticker, self.limit).await
    }

    pub async fn recent(&self, ticker: &Ticker) -> Vec<String> {
        self.try_recent(ticker)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("News fetch failed for {}: {}. Continuing without headlines.", ticker, e);
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h3>Markets wrap</h3>
          <h3>
            Tesla (TSLA) shares jump after delivery beat
          </h3>
          <h3><a href="/x">Why <b>tsla</b> bulls are back</a></h3>
          <h3>TSLA: robotaxi event date set</h3>
          <h3>TSLA options activity spikes</h3>
          <h3>Is TSLA overvalued?</h3>
          <h3>TSLA sixth headline</h3>
        </body></html>
    "#;

    #[test]
    fn test_extract_filters_and_trims() {
        let headlines = extract_headlines(PAGE, &Ticker::from("TSLA"), 5);
        assert_eq!(headlines.len(), 5);
        assert_eq!(headlines[0], "Tesla (TSLA) shares jump after delivery beat");
        assert_eq!(headlines[1], "Why tsla bulls are back");
        assert!(!headlines.iter().any(|h| h.contains("sixth")));
    }

    #[test]
    fn test_extract_no_matches() {
        let headlines = extract_headlines(PAGE, &Ticker::from("AAPL"), 5);
        assert!(headlines.is_empty());
    }

    #[test]
    fn test_malformed_html_yields_empty() {
        let headlines = extract_headlines("<h3<<>>not</really html", &Ticker::from("TSLA"), 5);
        assert!(headlines.is_empty());
        assert!(extract_headlines("", &Ticker::from("TSLA"), 5).is_empty());
    }

    struct FailingSource;

    #[async_trait]
    impl NewsSource for FailingSource {
        async fn headlines(&self, _ticker: &Ticker, _limit: usize) -> Result<Vec<String>, BriefError> {
            Err(BriefError::Timeout("quote page".to_string()))
        }
    }

    struct StaticSource;

    #[async_trait]
    impl NewsSource for StaticSource {
        async fn headlines(&self, ticker: &Ticker, limit: usize) -> Result<Vec<String>, BriefError> {
            Ok(extract_headlines(PAGE, ticker, limit))
        }
    }

    #[tokio::test]
    async fn test_recent_collapses_errors() {
        let fetcher = NewsFetcher::new(Arc::new(FailingSource));
        assert!(fetcher.recent(&Ticker::from("TSLA")).await.is_empty());
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let fetcher = NewsFetcher::new(Arc::new(StaticSource)).with_limit(2);
        assert_eq!(fetcher.recent(&Ticker::from("TSLA")).await.len(), 2);
    }
}
