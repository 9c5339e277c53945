pub mod chart;
pub mod summary;

pub use chart::{parse_chart, range_for_days, ChartData};
pub use summary::{parse_quote_summary, QuoteSummary, SUMMARY_MODULES};

use async_trait::async_trait;
use brief_core::{BriefError, CorporateAction, LatestQuote, MarketDataProvider, MarketSnapshot, PriceBar, Ticker};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";

/// Yahoo rejects requests without a browser-looking agent
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front() {
                Some(&oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Where each Yahoo call goes
#[derive(Debug, Clone)]
pub struct YahooEndpoints {
    pub chart: String,
    pub summary: String,
    pub cookie: String,
    pub crumb: String,
}

impl Default for YahooEndpoints {
    fn default() -> Self {
        Self {
            chart: CHART_URL.to_string(),
            summary: SUMMARY_URL.to_string(),
            cookie: COOKIE_URL.to_string(),
            crumb: CRUMB_URL.to_string(),
        }
    }
}

impl YahooEndpoints {
    /// Every endpoint under one host, laid out as `/chart`, `/summary`,
    /// `/cookie` and `/getcrumb`
    pub fn at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            chart: format!("{}/chart", base),
            summary: format!("{}/summary", base),
            cookie: format!("{}/cookie", base),
            crumb: format!("{}/getcrumb", base),
        }
    }
}

/// Yahoo Finance client for chart and quoteSummary data
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    rate_limiter: RateLimiter,
    crumb: Arc<Mutex<Option<String>>>,
    endpoints: YahooEndpoints,
}

impl YahooClient {
    pub fn with_rate_limit(timeout: Duration, requests_per_minute: usize) -> Self {
        // Cookie store carries the session cookie the crumb is bound to
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(requests_per_minute, Duration::from_secs(60)),
            crumb: Arc::new(Mutex::new(None)),
            endpoints: YahooEndpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: YahooEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Send a rate-limited request and map transport and status failures.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, BriefError> {
        self.rate_limiter.acquire().await;

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                BriefError::Unauthorized(format!("yahoo returned HTTP {}", status))
            }
            StatusCode::NOT_FOUND => BriefError::NoData(format!("yahoo returned HTTP 404: {}", truncate(&body, 200))),
            StatusCode::TOO_MANY_REQUESTS => BriefError::Upstream("rate limited by Yahoo".to_string()),
            _ => BriefError::Upstream(format!("HTTP {}: {}", status, truncate(&body, 200))),
        })
    }

    /// Raw chart call
    pub async fn get_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
        with_events: bool,
    ) -> Result<ChartData, BriefError> {
        let url = format!("{}/{}", self.endpoints.chart, symbol);
        let mut query = vec![("range", range), ("interval", interval)];
        if with_events {
            query.push(("events", "div,split"));
        }

        let body = self
            .send_request(self.client.get(&url).query(&query))
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        parse_chart(&body)
    }

    /// Trailing `days` daily bars, oldest first
    pub async fn get_history(&self, symbol: &str, days: u32) -> Result<Vec<PriceBar>, BriefError> {
        let mut bars = self.get_chart(symbol, range_for_days(days), "1d", false).await?.bars;
        let keep = days.max(1) as usize;
        if bars.len() > keep {
            bars.drain(..bars.len() - keep);
        }
        Ok(bars)
    }

    /// Dividends and splits over the last five years
    pub async fn get_actions(&self, symbol: &str) -> Result<Vec<CorporateAction>, BriefError> {
        Ok(self.get_chart(symbol, "5y", "1mo", true).await?.actions)
    }

    /// Profile, analyst trend and latest statements in one call
    pub async fn get_quote_summary(&self, symbol: &str) -> Result<QuoteSummary, BriefError> {
        let crumb = self.crumb().await?;
        let url = format!("{}/{}", self.endpoints.summary, symbol);
        let modules = SUMMARY_MODULES.join(",");

        let result = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("modules", modules.as_str()), ("crumb", crumb.as_str())]),
            )
            .await;

        let body = match result {
            Ok(response) => response.text().await.map_err(transport_error)?,
            Err(e) => {
                if matches!(e, BriefError::Unauthorized(_)) {
                    self.invalidate_crumb().await;
                }
                return Err(e);
            }
        };

        let parsed = parse_quote_summary(&body);
        if matches!(parsed, Err(BriefError::Unauthorized(_))) {
            self.invalidate_crumb().await;
        }
        parsed
    }

    /// Cached crumb, fetched on first use
    async fn crumb(&self) -> Result<String, BriefError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // fc.yahoo.com answers 404 but sets the session cookie; only transport errors matter
        self.rate_limiter.acquire().await;
        self.client
            .get(&self.endpoints.cookie)
            .header("referer", "https://finance.yahoo.com/")
            .send()
            .await
            .map_err(transport_error)?;

        let body = self
            .send_request(self.client.get(&self.endpoints.crumb).header("referer", "https://finance.yahoo.com/"))
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        let crumb = body.trim();
        if crumb.is_empty() || crumb.len() >= 100 || crumb.contains(' ') || crumb.contains('<') {
            return Err(BriefError::Unauthorized("yahoo did not issue a crumb".to_string()));
        }

        tracing::debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn invalidate_crumb(&self) {
        tracing::warn!("Yahoo rejected the session crumb, it will be refreshed on the next request");
        *self.crumb.lock().await = None;
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn snapshot(&self, ticker: &Ticker, history_days: u32) -> Result<MarketSnapshot, BriefError> {
        let symbol = ticker.as_str();
        tracing::info!("Fetching market snapshot for {} ({} days)", symbol, history_days);

        let (history, summary, actions) = tokio::join!(
            self.get_history(symbol, history_days),
            self.get_quote_summary(symbol),
            self.get_actions(symbol),
        );

        assemble_snapshot(ticker, history, summary, actions)
    }

    async fn latest_quote(&self, ticker: &Ticker) -> Result<LatestQuote, BriefError> {
        let bars = self.get_history(ticker.as_str(), 2).await?;
        day_change(ticker, &bars)
            .ok_or_else(|| BriefError::NoData(format!("not enough history for {}", ticker)))
    }
}

/// Combine the three fetches. Price history is required; the quote summary
/// and corporate actions fall back to empty with a warning.
pub fn assemble_snapshot(
    ticker: &Ticker,
    history: Result<Vec<PriceBar>, BriefError>,
    summary: Result<QuoteSummary, BriefError>,
    actions: Result<Vec<CorporateAction>, BriefError>,
) -> Result<MarketSnapshot, BriefError> {
    let history = history?;
    if history.is_empty() {
        return Err(BriefError::NoData(format!("no price history for {}", ticker)));
    }

    let summary = summary.unwrap_or_else(|e| {
        tracing::warn!("Quote summary unavailable for {}: {}", ticker, e);
        QuoteSummary::default()
    });
    let actions = actions.unwrap_or_else(|e| {
        tracing::warn!("Corporate actions unavailable for {}: {}", ticker, e);
        Vec::new()
    });

    Ok(MarketSnapshot {
        ticker: ticker.clone(),
        history,
        profile: summary.profile,
        fundamentals: summary.fundamentals,
        recommendations: summary.recommendations,
        actions,
        fetched_at: Utc::now(),
    })
}

/// Last close and its percent change over the previous close, rounded to 2 dp
pub fn day_change(ticker: &Ticker, bars: &[PriceBar]) -> Option<LatestQuote> {
    let [.., prev, latest] = bars else {
        return None;
    };
    if prev.close == 0.0 {
        return None;
    }
    let change = (latest.close - prev.close) / prev.close * 100.0;
    Some(LatestQuote {
        ticker: ticker.clone(),
        price: latest.close,
        change_percent: (change * 100.0).round() / 100.0,
    })
}

fn transport_error(e: reqwest::Error) -> BriefError {
    if e.is_timeout() {
        BriefError::Timeout(e.to_string())
    } else {
        BriefError::Upstream(e.to_string())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
