use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

/// Exchange symbol of a tracked company
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Daily OHLCV record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Analyst recommendation counts for one period ("0m", "-1m", ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationTrend {
    pub period: String,
    pub strong_buy: u32,
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
    pub strong_sell: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Dividend,
    Split,
}

/// Dividend (value = cash amount) or split (value = ratio)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorporateAction {
    pub date: NaiveDate,
    pub kind: ActionKind,
    pub value: f64,
}

/// Latest-period financial statements, statement line -> value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub period_end: Option<NaiveDate>,
    pub income_statement: BTreeMap<String, f64>,
    pub balance_sheet: BTreeMap<String, f64>,
    pub cash_flow: BTreeMap<String, f64>,
}

impl Fundamentals {
    pub fn is_empty(&self) -> bool {
        self.income_statement.is_empty() && self.balance_sheet.is_empty() && self.cash_flow.is_empty()
    }
}

/// Point-in-time bundle of everything fetched for a ticker.
/// Built fresh for every query; never mutated after the fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: Ticker,
    pub history: Vec<PriceBar>,
    pub profile: BTreeMap<String, serde_json::Value>,
    pub fundamentals: Fundamentals,
    pub recommendations: Vec<RecommendationTrend>,
    pub actions: Vec<CorporateAction>,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Text body indexed under `SourceKind::StockData`
    pub fn stock_document_text(&self) -> String {
        let mut out = format!("{} stock data (as of {})\n", self.ticker, self.fetched_at.format("%Y-%m-%d %H:%M UTC"));

        if !self.profile.is_empty() {
            out.push_str("Profile:\n");
            for (key, value) in &self.profile {
                let _ = writeln!(out, "  {}: {}", key, render_value(value));
            }
        }

        if !self.history.is_empty() {
            let _ = writeln!(out, "Price history ({} sessions):", self.history.len());
            for bar in &self.history {
                let _ = writeln!(
                    out,
                    "  {} open {:.2} high {:.2} low {:.2} close {:.2} volume {:.0}",
                    bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
                );
            }
        }

        if !self.recommendations.is_empty() {
            out.push_str("Analyst recommendations:\n");
            for r in &self.recommendations {
                let _ = writeln!(
                    out,
                    "  {}: strong buy {}, buy {}, hold {}, sell {}, strong sell {}",
                    r.period, r.strong_buy, r.buy, r.hold, r.sell, r.strong_sell
                );
            }
        }

        if !self.actions.is_empty() {
            out.push_str("Corporate actions:\n");
            for a in &self.actions {
                let label = match a.kind {
                    ActionKind::Dividend => "dividend",
                    ActionKind::Split => "split",
                };
                let _ = writeln!(out, "  {} {} {}", a.date, label, a.value);
            }
        }

        out
    }

    /// Text body indexed under `SourceKind::FilingsData`, `None` when no
    /// statement came back.
    pub fn filings_document_text(&self) -> Option<String> {
        if self.fundamentals.is_empty() {
            return None;
        }

        let mut out = match self.fundamentals.period_end {
            Some(date) => format!("{} financial statements (period ending {})\n", self.ticker, date),
            None => format!("{} financial statements\n", self.ticker),
        };

        for (title, lines) in [
            ("Income statement", &self.fundamentals.income_statement),
            ("Balance sheet", &self.fundamentals.balance_sheet),
            ("Cash flow", &self.fundamentals.cash_flow),
        ] {
            if lines.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}:", title);
            for (line, value) in lines {
                let _ = writeln!(out, "  {}: {}", line, value);
            }
        }

        Some(out)
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Last close and day-over-day move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestQuote {
    pub ticker: Ticker,
    pub price: f64,
    pub change_percent: f64,
}

/// Where an indexed document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    StockData,
    FilingsData,
    News,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::StockData => "stock_data",
            SourceKind::FilingsData => "filings_data",
            SourceKind::News => "news",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: SourceKind,
    pub symbol: Ticker,
}

impl DocumentMetadata {
    pub fn new(source: SourceKind, symbol: Ticker) -> Self {
        Self { source, symbol }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// A retrieved document and its distance to the query (lower is closer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: IndexedDocument,
    pub distance: f32,
}

/// Generated text, optionally with synthesized MP3 audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
}

impl Answer {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio: None,
        }
    }
}
