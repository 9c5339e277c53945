//! `v8/finance/chart` payloads: daily bars plus dividend/split events.

use brief_core::{ActionKind, BriefError, CorporateAction, PriceBar};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;

/// Bars and corporate actions decoded from one chart response
#[derive(Debug, Default)]
pub struct ChartData {
    pub bars: Vec<PriceBar>,
    pub actions: Vec<CorporateAction>,
}

/// Map a day count onto the closest chart `range` that covers it
pub fn range_for_days(days: u32) -> &'static str {
    match days {
        0..=1 => "1d",
        2..=5 => "5d",
        6..=30 => "1mo",
        31..=90 => "3mo",
        91..=180 => "6mo",
        181..=365 => "1y",
        _ => "5y",
    }
}

pub fn parse_chart(body: &str) -> Result<ChartData, BriefError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| BriefError::InvalidResponse(format!("failed to parse yahoo chart: {}", e)))?;

    if let Some(error) = response.chart.error {
        // Unknown or delisted symbols come back as a "Not Found" chart error
        if error.code.eq_ignore_ascii_case("not found") {
            return Err(BriefError::NoData(error.description));
        }
        return Err(BriefError::Upstream(format!("yahoo chart error {}: {}", error.code, error.description)));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(ChartData::default());
    };

    let mut bars = Vec::new();
    if let (Some(timestamps), Some(quote)) = (result.timestamp.as_ref(), result.indicators.quote.first()) {
        for (i, &ts) in timestamps.iter().enumerate() {
            // Yahoo pads halted sessions with nulls; keep only complete bars
            let ohlc = (
                value_at(&quote.open, i),
                value_at(&quote.high, i),
                value_at(&quote.low, i),
                value_at(&quote.close, i),
            );
            let (Some(open), Some(high), Some(low), Some(close)) = ohlc else {
                continue;
            };
            let Some(date) = date_from_unix(ts) else {
                continue;
            };
            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: value_at(&quote.volume, i).unwrap_or(0.0),
            });
        }
    }

    let mut actions = Vec::new();
    if let Some(events) = result.events {
        for dividend in events.dividends.into_values() {
            if let Some(date) = date_from_unix(dividend.date) {
                actions.push(CorporateAction {
                    date,
                    kind: ActionKind::Dividend,
                    value: dividend.amount,
                });
            }
        }
        for split in events.splits.into_values() {
            if split.denominator == 0.0 {
                continue;
            }
            if let Some(date) = date_from_unix(split.date) {
                actions.push(CorporateAction {
                    date,
                    kind: ActionKind::Split,
                    value: split.numerator / split.denominator,
                });
            }
        }
    }
    actions.sort_by(|a, b| a.date.cmp(&b.date));

    Ok(ChartData { bars, actions })
}

fn value_at(series: &[Option<f64>], i: usize) -> Option<f64> {
    series.get(i).copied().flatten().filter(|v| v.is_finite())
}

fn date_from_unix(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
    #[serde(default)]
    splits: HashMap<String, SplitEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct SplitEvent {
    date: i64,
    numerator: f64,
    denominator: f64,
}
