//! `v10/finance/quoteSummary` payloads: profile, analyst trend, statements.

use brief_core::{BriefError, Fundamentals, RecommendationTrend};
use chrono::DateTime;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Modules requested in a single quoteSummary call
pub const SUMMARY_MODULES: &[&str] = &[
    "price",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
    "assetProfile",
    "recommendationTrend",
    "incomeStatementHistory",
    "balanceSheetHistory",
    "cashflowStatementHistory",
];

/// Modules flattened into the descriptive profile, earlier ones win on key clashes
const PROFILE_MODULES: &[&str] = &[
    "price",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
    "assetProfile",
];

#[derive(Debug, Default)]
pub struct QuoteSummary {
    pub profile: BTreeMap<String, Value>,
    pub recommendations: Vec<RecommendationTrend>,
    pub fundamentals: Fundamentals,
}

pub fn parse_quote_summary(body: &str) -> Result<QuoteSummary, BriefError> {
    let response: Value = serde_json::from_str(body)
        .map_err(|e| BriefError::InvalidResponse(format!("failed to parse yahoo quoteSummary: {}", e)))?;

    let envelope = response
        .get("quoteSummary")
        .ok_or_else(|| BriefError::InvalidResponse("missing quoteSummary envelope".to_string()))?;

    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(match code {
            "Not Found" => BriefError::NoData(description),
            "Unauthorized" => BriefError::Unauthorized(description),
            _ => BriefError::Upstream(format!("yahoo quoteSummary error {}: {}", code, description)),
        });
    }

    let Some(result) = envelope
        .get("result")
        .and_then(Value::as_array)
        .and_then(|r| r.first())
        .and_then(Value::as_object)
    else {
        return Ok(QuoteSummary::default());
    };

    Ok(QuoteSummary {
        profile: parse_profile(result),
        recommendations: parse_recommendations(result),
        fundamentals: parse_fundamentals(result),
    })
}

fn parse_profile(result: &Map<String, Value>) -> BTreeMap<String, Value> {
    let mut profile = BTreeMap::new();
    for module in PROFILE_MODULES {
        let Some(fields) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in fields {
            if key == "maxAge" {
                continue;
            }
            if let Some(scalar) = scalar(value) {
                profile.entry(key.clone()).or_insert(scalar);
            }
        }
    }
    profile
}

fn parse_recommendations(result: &Map<String, Value>) -> Vec<RecommendationTrend> {
    let Some(trend) = result
        .get("recommendationTrend")
        .and_then(|m| m.get("trend"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    trend
        .iter()
        .map(|t| RecommendationTrend {
            period: t.get("period").and_then(Value::as_str).unwrap_or_default().to_string(),
            strong_buy: count(t, "strongBuy"),
            buy: count(t, "buy"),
            hold: count(t, "hold"),
            sell: count(t, "sell"),
            strong_sell: count(t, "strongSell"),
        })
        .collect()
}

fn parse_fundamentals(result: &Map<String, Value>) -> Fundamentals {
    let income = latest_statement(result, "incomeStatementHistory", "incomeStatementHistory");
    let balance = latest_statement(result, "balanceSheetHistory", "balanceSheetStatements");
    let cash_flow = latest_statement(result, "cashflowStatementHistory", "cashflowStatements");

    let period_end = income
        .and_then(|s| s.get("endDate"))
        .and_then(raw_number)
        .and_then(|ts| DateTime::from_timestamp(ts as i64, 0))
        .map(|dt| dt.date_naive());

    Fundamentals {
        period_end,
        income_statement: statement_lines(income),
        balance_sheet: statement_lines(balance),
        cash_flow: statement_lines(cash_flow),
    }
}

fn latest_statement<'a>(
    result: &'a Map<String, Value>,
    module: &str,
    list: &str,
) -> Option<&'a Map<String, Value>> {
    result
        .get(module)?
        .get(list)?
        .as_array()?
        .first()?
        .as_object()
}

fn statement_lines(statement: Option<&Map<String, Value>>) -> BTreeMap<String, f64> {
    let Some(statement) = statement else {
        return BTreeMap::new();
    };
    statement
        .iter()
        .filter(|(key, _)| key.as_str() != "endDate" && key.as_str() != "maxAge")
        .filter_map(|(key, value)| raw_number(value).map(|v| (key.clone(), v)))
        .collect()
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; empty wrappers mean "n/a"
fn raw_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Object(obj) => obj.get("raw").and_then(Value::as_f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn scalar(value: &Value) -> Option<Value> {
    match value {
        Value::Object(obj) => obj.get("raw").filter(|raw| !raw.is_null()).cloned(),
        Value::Number(_) | Value::Bool(_) => Some(value.clone()),
        Value::String(s) if !s.is_empty() => Some(value.clone()),
        _ => None,
    }
}

fn count(value: &Value, key: &str) -> u32 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0) as u32
}
