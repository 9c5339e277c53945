//! Single-purpose service routes
//!
//! Stock lookup, retrieval and speech exposed as separate handlers, plus a
//! morning brief that composes them over HTTP.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use brief_core::{BriefError, ErrorKind, Ticker};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::brief_routes::SourceView;
use crate::{ApiJson, AppError, AppState};

pub const MORNING_GREETING: &str = "Good morning. Here is your market brief.";
pub const MORNING_QUERY: &str = "What happened in the market yesterday?";
pub const MORNING_TICKER: &str = "AAPL";

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub ticker: String,
}

#[derive(Debug, Deserialize)]
pub struct RagRequest {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub query: String,
    pub results: Vec<SourceView>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: Option<String>,
}

pub fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", post(stock))
        .route("/rag", get(rag_summary).post(rag))
        .route("/speak", get(speak_to_file).post(speak))
        .route("/morning-brief", get(morning_brief))
}

/// Latest close and day change. Missing data is reported in the body, not as
/// an HTTP error.
async fn stock(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StockRequest>,
) -> Result<Json<Value>, AppError> {
    let symbol = req.ticker.trim();
    if symbol.is_empty() {
        return Err(AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("ticker must not be empty"),
        ));
    }

    match state.orchestrator.latest_quote(&Ticker::new(symbol.to_uppercase())).await {
        Ok(quote) => Ok(Json(serde_json::to_value(quote)?)),
        Err(e) if e.kind() == ErrorKind::NoData => {
            tracing::info!("No price data for {}", symbol);
            Ok(Json(json!({ "error": "No data found" })))
        }
        Err(e) => Err(AppError::from_brief("Stock lookup failed", e)),
    }
}

/// Top document for the standing morning question
async fn rag_summary(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let results = state
        .orchestrator
        .retrieve(MORNING_QUERY, 1)
        .await
        .map_err(|e| AppError::from_brief("Retrieval failed", e))?;

    let result = results.into_iter().next().map(|doc| doc.document.text);
    Ok(Json(json!({ "result": result })))
}

async fn rag(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RagRequest>,
) -> Result<Json<RagResponse>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("query must not be empty"),
        ));
    }

    let k = req.k.unwrap_or(state.config.retrieval_k);
    let results = state
        .orchestrator
        .retrieve(query, k)
        .await
        .map_err(|e| AppError::from_brief("Retrieval failed", e))?;

    Ok(Json(RagResponse {
        query: query.to_string(),
        results: results.into_iter().map(SourceView::from).collect(),
    }))
}

/// Speak the morning greeting into the configured voice file
async fn speak_to_file(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let audio = state
        .orchestrator
        .speak(MORNING_GREETING)
        .await
        .map_err(|e| AppError::from_brief("Speech synthesis failed", e))?;

    let path = &state.config.voice_output_path;
    tokio::fs::write(path, &audio)
        .await
        .with_context(|| format!("failed to write {}", path))?;
    tracing::info!(bytes = audio.len(), "Voice saved to {}", path);

    Ok(Json(json!({ "status": format!("Voice saved as {}", path) })))
}

/// The body is optional; an empty one speaks the greeting
async fn speak(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let req: SpeakRequest = if body.is_empty() {
        SpeakRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            AppError::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!("invalid speak request: {}", e))
        })?
    };
    let text = req
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(MORNING_GREETING);

    let audio = state
        .orchestrator
        .speak(text)
        .await
        .map_err(|e| AppError::from_brief("Speech synthesis failed", e))?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

/// Compose the stock, speech and retrieval services, in that order
async fn morning_brief(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let config = &state.config;
    let client = &state.http_client;

    let stock = fetch_json(
        client
            .post(format!("{}/stock", config.stock_service_url))
            .json(&json!({ "ticker": MORNING_TICKER })),
        "stock",
    )
    .await?;
    let voice = fetch_json(client.get(format!("{}/speak", config.speech_service_url)), "speech").await?;
    let rag = fetch_json(client.get(format!("{}/rag", config.rag_service_url)), "rag").await?;

    Ok(Json(json!({
        "stock": stock,
        "rag_summary": rag.get("result").cloned().unwrap_or(Value::Null),
        "voice_status": voice.get("status").cloned().unwrap_or(Value::Null),
    })))
}

async fn fetch_json(request: reqwest::RequestBuilder, service: &str) -> Result<Value, AppError> {
    let bad_gateway = |e: BriefError| AppError::from_brief(&format!("{} service", service), e);

    let response = request
        .send()
        .await
        .map_err(|e| bad_gateway(BriefError::Upstream(e.to_string())))?;

    let status = response.status();
    if !status.is_success() {
        return Err(bad_gateway(BriefError::Upstream(format!("returned {}", status))));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| bad_gateway(BriefError::InvalidResponse(e.to_string())))
}
