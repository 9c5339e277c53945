//! Brief API Routes
//!
//! Question answering over live market data, typed or spoken.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use brief_core::{ScoredDocument, SourceKind, Ticker, TRACKED_COMPANIES};
use brief_orchestrator::{BriefOptions, BriefOutcome, StageFailure};
use serde::{Deserialize, Serialize};

use crate::request_id::RequestId;
use crate::{ApiJson, ApiResponse, AppError, AppState};

/// Voice uploads larger than this are rejected
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct BriefRequest {
    pub query: String,
    #[serde(default)]
    pub speak: bool,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct VoiceParams {
    #[serde(default)]
    pub speak: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SourceView {
    pub source: SourceKind,
    pub symbol: Ticker,
    pub distance: f32,
    pub text: String,
}

impl From<ScoredDocument> for SourceView {
    fn from(doc: ScoredDocument) -> Self {
        Self {
            source: doc.document.metadata.source,
            symbol: doc.document.metadata.symbol,
            distance: doc.distance,
            text: doc.document.text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BriefResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    pub ticker: Ticker,
    pub answer: String,
    /// MP3 of the answer, base64 encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    pub sources: Vec<SourceView>,
    pub indexed: Vec<SourceKind>,
    pub degraded: Vec<StageFailure>,
}

#[derive(Debug, Serialize)]
pub struct CompanyView {
    pub name: &'static str,
    pub ticker: &'static str,
}

pub fn brief_routes() -> Router<AppState> {
    Router::new()
        .route("/api/brief", post(create_brief))
        .route(
            "/api/brief/voice",
            post(create_voice_brief).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/api/companies", get(list_companies))
}

async fn create_brief(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(req): ApiJson<BriefRequest>,
) -> Result<Json<ApiResponse<BriefResponse>>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("query must not be empty"),
        ));
    }

    tracing::info!(request_id = request_id.as_str(), "Brief requested");
    let options = BriefOptions {
        speak: req.speak,
        k: req.k,
    };
    let outcome = state.orchestrator.brief(query, options).await;

    Ok(Json(ApiResponse::success(brief_response(outcome, None)?)))
}

async fn create_voice_brief(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    params: Result<Query<VoiceParams>, QueryRejection>,
    body: Bytes,
) -> Result<Json<ApiResponse<BriefResponse>>, AppError> {
    let Query(params) = params
        .map_err(|e| AppError::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(e.body_text())))?;
    if body.is_empty() {
        return Err(AppError::with_status(
            StatusCode::BAD_REQUEST,
            anyhow::anyhow!("request body must contain the recorded audio"),
        ));
    }

    tracing::info!(request_id = request_id.as_str(), bytes = body.len(), "Voice brief requested");
    let file_name = params.file_name.unwrap_or_else(|| "question.wav".to_string());
    let options = BriefOptions {
        speak: params.speak,
        k: None,
    };

    let (transcript, outcome) = state
        .orchestrator
        .brief_from_audio(&body, &file_name, options)
        .await
        .map_err(|e| AppError::from_brief("Transcription failed", e))?;

    Ok(Json(ApiResponse::success(brief_response(outcome, Some(transcript))?)))
}

async fn list_companies() -> Json<ApiResponse<Vec<CompanyView>>> {
    let companies = TRACKED_COMPANIES
        .iter()
        .map(|c| CompanyView {
            name: c.display_name,
            ticker: c.ticker,
        })
        .collect();
    Json(ApiResponse::success(companies))
}

fn brief_response(outcome: BriefOutcome, transcript: Option<String>) -> Result<BriefResponse, AppError> {
    let brief = match outcome {
        BriefOutcome::Answered(brief) => *brief,
        BriefOutcome::UnknownCompany { message } => {
            return Err(AppError::with_status(
                StatusCode::UNPROCESSABLE_ENTITY,
                anyhow::anyhow!(message),
            ))
        }
    };

    Ok(BriefResponse {
        query: brief.query,
        transcript,
        ticker: brief.ticker,
        audio_base64: brief.answer.audio.as_deref().map(|audio| STANDARD.encode(audio)),
        answer: brief.answer.text,
        sources: brief.sources.into_iter().map(SourceView::from).collect(),
        indexed: brief.indexed,
        degraded: brief.degraded,
    })
}
