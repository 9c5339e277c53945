pub mod brief_routes;
pub mod config;
pub mod request_id;
pub mod service_routes;


use ai_client::{AnswerGenerator, GeminiClient, GoogleTtsClient, WhisperClient};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use brief_core::{BriefError, ErrorKind, LanguageModel, SymbolResolver, TextEmbedder};
use brief_orchestrator::BriefOrchestrator;
use news_feed::{NewsFetcher, YahooNewsScraper};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vector_index::VectorIndex;
use yahoo_client::YahooClient;

pub use config::BriefConfig;

/// Envelope for every JSON API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error: an `anyhow` error plus the status to answer with
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    /// Map a pipeline error onto a status by its kind
    pub fn from_brief(context: &str, err: BriefError) -> Self {
        let status = match err.kind() {
            ErrorKind::NoData => StatusCode::NOT_FOUND,
            ErrorKind::Transient => StatusCode::BAD_GATEWAY,
            ErrorKind::Misconfigured => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::with_status(status, anyhow::anyhow!("{context}: {err}"))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed ({}): {:#}", self.status, self.error);
        } else {
            tracing::debug!("Request rejected ({}): {:#}", self.status, self.error);
        }
        let body = ApiResponse::<()>::error(format!("{:#}", self.error));
        (self.status, Json(body)).into_response()
    }
}

/// `Json` body extractor whose rejections come back in the `ApiResponse`
/// envelope. Malformed or mistyped bodies are a 400.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let status = match rejection.status() {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE | StatusCode::PAYLOAD_TOO_LARGE => rejection.status(),
                    _ => StatusCode::BAD_REQUEST,
                };
                Err(AppError::with_status(status, anyhow::anyhow!(rejection.body_text())))
            }
        }
    }
}

/// Shared application context, built once at start-up
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BriefOrchestrator>,
    pub http_client: reqwest::Client,
    pub config: Arc<BriefConfig>,
}

impl AppState {
    pub fn new(orchestrator: BriefOrchestrator, config: BriefConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            orchestrator: Arc::new(orchestrator),
            http_client,
            config: Arc::new(config),
        }
    }

    /// Wire the production backends described by `config`
    pub fn from_config(config: BriefConfig) -> anyhow::Result<Self> {
        let market = Arc::new(YahooClient::with_rate_limit(config.http_timeout, config.yahoo_rate_limit));
        let news = NewsFetcher::new(Arc::new(YahooNewsScraper::new(config.http_timeout)));
        let index = Arc::new(VectorIndex::new(build_embedder(&config)?));

        let model: Option<Arc<dyn LanguageModel>> = match GeminiClient::from_config(&config.ai) {
            Some(client) => {
                tracing::info!("Answer generation via {}", config.ai.gemini_model);
                Some(Arc::new(client))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not set - answers will carry the model-unavailable notice");
                None
            }
        };

        let orchestrator = BriefOrchestrator::new(market, news, index, AnswerGenerator::from_model(model))
            .with_resolver(SymbolResolver::new(config.match_policy))
            .with_history_days(config.history_days)
            .with_k(config.retrieval_k)
            .with_speech(Arc::new(GoogleTtsClient::from_config(&config.ai)))
            .with_transcriber(Arc::new(WhisperClient::from_config(&config.ai)));

        Ok(Self::new(orchestrator, config))
    }
}

#[cfg(feature = "local-embeddings")]
fn build_embedder(_config: &BriefConfig) -> anyhow::Result<Arc<dyn TextEmbedder>> {
    let embedder = vector_index::LocalEmbedder::new()
        .map_err(|e| anyhow::anyhow!("failed to load local embedding model: {}", e))?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "local-embeddings"))]
fn build_embedder(config: &BriefConfig) -> anyhow::Result<Arc<dyn TextEmbedder>> {
    tracing::info!(
        "Embeddings via {} ({})",
        config.ai.embeddings_url,
        config.ai.embeddings_model
    );
    Ok(Arc::new(ai_client::HttpEmbedder::from_config(&config.ai)))
}

/// Full router with middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(brief_routes::brief_routes())
        .merge(service_routes::service_routes())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "indexed_documents": state.orchestrator.index().len().await,
        "embedder": state.orchestrator.index().embedder_name(),
        "model": state.orchestrator.generator().model_name(),
        "embedding_dimension": state.orchestrator.index().dimension().await,
        "match_policy": state.orchestrator.resolver().policy(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Initialise `tracing` (JSON when `RUST_LOG_FORMAT=json`)
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = BriefConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let state = AppState::from_config(config)?;

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Market brief API listening on {}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
