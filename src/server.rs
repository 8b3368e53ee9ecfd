use crate::adapters::all_adapters;
use crate::config::CrawlerConfig;
use crate::error::CommentFerryError;
use crate::fetcher::Comment;
use crate::http::parse_user_agent;
use crate::pipeline::{CommentPipeline, CrawlResult};
use crate::signer::Signers;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on pages a single HTTP request may ask for.
pub const MAX_PAGES_LIMIT: u32 = 50;

#[derive(Debug, Serialize)]
pub struct SignerStatus {
    pub a_bogus: String,
    pub x_bogus: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub ready: bool,
    pub port: u16,
    pub platforms: Vec<String>,
    pub signers: SignerStatus,
    pub emulation: String,
    pub cert_verification: bool,
    pub max_pages: u32,
}

#[derive(Debug, Deserialize)]
pub struct CommentsRequest {
    pub url: String,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    pub success: bool,
    pub platform: String,
    pub content_id: String,
    pub pages_fetched: u32,
    pub total: u64,
    pub has_more: bool,
    pub cursor: u64,
    pub comments: Vec<Comment>,
}

fn default_concurrency() -> usize {
    3
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub urls: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize, Clone)]
pub struct BatchItemResult {
    pub url: String,
    pub success: bool,
    pub platform: Option<String>,
    pub total: u64,
    pub comments: Vec<Comment>,
    pub error: Option<String>,
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub port: u16,
    pub pipeline: Arc<CommentPipeline>,
    /// Cancelled on shutdown; every in-flight crawl holds a child token.
    pub shutdown: CancellationToken,
}

impl ServerState {
    pub fn new(port: u16, config: CrawlerConfig, signers: Signers) -> crate::Result<Self> {
        Ok(Self {
            port,
            pipeline: Arc::new(CommentPipeline::new(config, signers)?),
            shutdown: CancellationToken::new(),
        })
    }
}

fn error_to_http(e: &CommentFerryError) -> (StatusCode, &'static str) {
    match e {
        CommentFerryError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "INVALID_URL"),
        CommentFerryError::UnsupportedPlatform(_) => {
            (StatusCode::BAD_REQUEST, "UNSUPPORTED_PLATFORM")
        }
        CommentFerryError::SignatureFailed { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "SIGNATURE_FAILED")
        }
        CommentFerryError::BootstrapExhausted { .. } => {
            (StatusCode::BAD_GATEWAY, "BOOTSTRAP_FAILED")
        }
        CommentFerryError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        CommentFerryError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
        _ => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
    }
}

fn error_response(status: StatusCode, error: String, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error,
            error_code: code.to_string(),
        }),
    )
}

fn fetch_failed_message(result: &CrawlResult) -> String {
    format!(
        "No comment page returned for {} {}",
        result.platform, result.content_id
    )
}

fn effective_max_pages(state: &ServerState, requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(state.pipeline.config().max_pages)
        .clamp(1, MAX_PAGES_LIMIT)
}

async fn status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let config = state.pipeline.config();
    let signers = state.pipeline.signers();
    let (emulation, _) = parse_user_agent(&config.user_agent);

    Json(StatusResponse {
        status: "ok".to_string(),
        version: SERVER_VERSION.to_string(),
        ready: true,
        port: state.port,
        platforms: all_adapters(None)
            .iter()
            .map(|a| a.platform_id().to_string())
            .collect(),
        signers: SignerStatus {
            a_bogus: signers.a_bogus.describe(),
            x_bogus: signers.x_bogus.describe(),
        },
        emulation: format!("{:?}", emulation),
        cert_verification: !config.accept_invalid_certs,
        max_pages: config.max_pages,
    })
}

async fn comments_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CommentsRequest>,
) -> Result<Json<CommentsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let max_pages = effective_max_pages(&state, request.max_pages);

    let cancel = state.shutdown.child_token();

    let result = state
        .pipeline
        .crawl_pages(&request.url, max_pages, &cancel)
        .await
        .map_err(|e| {
            let (status, code) = error_to_http(&e);
            warn!(url = %request.url, error = %e, code, "comments request failed");
            error_response(status, e.to_string(), code)
        })?;

    let Some(page) = result.page.clone() else {
        return Err(error_response(
            StatusCode::BAD_GATEWAY,
            fetch_failed_message(&result),
            "FETCH_FAILED",
        ));
    };

    Ok(Json(CommentsResponse {
        success: true,
        platform: result.platform,
        content_id: result.content_id,
        pages_fetched: result.pages_fetched,
        total: page.total,
        has_more: page.has_more,
        cursor: page.cursor,
        comments: page.comments,
    }))
}

async fn batch_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.urls.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No URLs provided".to_string(),
            "INVALID_URL",
        ));
    }

    let concurrency = request.concurrency.clamp(1, 5);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
    let max_pages = effective_max_pages(&state, request.max_pages);
    let cancel = state.shutdown.child_token();

    info!(urls = request.urls.len(), concurrency, "batch started");

    let tasks: Vec<_> = request
        .urls
        .iter()
        .map(|url| {
            let sem = semaphore.clone();
            let pipeline = state.pipeline.clone();
            let cancel = cancel.clone();
            async move {
                let Ok(_permit) = sem.acquire().await else {
                    return failed_item(url, None, "semaphore closed".to_string(), "NETWORK_ERROR");
                };
                crawl_single_url(&pipeline, url, max_pages, &cancel).await
            }
        })
        .collect();

    let results: Vec<BatchItemResult> = futures::future::join_all(tasks).await;

    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;

    Ok(Json(BatchResponse {
        success: failed == 0,
        total: results.len(),
        succeeded,
        failed,
        results,
    }))
}

fn failed_item(url: &str, platform: Option<String>, error: String, code: &str) -> BatchItemResult {
    BatchItemResult {
        url: url.to_string(),
        success: false,
        platform,
        total: 0,
        comments: Vec::new(),
        error: Some(error),
        error_code: Some(code.to_string()),
    }
}

async fn crawl_single_url(
    pipeline: &CommentPipeline,
    url: &str,
    max_pages: u32,
    cancel: &CancellationToken,
) -> BatchItemResult {
    match pipeline.crawl_pages(url, max_pages, cancel).await {
        Ok(result) => match result.page.clone() {
            Some(page) => BatchItemResult {
                url: url.to_string(),
                success: true,
                platform: Some(result.platform),
                total: page.total,
                comments: page.comments,
                error: None,
                error_code: None,
            },
            None => failed_item(
                url,
                Some(result.platform.clone()),
                fetch_failed_message(&result),
                "FETCH_FAILED",
            ),
        },
        Err(e) => {
            let (_, code) = error_to_http(&e);
            warn!(url = %url, error = %e, code, "batch item failed");
            failed_item(url, None, e.to_string(), code)
        }
    }
}

pub fn create_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/comments", post(comments_handler))
        .route("/api/batch", post(batch_handler))
        .with_state(state)
        .layer(cors)
}

pub async fn start_server(
    port: u16,
    config: CrawlerConfig,
    signers: Signers,
) -> Result<(), std::io::Error> {
    let state = ServerState::new(port, config, signers)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let shutdown = state.shutdown.clone();
    let app = create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port, "commentferry HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested; cancelling in-flight crawls");
            }
            shutdown.cancel();
        })
        .await
}
