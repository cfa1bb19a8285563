//! HTTP boundary for the search endpoint

use crate::aggregator::Aggregator;
use crate::elasticsearch::SearchScope;
use crate::error::{AppError, Result};
use crate::models::AggregationResult;
use actix_cors::Cors;
use actix_web::{http::header, web, HttpResponse};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared state: the aggregator plus immutable boundary settings
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, request_timeout: Duration) -> Self {
        Self {
            aggregator,
            request_timeout,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl SearchParams {
    /// Pick the query text and its scope: `q`, then `username`, then
    /// `content`. Blank values count as absent.
    pub fn resolve(&self) -> Option<(&str, SearchScope)> {
        [
            (&self.q, SearchScope::All),
            (&self.username, SearchScope::Username),
            (&self.content, SearchScope::Content),
        ]
        .into_iter()
        .find_map(|(value, scope)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (v, scope))
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub result: AggregationResult,
}

/// GET /api/v1/search
pub async fn search(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse> {
    let (query, scope) = params.resolve().ok_or(AppError::MissingParameter)?;

    let result = tokio::time::timeout(
        state.request_timeout,
        state.aggregator.aggregate_scoped(query, scope),
    )
    .await
    .map_err(|_| {
        warn!(
            query = %query,
            timeout_secs = state.request_timeout.as_secs(),
            "Aggregation timed out"
        );
        AppError::Timeout
    })??;

    info!(
        query = %query,
        users = result.users.len(),
        posts = result.posts.len(),
        "Search request served"
    );

    Ok(HttpResponse::Ok().json(SearchResponse { result }))
}

pub async fn method_not_allowed() -> Result<HttpResponse> {
    Err(AppError::MethodNotAllowed)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

pub async fn metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, encoder.format_type()))
        .body(buffer)
}

/// Allow-all origin, GET/POST/OPTIONS, credentials allowed
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default().error_handler(|_, _| AppError::MissingParameter.into()),
    )
    .service(
        web::resource("/api/v1/search")
            .route(web::get().to(search))
            .default_service(web::to(method_not_allowed)),
    )
    .route("/health", web::get().to(health))
    .route("/metrics", web::get().to(metrics));
}
