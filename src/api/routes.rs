use axum::{
    routing::{get, post},
    Router,
    extract::{Form, Query, State, rejection::{FormRejection, QueryRejection}},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::{parse_completion, AnalysisResponse};
use crate::api::models::{required_url, AnalyzeForm, ProxyQuery};
use crate::api::response;
use crate::error::{AppError, Result};
use crate::prompt::{build_prompt, SYSTEM_INSTRUCTION};
use crate::scraper::extract_excerpt;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/analyze", post(analyze_handler))
        .route("/proxy", get(proxy_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn home_handler() -> &'static str {
    "hi"
}

async fn analyze_handler(
    State(state): State<AppState>,
    form: std::result::Result<Form<AnalyzeForm>, FormRejection>,
) -> Result<(StatusCode, Json<AnalysisResponse>)> {
    let url = form
        .ok()
        .and_then(|Form(form)| required_url(form.url))
        .ok_or(AppError::MissingInput)?;

    info!(url = %url, schema = %state.config.schema, "analysis requested");
    let start_time = std::time::Instant::now();

    let result = process_analysis(&state, &url).await;

    let elapsed = start_time.elapsed();
    match &result {
        Ok(_) => info!(url = %url, ?elapsed, "analysis completed"),
        Err(err) => warn!(url = %url, ?elapsed, error = %err, "analysis failed"),
    }

    result.map(response::success)
}

/// Fetch, excerpt, prompt, complete, validate.
pub async fn process_analysis(state: &AppState, url: &str) -> Result<AnalysisResponse> {
    let page = state.fetcher.fetch_page(url).await?;

    let excerpt = extract_excerpt(&page.text())?;
    info!(lines = excerpt.line_count(), "excerpt extracted");

    let prompt = build_prompt(state.config.schema, excerpt.as_str());
    let raw = state.completion.complete(SYSTEM_INSTRUCTION, &prompt).await?;

    parse_completion(state.config.schema, &raw)
}

async fn proxy_handler(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProxyQuery>, QueryRejection>,
) -> Result<Response> {
    let url = query
        .ok()
        .and_then(|Query(query)| required_url(query.url))
        .ok_or(AppError::MissingInput)?;

    let page = state.fetcher.relay(&url).await.inspect_err(|err| {
        warn!(url = %url, error = %err, "proxy fetch failed");
    })?;

    let status = StatusCode::from_u16(page.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = page.content_type_or_default().to_string();
    info!(url = %url, status = page.status, content_type = %content_type, "proxied");

    Ok((status, [(header::CONTENT_TYPE, content_type)], page.body).into_response())
}
