//! JSON query API

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::error;

use crate::aggregate::RangeAggregator;
use crate::range::RangeSelector;

/// Query API application state
#[derive(Clone)]
pub struct ApiState {
    pub aggregator: RangeAggregator,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

/// Build the query API router
pub fn build_router(aggregator: RangeAggregator) -> Router {
    let api_state = ApiState { aggregator };

    Router::new()
        .route("/api/v2/data", get(data_handler))
        .route("/api/latest", get(latest_handler))
        .route("/health", get(health_handler))
        .with_state(api_state)
}

async fn data_handler(
    State(api): State<ApiState>,
    Query(query): Query<RangeQuery>,
) -> Response {
    let selector = RangeSelector::from_query(query.range.as_deref());

    match api.aggregator.summarize_async(selector, Utc::now()).await {
        Ok(summary) => axum::Json(summary).into_response(),
        Err(e) => {
            error!("Failed to summarize {} range: {}", selector, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn latest_handler(State(api): State<ApiState>) -> Response {
    let store = api.aggregator.store().clone();
    let latest = match tokio::task::spawn_blocking(move || store.query_latest()).await {
        Ok(result) => result,
        Err(e) => Err(e.into()),
    };

    match latest {
        Ok(Some(observation)) => axum::Json(observation).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "No observations recorded").into_response(),
        Err(e) => {
            error!("Failed to read latest observation: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
