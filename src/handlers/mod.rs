use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::error::AppError;
use crate::results::{Coordinator, View};

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/results", get(results))
        .route("/results/live", get(live_results))
        .route("/results/{category_id}", get(category_results))
        .with_state(coordinator)
}

async fn results(State(coordinator): State<Arc<Coordinator>>) -> Result<Response, AppError> {
    Ok(json_payload(coordinator.get_summary(View::Results).await?))
}

async fn live_results(State(coordinator): State<Arc<Coordinator>>) -> Result<Response, AppError> {
    Ok(json_payload(coordinator.get_summary(View::Live).await?))
}

async fn category_results(
    State(coordinator): State<Arc<Coordinator>>,
    Path(category_id): Path<i64>,
) -> Result<Response, AppError> {
    Ok(json_payload(
        coordinator.get_summary(View::Category(category_id)).await?,
    ))
}

// Payloads come out of the coordinator already serialized, so a cache hit
// is a byte-copy straight into the response body.
fn json_payload(payload: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], payload).into_response()
}
