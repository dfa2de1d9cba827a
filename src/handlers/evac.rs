use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::metrics::{EVAC_FAILURES, EVAC_REQUESTS, UPSTREAM_LATENCY};
use crate::state::AppState;

// GET /evac-centers - upstream JSON, passed through as-is
pub async fn evac_centers_handler(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    EVAC_REQUESTS.inc();
    let start_time = Instant::now();

    let result = state.locator.fetch().await;
    // failures and timeouts are timed too
    UPSTREAM_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let body = result.inspect_err(|_| EVAC_FAILURES.inc())?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
