use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{MethodRouter, get},
};
use std::sync::Arc;
use tokio::time::{Duration, Instant, interval};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::debug;

use crate::handlers::{evac_centers_handler, health_handler, metrics_handler, send_alert_handler};
use crate::rate_limit::{RequestGate, gate_requests};
use crate::state::AppState;

// router - gated routes get their own gate, everything else falls through to public/
pub fn router(state: Arc<AppState>) -> Router {
    let send_alert = gated(get(send_alert_handler), state.alert_gate.as_ref());
    let evac_centers = gated(get(evac_centers_handler), state.evac_gate.as_ref());

    Router::new()
        .route("/send-alert", send_alert)
        .route("/evac-centers", evac_centers)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback_service(ServeDir::new(&state.public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn gated(
    route: MethodRouter<Arc<AppState>>,
    gate: Option<&Arc<RequestGate>>,
) -> MethodRouter<Arc<AppState>> {
    match gate {
        Some(gate) => route.layer(from_fn_with_state(Arc::clone(gate), gate_requests)),
        None => route,
    }
}

// Sweeper - evicts expired rate limit records so the maps stay bounded
pub async fn sweep_expired(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every);

    loop {
        interval.tick().await;

        // tokio clock, so paused time in tests drives it
        let now = Instant::now().into_std();
        for gate in state.gates() {
            let removed = gate.sweep(now);
            if removed > 0 {
                debug!(removed, remaining = gate.tracked_clients(), "swept rate limit records");
            }
        }
    }
}
