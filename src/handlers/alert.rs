use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AppError;
use crate::metrics::{ALERT_FAILURES, ALERT_REQUESTS, ALERTS_SENT};
use crate::models::{AlertQuery, ApiMessage};
use crate::state::AppState;

pub const ALERT_SENT_MESSAGE: &str = "Alert email sent successfully";

// GET /send-alert?to=<email>
pub async fn send_alert_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AlertQuery>, QueryRejection>,
) -> Result<Json<ApiMessage>, AppError> {
    ALERT_REQUESTS.inc();

    // a query we can't read (e.g. `to` given twice) has no usable recipient
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable alert query");
            AlertQuery::default()
        }
    };

    // checked before anything touches the mail transport
    let recipient = query.recipient().ok_or(AppError::MissingRecipient)?;

    debug!(recipient, "dispatching alert");
    state
        .dispatcher
        .dispatch(recipient)
        .await
        .inspect_err(|_| ALERT_FAILURES.inc())?;

    ALERTS_SENT.inc();
    info!("alert email sent");

    Ok(Json(ApiMessage::ok(ALERT_SENT_MESSAGE)))
}
