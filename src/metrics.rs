use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, register_counter, register_histogram};


lazy_static! {
    pub static ref ALERT_REQUESTS: Counter =
        register_counter!("relay_alert_requests_total", "Total number of alert requests").unwrap();
    pub static ref ALERTS_SENT: Counter =
        register_counter!("relay_alerts_sent_total", "Alert emails handed to the mail transport").unwrap();
    pub static ref ALERT_FAILURES: Counter =
        register_counter!("relay_alert_failures_total", "Alert emails that failed to send").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("relay_rate_limited_total", "Requests rejected by the request gate").unwrap();
    pub static ref EVAC_REQUESTS: Counter =
        register_counter!("relay_evac_requests_total", "Total number of evacuation center lookups").unwrap();
    pub static ref EVAC_FAILURES: Counter =
        register_counter!("relay_evac_failures_total", "Evacuation center lookups that failed upstream").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "relay_upstream_latency_seconds",
        "Latency of the geographic API call in seconds"
    )
    .unwrap();
}
