mod alert;
mod evac;
mod health;
mod metrics;

pub use alert::send_alert_handler;
pub use evac::evac_centers_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
