// Flood alert relay: alert emails + evacuation center lookup

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod locator;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use app::router;
pub use config::Args;
pub use error::{AppError, ConfigError};
pub use state::AppState;
