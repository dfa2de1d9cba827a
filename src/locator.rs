use axum::body::Bytes;
use reqwest::{StatusCode, header::CONTENT_TYPE};
use std::time::Duration;
use tracing::debug;

// Shelters tagged social_facility=shelter anywhere in the Philippines.
// The [timeout:25] is the upstream's own query deadline.
pub const OVERPASS_QUERY: &str = r#"
[out:json][timeout:25];
area["name"="Philippines"]->.searchArea;
(
  node["social_facility"="shelter"](area.searchArea);
  way["social_facility"="shelter"](area.searchArea);
  relation["social_facility"="shelter"](area.searchArea);
);
out body;
>;
out skel qt;
"#;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("request to geographic API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geographic API responded with {0}")]
    Status(StatusCode),
}

// Relays the fixed shelter query to the Overpass API
pub struct ShelterLocator {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl ShelterLocator {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    // Raw upstream body, untouched
    pub async fn fetch(&self) -> Result<Bytes, LocatorError> {
        let res = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/plain")
            .body(OVERPASS_QUERY)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(LocatorError::Status(status));
        }

        let body = res.bytes().await?;
        debug!(bytes = body.len(), "geographic API responded");
        Ok(body)
    }
}
