use serde::{Deserialize, Serialize};

// Query string of GET /send-alert
#[derive(Deserialize, Debug, Default)]
pub struct AlertQuery {
    #[serde(default)]
    pub to: Option<String>,
}

impl AlertQuery {
    // Empty or blank `to` counts as missing
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().map(str::trim).filter(|to| !to.is_empty())
    }
}

// {success, message} body used by the alert endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// {error} body used by the evacuation center endpoint
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: &'static str,
}

// One alert email, ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}
