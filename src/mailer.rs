use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::ConfigError;
use crate::models::OutgoingEmail;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("failed to read alert template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid recipient address {address:?}: {source}")]
    Recipient {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

// Delivers an already composed alert
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

// SMTP settings, taken from the process configuration
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    // false -> implicit TLS (465), true -> STARTTLS upgrade (587)
    pub starttls: bool,
    pub username: String,
    pub password: String,
    pub sender_name: String,
}

// Authenticated SMTP submission
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Result<Self, ConfigError> {
        let from = Mailbox::new(Some(settings.sender_name), settings.username.parse()?);

        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        };
        let mut builder = builder.credentials(Credentials::new(settings.username, settings.password));
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to: Mailbox = email.to.parse().map_err(|source| MailError::Recipient {
            address: email.to.clone(),
            source,
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)?;

        let response = self.transport.send(message).await?;
        debug!(code = %response.code(), "smtp server accepted alert");
        Ok(())
    }
}

// Sends the one fixed alert to whoever asks
pub struct AlertDispatcher {
    transport: Arc<dyn MailTransport>,
    template_path: PathBuf,
    subject: String,
}

impl AlertDispatcher {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        template_path: impl Into<PathBuf>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            template_path: template_path.into(),
            subject: subject.into(),
        }
    }

    // template is re-read on every call
    pub async fn dispatch(&self, recipient: &str) -> Result<(), MailError> {
        let html = tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| MailError::Template {
                path: self.template_path.clone(),
                source,
            })?;

        self.transport
            .deliver(OutgoingEmail {
                to: recipient.to_owned(),
                subject: self.subject.clone(),
                html,
            })
            .await
    }
}
