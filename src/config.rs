use axum::http::HeaderName;
use clap::{ArgAction, Parser};
use lettre::Address;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::locator::DEFAULT_OVERPASS_URL;
use crate::mailer::SmtpSettings;
use crate::rate_limit::RateLimitConfig;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "flood-alert-relay")]
#[command(about = "Flood alert email relay and evacuation center lookup")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Address to bind
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    // Mail account, also used as the sender address
    #[arg(long, env = "EMAIL_USER")]
    pub email_user: String,

    // Mail account password
    #[arg(long, env = "EMAIL_PASS", hide_env_values = true)]
    pub email_pass: String,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    // Defaults to the implicit TLS submission port
    #[arg(long, env = "SMTP_PORT")]
    pub smtp_port: Option<u16>,

    // Upgrade a plain connection with STARTTLS, implied by SMTP_PORT=587
    #[arg(long, env = "SMTP_STARTTLS", default_value_t = false, action = ArgAction::Set)]
    pub smtp_starttls: bool,

    #[arg(long, env = "MAIL_SENDER_NAME", default_value = "Water Alert System")]
    pub sender_name: String,

    #[arg(long, env = "ALERT_SUBJECT", default_value = "🚨 URGENT: Water Level is Very High")]
    pub alert_subject: String,

    // HTML body of the alert, read on every send
    #[arg(long, env = "ALERT_TEMPLATE", default_value = "./templates/alert.html")]
    pub alert_template: PathBuf,

    // Static assets served at /
    #[arg(long, env = "PUBLIC_DIR", default_value = "./public")]
    pub public_dir: PathBuf,

    #[arg(long, env = "OVERPASS_URL", default_value = DEFAULT_OVERPASS_URL)]
    pub overpass_url: String,

    // Outer deadline for the geographic API call in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout: u64,

    // Gate /send-alert
    #[arg(long, env = "ALERT_RATE_LIMIT", default_value_t = true, action = ArgAction::Set)]
    pub alert_rate_limit: bool,

    // Gate /evac-centers
    #[arg(long, env = "EVAC_RATE_LIMIT", default_value_t = false, action = ArgAction::Set)]
    pub evac_rate_limit: bool,

    // Rate limit max requests per window
    #[arg(long, env = "RATE_LIMIT", default_value_t = 1)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW_SECS", default_value_t = 60)]
    pub rate_window: u64,

    // How often expired rate limit records are swept, in seconds
    #[arg(long, env = "RATE_SWEEP_SECS", default_value_t = 60)]
    pub rate_sweep: u64,

    // Header carrying the client address when behind a trusted proxy
    #[arg(long, env = "TRUSTED_PROXY_HEADER")]
    pub trusted_proxy_header: Option<String>,
}

impl Args {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.email_user.trim().is_empty() {
            return Err(ConfigError::Empty("EMAIL_USER"));
        }
        if self.email_pass.is_empty() {
            return Err(ConfigError::Empty("EMAIL_PASS"));
        }
        self.email_user.trim().parse::<Address>()?;
        if self.rate_limit == 0 {
            return Err(ConfigError::Zero("RATE_LIMIT"));
        }
        if self.rate_window == 0 {
            return Err(ConfigError::Zero("RATE_WINDOW_SECS"));
        }
        if self.rate_sweep == 0 {
            return Err(ConfigError::Zero("RATE_SWEEP_SECS"));
        }
        if self.upstream_timeout == 0 {
            return Err(ConfigError::Zero("UPSTREAM_TIMEOUT_SECS"));
        }
        self.trusted_header()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_sweep)
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            starttls: self.smtp_starttls || self.smtp_port == Some(587),
            username: self.email_user.trim().to_owned(),
            password: self.email_pass.clone(),
            sender_name: self.sender_name.clone(),
        }
    }

    pub fn rate_limit_config(&self) -> Result<RateLimitConfig, ConfigError> {
        Ok(RateLimitConfig {
            max_requests: self.rate_limit,
            window: Duration::from_secs(self.rate_window),
            trusted_header: self.trusted_header()?,
        })
    }

    fn trusted_header(&self) -> Result<Option<HeaderName>, ConfigError> {
        self.trusted_proxy_header
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ConfigError::HeaderName(name.to_owned()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with(user: &str, pass: &str, extra: &[&str]) -> Args {
        let mut argv = vec!["flood-alert-relay", "--email-user", user, "--email-pass", pass];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn parse(extra: &[&str]) -> Args {
        parse_with("alerts@example.com", "app-password", extra)
    }

    #[test]
    fn explicit_flags_are_accepted() {
        let args = parse(&[
            "--port",
            "8081",
            "--rate-limit",
            "5",
            "--rate-window",
            "120",
            "--alert-rate-limit",
            "false",
        ]);
        assert!(args.validate().is_ok());
        assert_eq!(args.port, 8081);
        assert!(!args.alert_rate_limit);

        let gate = args.rate_limit_config().unwrap();
        assert_eq!(gate.max_requests, 5);
        assert_eq!(gate.window, Duration::from_secs(120));
    }

    #[test]
    fn defaults_match_source() {
        let args = parse(&[]);
        assert!(args.validate().is_ok());
        assert_eq!(args.port, 3000);
        assert!(args.alert_rate_limit);
        assert!(!args.evac_rate_limit);
        assert_eq!(args.rate_limit, 1);
        assert_eq!(args.rate_window, 60);

        let gate = args.rate_limit_config().unwrap();
        assert_eq!(gate.max_requests, 1);
        assert_eq!(gate.window, Duration::from_secs(60));
        assert!(gate.trusted_header.is_none());
    }

    #[test]
    fn submission_port_implies_starttls() {
        assert!(!parse(&[]).smtp_settings().starttls);
        assert!(parse(&["--smtp-port", "587"]).smtp_settings().starttls);
        assert!(!parse(&["--smtp-port", "465"]).smtp_settings().starttls);
        assert!(parse(&["--smtp-starttls", "true"]).smtp_settings().starttls);
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let args = parse_with("alerts@example.com", "", &[]);
        assert!(matches!(args.validate(), Err(ConfigError::Empty("EMAIL_PASS"))));
    }

    #[test]
    fn sender_must_be_an_address() {
        let args = parse_with("not-an-address", "app-password", &[]);
        assert!(matches!(args.validate(), Err(ConfigError::SenderAddress(_))));
    }

    #[test]
    fn zero_window_is_rejected() {
        let args = parse(&["--rate-window", "0"]);
        assert!(matches!(args.validate(), Err(ConfigError::Zero("RATE_WINDOW_SECS"))));
    }

    #[test]
    fn trusted_header_is_validated() {
        let args = parse(&["--trusted-proxy-header", "X-Forwarded-For"]);
        let gate = args.rate_limit_config().unwrap();
        assert_eq!(gate.trusted_header.unwrap().as_str(), "x-forwarded-for");

        let args = parse(&["--trusted-proxy-header", "bad header"]);
        assert!(matches!(args.validate(), Err(ConfigError::HeaderName(_))));
    }
}
