use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Args;
use crate::error::ConfigError;
use crate::locator::ShelterLocator;
use crate::mailer::{AlertDispatcher, SmtpMailer};
use crate::rate_limit::RequestGate;
// app's shared state, built once at startup and handed to every handler

pub struct AppState {
    pub dispatcher: AlertDispatcher,
    pub locator: ShelterLocator,
    pub alert_gate: Option<Arc<RequestGate>>, // None -> /send-alert is not gated
    pub evac_gate: Option<Arc<RequestGate>>,  // None -> /evac-centers is not gated
    pub public_dir: PathBuf,
}

impl AppState {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mailer = SmtpMailer::new(args.smtp_settings())?;
        let dispatcher = AlertDispatcher::new(
            Arc::new(mailer),
            args.alert_template.clone(),
            args.alert_subject.clone(),
        );

        let client = reqwest::Client::builder().build()?;
        let locator = ShelterLocator::new(client, args.overpass_url.clone(), args.upstream_timeout());

        let gate_config = args.rate_limit_config()?;
        let alert_gate = args
            .alert_rate_limit
            .then(|| Arc::new(RequestGate::new(gate_config.clone())));
        let evac_gate = args
            .evac_rate_limit
            .then(|| Arc::new(RequestGate::new(gate_config)));

        Ok(Self {
            dispatcher,
            locator,
            alert_gate,
            evac_gate,
            public_dir: args.public_dir.clone(),
        })
    }

    pub fn gates(&self) -> impl Iterator<Item = &Arc<RequestGate>> {
        self.alert_gate.iter().chain(self.evac_gate.iter())
    }
}
