//! Notification channels for threshold alerts.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, warn};

use crate::error::{MonitorError, Result};

/// Delivers an alert message to a human.
pub trait Notifier: Send {
    fn notify(&self, message: &str) -> Result<()>;
}

/// Writes alerts to the log only; used when no messaging credentials are configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        warn!(message, "Alert (no notification channel configured)");
        Ok(())
    }
}

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

/// Twilio credentials and WhatsApp sender/recipient.
#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender, e.g. `whatsapp:+14155238886`.
    pub from: String,
    /// Recipient, e.g. `whatsapp:+15005550006`.
    pub to: String,
}

/// Sends WhatsApp messages through the Twilio REST API.
#[derive(Debug, Clone)]
pub struct TwilioNotifier {
    credentials: TwilioCredentials,
    base_url: String,
    agent: ureq::Agent,
}

impl TwilioNotifier {
    pub fn new(credentials: TwilioCredentials) -> Self {
        Self {
            credentials,
            base_url: TWILIO_API.to_string(),
            agent: ureq::AgentBuilder::new()
                .timeout(std::time::Duration::from_secs(10))
                .build(),
        }
    }

    /// Point the notifier at another API root (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.credentials.account_sid
        )
    }

    fn authorization(&self) -> String {
        let pair = format!(
            "{}:{}",
            self.credentials.account_sid, self.credentials.auth_token
        );
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl Notifier for TwilioNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .agent
            .post(&self.messages_url())
            .set("Authorization", &self.authorization())
            .send_form(&[
                ("From", self.credentials.from.as_str()),
                ("To", self.credentials.to.as_str()),
                ("Body", message),
            ])
            .map_err(|e| MonitorError::Notification(e.to_string()))?;

        info!(status = response.status(), to = %self.credentials.to, "WhatsApp message sent");
        Ok(())
    }
}
