//! Delivery of verification codes.
//!
//! The orchestrator only needs "deliver this code to this address". The
//! default sender for local dev is `LogEmailSender`, which logs the delivery
//! and returns `Ok(())`; `SmtpEmailSender` talks to a real relay.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use crate::auth::models::VerificationKind;

/// Code delivery abstraction used by the verification lifecycle.
#[async_trait]
pub trait EmailNotifier: Send + Sync {
    /// Deliver `code` to `to`. An error is surfaced to the caller of the flow.
    async fn send_code(&self, to: &str, code: &str, kind: VerificationKind) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailNotifier for LogEmailSender {
    async fn send_code(&self, to: &str, _code: &str, kind: VerificationKind) -> Result<()> {
        info!(to_email = %to, kind = %kind, "verification code send stub");
        Ok(())
    }
}

#[must_use]
pub fn subject_for(kind: VerificationKind) -> &'static str {
    match kind {
        VerificationKind::Registration => "Confirm your registration",
        VerificationKind::Login => "Your login code",
        VerificationKind::Password => "Confirm your password change",
    }
}

fn render_body(code: &str, kind: VerificationKind) -> String {
    let purpose = match kind {
        VerificationKind::Registration => "to confirm your email address",
        VerificationKind::Login => "to finish signing in",
        VerificationKind::Password => "to set a new password",
    };
    format!(
        "<html><body>\
         <p>Use the code below {purpose}:</p>\
         <h2 style=\"letter-spacing: 4px\">{code}</h2>\
         <p>The code expires in 5 minutes. If you did not request it, ignore this email.</p>\
         </body></html>"
    )
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    username: String,
    password: SecretString,
    from: String,
}

impl SmtpConfig {
    #[must_use]
    pub fn new(host: String, username: String, password: SecretString, from: String) -> Self {
        Self {
            host,
            port: 587,
            username,
            password,
            from,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from
    }
}

/// STARTTLS relay sender producing one HTML message per code.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// # Errors
    /// Returns an error if the relay host or the sender address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid sender address: {}", config.from))?;
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("invalid SMTP relay: {}", config.host))?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailNotifier for SmtpEmailSender {
    #[instrument(skip(self, code), fields(kind = %kind))]
    async fn send_code(&self, to: &str, code: &str, kind: VerificationKind) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("invalid recipient address: {to}"))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject_for(kind))
            .header(ContentType::TEXT_HTML)
            .body(render_body(code, kind))
            .context("failed to build email message")?;
        self.transport
            .send(message)
            .await
            .context("failed to send email")?;
        Ok(())
    }
}
