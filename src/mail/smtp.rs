use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::{EmailMessage, Mailer};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_MAIL_FROM: &str = "Accounts <info@accounts.dev>";

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    from: String,
    starttls: bool,
}

impl SmtpConfig {
    #[must_use]
    pub fn new(host: String) -> Self {
        Self {
            host,
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            from: DEFAULT_MAIL_FROM.to_string(),
            starttls: true,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, username: String, password: SecretString) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: String) -> Self {
        self.from = from;
        self
    }

    /// Plain connection without STARTTLS, for local catch-all SMTP servers.
    #[must_use]
    pub fn with_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
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
    pub fn from(&self) -> &str {
        &self.from
    }

    #[must_use]
    pub fn starttls(&self) -> bool {
        self.starttls
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// # Errors
    /// Fails when the relay cannot be configured or the sender address does
    /// not parse.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .with_context(|| format!("failed to create SMTP transport for {}", config.host))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|err| anyhow!("invalid sender address {}: {err}", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|err| anyhow!("invalid recipient address {}: {err}", message.to))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html.clone())
            .context("failed to build email message")
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = self.build_message(message)?;
        let response = self
            .transport
            .send(email)
            .await
            .context("SMTP delivery failed")?;
        debug!(code = %response.code(), subject = %message.subject, "mail delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_config_defaults_and_overrides() {
        let config = SmtpConfig::new("smtp.accounts.dev".to_string());
        assert_eq!(config.host(), "smtp.accounts.dev");
        assert_eq!(config.port(), DEFAULT_SMTP_PORT);
        assert_eq!(config.from(), DEFAULT_MAIL_FROM);
        assert!(config.starttls());

        let config = config
            .with_port(2525)
            .with_from("noreply@accounts.dev".to_string())
            .with_starttls(false);
        assert_eq!(config.port(), 2525);
        assert_eq!(config.from(), "noreply@accounts.dev");
        assert!(!config.starttls());
    }

    #[tokio::test]
    async fn build_message_rejects_bad_recipient() -> Result<()> {
        let config = SmtpConfig::new("localhost".to_string()).with_starttls(false);
        let mailer = SmtpMailer::new(&config)?;
        let message = EmailMessage {
            to: "not-an-address".to_string(),
            subject: "Password Reset".to_string(),
            html: String::new(),
        };
        assert!(mailer.build_message(&message).is_err());

        let message = EmailMessage {
            to: "user1@mail.com".to_string(),
            ..message
        };
        assert!(mailer.build_message(&message).is_ok());
        Ok(())
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let config = SmtpConfig::new("localhost".to_string())
            .with_starttls(false)
            .with_from("nope".to_string());
        assert!(SmtpMailer::new(&config).is_err());
    }
}
