//! Outbound mail.
//!
//! Account flows hand a rendered [`EmailMessage`] to a [`Mailer`] and wait
//! for the transport's answer; there is no outbox, so a failed send is
//! reported straight back to the caller.

mod smtp;

pub use smtp::{SmtpConfig, SmtpMailer};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mail delivery abstraction used by registration and password reset.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error so the caller can fail the request.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev mailer that logs the message instead of sending it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.html,
            "mail send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{EmailMessage, Mailer};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Keeps every delivered message; `failing()` refuses all of them.
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    impl RecordingMailer {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) async fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().await.clone()
        }

        /// Value of `param=` in the link of the last delivered message.
        pub(crate) async fn last_link_param(&self, param: &str) -> Option<String> {
            let sent = self.sent.lock().await;
            let html = &sent.last()?.html;
            let marker = format!("{param}=");
            let start = html.find(&marker)? + marker.len();
            let end = html[start..].find('"')? + start;
            Some(html[start..end].to_string())
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<()> {
            if self.fail {
                return Err(anyhow!("smtp unavailable"));
            }
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }
}

#[must_use]
pub fn account_activation(to: &str, activation_url: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Account Activation".to_string(),
        html: format!(
            "<div><b>Please click below link to activate your account</b></div>\
             <div><a href=\"{activation_url}\">Activate</a></div>"
        ),
    }
}

#[must_use]
pub fn password_reset(to: &str, reset_url: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Password Reset".to_string(),
        html: format!(
            "<div><b>Please click below link to reset your password</b></div>\
             <div><a href=\"{reset_url}\">Reset</a></div>"
        ),
    }
}
