// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP sending via async lettre.
//!
//! One transport per dispatch, built from the tenant's decrypted credentials;
//! no connection pooling. The Message-ID is generated here and returned so
//! the log layer can deduplicate replayed sends.

use async_trait::async_trait;
use cadence_core::traits::transport::{EmailMessage, EmailTransport};
use cadence_core::CadenceError;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

/// SMTP relay host for a provider key ("gmail", "outlook", "yahoo").
fn smtp_host(provider: &str) -> Result<&'static str, CadenceError> {
    match provider.to_lowercase().as_str() {
        "gmail" => Ok("smtp.gmail.com"),
        "outlook" => Ok("smtp.office365.com"),
        "yahoo" => Ok("smtp.mail.yahoo.com"),
        other => Err(CadenceError::Config(format!(
            "unsupported email provider: {other}"
        ))),
    }
}

/// Production SMTP transport.
#[derive(Debug, Clone, Default)]
pub struct SmtpSender;

impl SmtpSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmailTransport for SmtpSender {
    async fn send(
        &self,
        account_email: &str,
        password: &SecretString,
        provider: &str,
        message: &EmailMessage,
    ) -> Result<String, CadenceError> {
        let host = smtp_host(provider)?;

        let from: Mailbox = format!("{} <{}>", message.from_name, message.from_email)
            .parse()
            .map_err(|e| CadenceError::PermanentDelivery(format!("invalid from address: {e}")))?;
        let to: Mailbox = message
            .to_email
            .parse()
            .map_err(|e| CadenceError::PermanentDelivery(format!("invalid to address: {e}")))?;
        let reply_to: Mailbox = message
            .reply_to
            .parse()
            .map_err(|e| CadenceError::Internal(format!("invalid reply-to address: {e}")))?;

        let domain = message
            .from_email
            .split('@')
            .nth(1)
            .unwrap_or("cadence.invalid");
        let provider_message_id = format!("<{}@{}>", Uuid::new_v4(), domain);

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .reply_to(reply_to)
            .subject(&message.subject)
            .message_id(Some(provider_message_id.clone()))
            .header(ContentType::TEXT_HTML);
        if let Some(thread_head) = &message.in_reply_to {
            builder = builder.in_reply_to(thread_head.clone());
        }

        let email = builder
            .body(message.html_body.clone())
            .map_err(|e| CadenceError::Internal(format!("failed to build email: {e}")))?;

        let creds = Credentials::new(
            account_email.to_string(),
            password.expose_secret().to_string(),
        );
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| CadenceError::Transport {
                message: format!("SMTP relay setup failed: {e}"),
                source: Some(Box::new(e)),
            })?
            .credentials(creds)
            .build();

        mailer.send(email).await.map_err(map_smtp_error)?;

        tracing::info!(to = %message.to_email, "email sent");
        Ok(provider_message_id)
    }
}

/// Map a lettre SMTP failure onto the retry taxonomy.
fn map_smtp_error(err: lettre::transport::smtp::Error) -> CadenceError {
    let permanent = err.is_permanent();
    classify_smtp_failure(err.to_string(), permanent, Some(Box::new(err)))
}

fn classify_smtp_failure(
    text: String,
    permanent: bool,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
) -> CadenceError {
    let lower = text.to_lowercase();
    if lower.contains("credentials") || lower.contains("authentication") || lower.contains("535") {
        return CadenceError::Auth(text);
    }
    if permanent {
        return CadenceError::PermanentDelivery(text);
    }
    CadenceError::Transport {
        message: text,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_hosts_resolve() {
        assert_eq!(smtp_host("gmail").unwrap(), "smtp.gmail.com");
        assert_eq!(smtp_host("Outlook").unwrap(), "smtp.office365.com");
        assert!(smtp_host("fastmail").is_err());
    }

    #[test]
    fn auth_markers_map_to_auth_errors() {
        let err = classify_smtp_failure("535 5.7.8 authentication failed".to_string(), true, None);
        assert!(matches!(err, CadenceError::Auth(_)));
    }

    #[test]
    fn permanent_failures_map_to_permanent_delivery() {
        let err = classify_smtp_failure("550 no such user".to_string(), true, None);
        assert!(matches!(err, CadenceError::PermanentDelivery(_)));
    }

    #[test]
    fn transient_failures_map_to_transport() {
        let err = classify_smtp_failure("connection reset by peer".to_string(), false, None);
        assert!(matches!(err, CadenceError::Transport { .. }));
    }
}
