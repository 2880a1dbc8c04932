// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter traits for the three outreach channels.
//!
//! Each dispatcher talks to exactly one of these. Credentials are passed per
//! call, already decrypted, and must not outlive the send.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::CadenceError;

/// A fully rendered outbound email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from_name: String,
    pub from_email: String,
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
    /// Plus-addressed reply-to keyed to the email log, so inbound replies
    /// can be attributed.
    pub reply_to: String,
    /// Message-ID of the thread head when this is a reminder.
    pub in_reply_to: Option<String>,
}

/// SMTP send contract. One connection per dispatch; no pooling.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Send the message, returning the provider message id.
    async fn send(
        &self,
        account_email: &str,
        password: &SecretString,
        provider: &str,
        message: &EmailMessage,
    ) -> Result<String, CadenceError>;
}

/// Telephony contract. Call completion arrives later via webhook.
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Start an outbound call, returning the provider call id.
    async fn start_call(
        &self,
        phone_number: &str,
        script: &str,
        api_key: &SecretString,
    ) -> Result<String, CadenceError>;
}

/// Which LinkedIn sub-action a dispatch performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedinAction {
    Message,
    Invitation,
    Inmail,
}

impl LinkedinAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkedinAction::Message => "message",
            LinkedinAction::Invitation => "invitation",
            LinkedinAction::Inmail => "inmail",
        }
    }
}

/// Result of a LinkedIn send.
#[derive(Debug, Clone)]
pub struct LinkedinSendOutcome {
    pub provider_message_id: String,
    pub chat_id: Option<String>,
}

/// LinkedIn integrator contract (HTTP, e.g. Unipile-style).
#[async_trait]
pub trait LinkedinTransport: Send + Sync {
    /// Send a direct message to a first-degree connection.
    async fn send_message(
        &self,
        account_id: &str,
        attendee_id: &str,
        chat_id: Option<&str>,
        text: &str,
        inmail: bool,
    ) -> Result<LinkedinSendOutcome, CadenceError>;

    /// Send a connection invitation with a note.
    async fn send_invitation(
        &self,
        account_id: &str,
        attendee_id: &str,
        message: &str,
    ) -> Result<LinkedinSendOutcome, CadenceError>;
}
