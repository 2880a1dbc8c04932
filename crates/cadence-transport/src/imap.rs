// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async IMAP ingest for tenant mailboxes.
//!
//! Used by the bounce processor and the inbound-reply processor. Fetches
//! messages with UIDs above a stored cursor so repeated runs never reprocess
//! the same mail.

use cadence_core::CadenceError;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};

/// IMAP host for a provider key.
fn imap_host(provider: &str) -> Result<&'static str, CadenceError> {
    match provider.to_lowercase().as_str() {
        "gmail" => Ok("imap.gmail.com"),
        "outlook" => Ok("outlook.office365.com"),
        "yahoo" => Ok("imap.mail.yahoo.com"),
        other => Err(CadenceError::Config(format!(
            "unsupported email provider: {other}"
        ))),
    }
}

/// A parsed inbound message.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    pub uid: u32,
    pub from: String,
    /// All recipient addresses (To + Delivered-To), lowercased.
    pub recipients: Vec<String>,
    pub subject: String,
    pub body_text: String,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    /// DSN status code ("5.1.1") when the message is a delivery report.
    pub dsn_status: Option<String>,
}

type ImapTlsStream = async_imap::Client<tokio_native_tls::TlsStream<tokio::net::TcpStream>>;

async fn connect_tls(host: &str) -> Result<ImapTlsStream, CadenceError> {
    let tcp = tokio::net::TcpStream::connect((host, 993))
        .await
        .map_err(|e| CadenceError::Transport {
            message: format!("IMAP TCP connect: {e}"),
            source: Some(Box::new(e)),
        })?;
    let connector = native_tls::TlsConnector::new().map_err(|e| CadenceError::Transport {
        message: format!("TLS connector: {e}"),
        source: Some(Box::new(e)),
    })?;
    let connector = tokio_native_tls::TlsConnector::from(connector);
    let tls_stream = connector
        .connect(host, tcp)
        .await
        .map_err(|e| CadenceError::Transport {
            message: format!("TLS handshake: {e}"),
            source: Some(Box::new(e)),
        })?;
    Ok(async_imap::Client::new(tls_stream))
}

/// Fetch INBOX messages with UID strictly greater than `last_uid`.
///
/// Returns the parsed messages; the caller persists the new cursor from the
/// max UID seen. `limit` bounds the per-run batch.
pub async fn fetch_since_uid(
    provider: &str,
    account_email: &str,
    password: &SecretString,
    last_uid: u32,
    limit: usize,
) -> Result<Vec<InboundEmail>, CadenceError> {
    let host = imap_host(provider)?;
    let client = connect_tls(host).await?;
    let mut session = client
        .login(account_email, password.expose_secret())
        .await
        .map_err(|(e, _)| CadenceError::Auth(format!("IMAP login failed: {e}")))?;

    session
        .select("INBOX")
        .await
        .map_err(|e| CadenceError::Transport {
            message: format!("IMAP select: {e}"),
            source: Some(Box::new(e)),
        })?;

    let uids = session
        .uid_search(format!("UID {}:*", last_uid + 1))
        .await
        .map_err(|e| CadenceError::Transport {
            message: format!("IMAP search: {e}"),
            source: Some(Box::new(e)),
        })?;

    let mut new_uids: Vec<u32> = uids.into_iter().filter(|&u| u > last_uid).collect();
    new_uids.sort_unstable();
    new_uids.truncate(limit);

    if new_uids.is_empty() {
        session.logout().await.ok();
        return Ok(Vec::new());
    }

    let uid_set = new_uids
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let mut messages = session
        .uid_fetch(&uid_set, "(UID RFC822)")
        .await
        .map_err(|e| CadenceError::Transport {
            message: format!("IMAP fetch: {e}"),
            source: Some(Box::new(e)),
        })?;

    let mut emails = Vec::new();
    while let Some(msg_result) = messages.next().await {
        let msg = msg_result.map_err(|e| CadenceError::Transport {
            message: format!("IMAP fetch message: {e}"),
            source: Some(Box::new(e)),
        })?;
        let uid = msg.uid.unwrap_or(0);
        if let Some(body) = msg.body() {
            if let Some(parsed) = parse_inbound(body, uid) {
                emails.push(parsed);
            }
        }
    }
    drop(messages);

    session.logout().await.ok();
    tracing::info!(count = emails.len(), account = %account_email, "fetched inbound mail");
    Ok(emails)
}

/// Parse raw RFC822 bytes into an [`InboundEmail`].
pub fn parse_inbound(raw: &[u8], uid: u32) -> Option<InboundEmail> {
    use mail_parser::MessageParser;
    let parsed = MessageParser::default().parse(raw)?;

    let from = parsed
        .from()
        .and_then(|a| a.first())
        .and_then(|a| a.address())
        .unwrap_or_default()
        .to_lowercase();

    let mut recipients: Vec<String> = parsed
        .to()
        .map(|addrs| {
            addrs
                .iter()
                .filter_map(|a| a.address())
                .map(|a| a.to_lowercase())
                .collect()
        })
        .unwrap_or_default();
    if let Some(delivered) = parsed.header("Delivered-To").and_then(|h| h.as_text()) {
        recipients.push(delivered.to_lowercase());
    }

    let subject = parsed.subject().unwrap_or("(no subject)").to_string();

    let body_text = parsed
        .body_text(0)
        .map(|s| s.to_string())
        .or_else(|| parsed.body_html(0).map(|h| strip_html(&h)))
        .unwrap_or_default();

    let message_id = parsed.message_id().map(String::from);
    let in_reply_to = parsed.in_reply_to().as_text().map(String::from);

    // DSN reports carry a Status: field ("4.x.x" soft, "5.x.x" hard) in the
    // delivery-status part; mail-parser surfaces it in the flattened text.
    let dsn_status = body_text
        .lines()
        .find_map(|line| line.trim().strip_prefix("Status:").map(|s| s.trim().to_string()));

    Some(InboundEmail {
        uid,
        from,
        recipients,
        subject,
        body_text: body_text.chars().take(8000).collect(),
        message_id,
        in_reply_to,
        dsn_status,
    })
}

fn strip_html(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}
