// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounce notification classification and recipient extraction.
//!
//! Works over parsed inbound mail: decides whether a message is a bounce at
//! all, whether it is hard or soft, and which address bounced.

use crate::imap::InboundEmail;

/// Bounce severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceKind {
    /// Permanent failure; the address is dead.
    Hard,
    /// Temporary failure (mailbox full, greylisting); address may recover.
    Soft,
}

const BOUNCE_SUBJECT_MARKERS: &[&str] = &[
    "delivery",
    "undeliverable",
    "failed",
    "failure",
    "returned",
    "bounce",
    "not delivered",
    "mail delivery",
    "rejected",
];

const SOFT_BOUNCE_KEYWORDS: &[&str] = &[
    "mailbox full",
    "quota exceeded",
    "over quota",
    "storage limit",
    "temporary",
    "temporarily",
    "delayed",
    "deferred",
    "try again",
    "try later",
    "timeout",
    "greylist",
    "greylisted",
    "throttle",
    "throttled",
    "rate limit",
    "too many",
];

/// Whether this inbound message looks like a bounce notification at all.
pub fn is_bounce(email: &InboundEmail) -> bool {
    let subject = email.subject.to_lowercase();
    BOUNCE_SUBJECT_MARKERS.iter().any(|m| subject.contains(m))
}

/// Classify a bounce as hard or soft.
///
/// The DSN status code decides when present (4.x.x soft, 5.x.x hard);
/// otherwise soft-bounce keywords in subject or body downgrade the default
/// hard classification.
pub fn classify(email: &InboundEmail) -> BounceKind {
    if let Some(status) = &email.dsn_status {
        if status.starts_with('4') {
            return BounceKind::Soft;
        }
        if status.starts_with('5') {
            return BounceKind::Hard;
        }
    }

    let subject = email.subject.to_lowercase();
    let body = email.body_text.to_lowercase();
    if SOFT_BOUNCE_KEYWORDS
        .iter()
        .any(|k| subject.contains(k) || body.contains(k))
    {
        return BounceKind::Soft;
    }
    BounceKind::Hard
}

/// Extract the address that bounced.
///
/// Prefers the DSN `Final-Recipient` field, then falls back to common
/// failure phrasings in the body text.
pub fn extract_bounced_address(email: &InboundEmail) -> Option<String> {
    for line in email.body_text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Final-Recipient:") {
            let addr = rest.rsplit(';').next().unwrap_or(rest).trim();
            if addr.contains('@') {
                return Some(addr.to_lowercase());
            }
        }
        if let Some(rest) = trimmed.strip_prefix("X-Failed-Recipients:") {
            let addr = rest.trim();
            if addr.contains('@') {
                return Some(addr.to_lowercase());
            }
        }
    }

    // Body-pattern fallback: "<phrase>: user@host".
    let lower = email.body_text.to_lowercase();
    for phrase in [
        "failed recipient:",
        "undeliverable to:",
        "recipient address rejected:",
        "user unknown:",
    ] {
        if let Some(pos) = lower.find(phrase) {
            let tail = &lower[pos + phrase.len()..];
            if let Some(addr) = first_address_in(tail) {
                return Some(addr);
            }
        }
    }
    // Last resort: any address in the body that is not the tenant's own.
    first_address_in(&lower).filter(|a| !email.recipients.contains(a))
}

fn first_address_in(text: &str) -> Option<String> {
    let mut candidate = String::new();
    for word in text.split_whitespace() {
        let cleaned: String = word
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '.' && c != '-' && c != '_' && c != '+')
            .to_string();
        if cleaned.contains('@') && cleaned.split('@').nth(1).is_some_and(|d| d.contains('.')) {
            candidate = cleaned.to_lowercase();
            break;
        }
    }
    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounce_email(subject: &str, body: &str, dsn: Option<&str>) -> InboundEmail {
        InboundEmail {
            uid: 1,
            from: "mailer-daemon@acme.test".to_string(),
            recipients: vec!["sales@acme.test".to_string()],
            subject: subject.to_string(),
            body_text: body.to_string(),
            message_id: None,
            in_reply_to: None,
            dsn_status: dsn.map(str::to_string),
        }
    }

    #[test]
    fn bounce_detection_keys_on_subject() {
        assert!(is_bounce(&bounce_email("Undeliverable: hello", "", None)));
        assert!(is_bounce(&bounce_email("Mail delivery failed", "", None)));
        assert!(!is_bounce(&bounce_email("Re: Quick question", "", None)));
    }

    #[test]
    fn dsn_status_decides_classification() {
        assert_eq!(
            classify(&bounce_email("Undeliverable", "", Some("5.1.1"))),
            BounceKind::Hard
        );
        assert_eq!(
            classify(&bounce_email("Undeliverable", "", Some("4.2.2"))),
            BounceKind::Soft
        );
    }

    #[test]
    fn keywords_downgrade_to_soft() {
        assert_eq!(
            classify(&bounce_email("Delivery delayed", "mailbox full, try later", None)),
            BounceKind::Soft
        );
        assert_eq!(
            classify(&bounce_email("Undeliverable", "no such user here", None)),
            BounceKind::Hard
        );
    }

    #[test]
    fn extracts_final_recipient() {
        let email = bounce_email(
            "Undeliverable",
            "Reporting-MTA: dns; acme.test\nFinal-Recipient: rfc822; Gone@Example.Test\nStatus: 5.1.1",
            Some("5.1.1"),
        );
        assert_eq!(
            extract_bounced_address(&email).as_deref(),
            Some("gone@example.test")
        );
    }

    #[test]
    fn extracts_from_body_phrase() {
        let email = bounce_email(
            "Mail delivery failed",
            "The following message could not be delivered.\nUndeliverable to: nobody@dead.test",
            None,
        );
        assert_eq!(
            extract_bounced_address(&email).as_deref(),
            Some("nobody@dead.test")
        );
    }
}
