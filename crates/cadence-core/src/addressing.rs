// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email addressing conventions shared by the dispatcher and the inbound
//! processors.
//!
//! Outbound mail sets a plus-addressed reply-to keyed to the email log id
//! (`sales+<log-id>@acme.com`); inbound replies are attributed by inverting
//! it. The tracking pixel embeds the same id.

/// Build the plus-addressed reply-to for an email log,
/// e.g. `sales+<log-id>@acme.com`.
pub fn reply_to_for_log(account_email: &str, email_log_id: &str) -> String {
    match account_email.split_once('@') {
        Some((local, domain)) => format!("{local}+{email_log_id}@{domain}"),
        None => account_email.to_string(),
    }
}

/// Extract the email log id from a plus-addressed recipient, the inverse of
/// [`reply_to_for_log`]. Returns `None` for addresses without a plus tag.
pub fn log_id_from_address(address: &str) -> Option<String> {
    let local = address.split('@').next()?;
    let (_, tag) = local.split_once('+')?;
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

/// Append the 1x1 tracking pixel referencing the log id to an HTML body.
pub fn add_tracking_pixel(html: &str, public_base_url: &str, email_log_id: &str) -> String {
    format!(
        "{html}<img src=\"{}/track/open/{email_log_id}\" width=\"1\" height=\"1\" alt=\"\" />",
        public_base_url.trim_end_matches('/')
    )
}

/// Extract a display name from an account email address,
/// e.g. "Jack Doe" from "jack.doe@gmail.com". Single-token locals fall back
/// to `fallback` (usually the company name), which reads better than "Sales".
pub fn sender_name_from_email(account_email: &str, fallback: &str) -> String {
    let local = account_email.split('@').next().unwrap_or_default();
    let parts: Vec<String> = local
        .split(['.', '_', '-'])
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if parts.len() < 2 {
        return fallback.to_string();
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_to_round_trips_log_id() {
        let addr = reply_to_for_log("sales@acme.com", "log-123");
        assert_eq!(addr, "sales+log-123@acme.com");
        assert_eq!(log_id_from_address(&addr).as_deref(), Some("log-123"));
        assert!(log_id_from_address("sales@acme.com").is_none());
        assert!(log_id_from_address("sales+@acme.com").is_none());
    }

    #[test]
    fn tracking_pixel_references_log() {
        let html = add_tracking_pixel("<p>Hi</p>", "https://track.test/", "log-9");
        assert!(html.contains("https://track.test/track/open/log-9"));
        assert!(html.starts_with("<p>Hi</p><img"));
    }

    #[test]
    fn sender_name_extraction() {
        assert_eq!(sender_name_from_email("jack.doe@gmail.com", "Acme"), "Jack Doe");
        assert_eq!(sender_name_from_email("jane_van-dam@x.co", "Acme"), "Jane Van Dam");
        assert_eq!(sender_name_from_email("sales@acme.com", "Acme"), "Acme");
    }
}
