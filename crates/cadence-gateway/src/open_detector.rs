// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracking-pixel open validation.
//!
//! Mail scanners, link-preview bots, and HTTP libraries fetch tracking
//! pixels too; counting those as opens poisons engagement signals. The
//! filter rejects known bot user agents and implausible browser strings and
//! lets mail-proxy fetches (which stand in for real opens) through.

/// User agents that are definitely not a human opening an email.
const KNOWN_BOT_AGENTS: &[&str] = &[
    "HubSpot Connect",
    "AHC/2.1",
    "Amazon CloudFront",
    "Barracuda Sentinel (EE)",
    "okhttp/4.10.0",
    "cortex/1.0",
    "facebookexternalua",
    "Office 365 Connectors",
    "Slackbot-LinkExpanding 1.0 (+https://api.slack.com/robots)",
    "Snap URL Preview Service; bot; snapchat; https://developers.snap.com/robots",
    "W3C-checklink/4.5 [4.160] libwww-perl/5.823",
    "Wget/1.9.1",
];

/// Bot user-agent prefixes (language HTTP clients and the like).
const BOT_PREFIXES: &[&str] = &[
    "python-requests/",
    "python/",
    "java/",
    "apache-httpclient/",
    "lua-resty-http/",
    "dalvik/",
    "jetty/",
    "yarn/",
];

/// Mail image proxies that fetch on behalf of a real reader.
const VALID_EMAIL_PROXIES: &[&str] = &["googleimageproxy", "yahoomailproxy", "outlookimageproxy"];

const BROWSER_IDENTIFIERS: &[&str] = &["chrome/", "firefox/", "safari/", "edge/", "opera/"];

/// Whether a pixel fetch with this user agent counts as a real open.
pub fn is_valid_open(user_agent: &str) -> bool {
    let trimmed = user_agent.trim();
    if trimmed.is_empty() {
        return false;
    }
    if KNOWN_BOT_AGENTS.contains(&trimmed) {
        return false;
    }

    let lower = trimmed.to_lowercase();
    if BOT_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return false;
    }

    // Gmail strips the UA down to bare Mozilla/5.0.
    if lower == "mozilla/5.0" {
        return true;
    }
    if VALID_EMAIL_PROXIES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    if has_unusual_browser_combination(&lower) {
        return false;
    }
    true
}

/// More than one browser identifier is a spoofing tell, except the
/// legitimate Chrome+Safari WebKit pairing.
fn has_unusual_browser_combination(lower: &str) -> bool {
    let count = BROWSER_IDENTIFIERS.iter().filter(|id| lower.contains(*id)).count();
    if count > 1 {
        let is_webkit_pair = lower.contains("chrome/") && lower.contains("safari/");
        return !is_webkit_pair;
    }
    false
}
