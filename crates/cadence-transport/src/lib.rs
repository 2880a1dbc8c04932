// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport implementations for the three outreach channels plus IMAP
//! ingest for bounce and reply processing.

pub mod bounce;
pub mod imap;
pub mod linkedin;
pub mod smtp;
pub mod telephony;

pub use linkedin::LinkedinClient;
pub use smtp::SmtpSender;
pub use telephony::TelephonyClient;
