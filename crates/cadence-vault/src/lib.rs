// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential vault for tenant transport secrets.
//!
//! AES-256-GCM sealing with per-secret random nonces; plaintext exists only
//! in memory, wrapped in `secrecy::SecretString`, for the duration of a send.

pub mod credentials;
pub mod crypto;

pub use credentials::CredentialVault;
