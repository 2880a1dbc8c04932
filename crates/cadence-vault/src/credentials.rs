// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant credential sealing.
//!
//! Transport secrets (SMTP passwords, provider API keys) are stored sealed
//! at rest and decrypted in memory only for the duration of a send. The
//! plaintext is wrapped in [`SecretString`] so it never hits Debug output,
//! and the intermediate buffer is zeroized.

use cadence_core::CadenceError;
use secrecy::SecretString;
use zeroize::Zeroize;

use crate::crypto;

/// Credential vault bound to a single 32-byte master key.
#[derive(Clone)]
pub struct CredentialVault {
    master_key: [u8; 32],
}

impl CredentialVault {
    /// Build a vault from a hex-encoded 32-byte master key.
    pub fn from_hex_key(hex_key: &str) -> Result<Self, CadenceError> {
        let bytes = decode_hex(hex_key)?;
        let master_key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CadenceError::Vault("master key must be 32 bytes".to_string()))?;
        Ok(Self { master_key })
    }

    /// Seal a plaintext secret, returning `(ciphertext, nonce)` for storage.
    pub fn seal(&self, plaintext: &str) -> Result<(Vec<u8>, [u8; 12]), CadenceError> {
        crypto::seal(&self.master_key, plaintext.as_bytes())
    }

    /// Open a sealed secret into a [`SecretString`].
    pub fn open(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<SecretString, CadenceError> {
        let nonce: [u8; 12] = nonce
            .try_into()
            .map_err(|_| CadenceError::Vault("nonce must be 12 bytes".to_string()))?;
        let mut plaintext = crypto::open(&self.master_key, &nonce, ciphertext)?;
        let secret = String::from_utf8(plaintext.clone())
            .map_err(|_| CadenceError::Vault("sealed secret is not valid UTF-8".to_string()))?;
        plaintext.zeroize();
        Ok(SecretString::new(secret))
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, CadenceError> {
    if s.len() % 2 != 0 {
        return Err(CadenceError::Vault("hex key has odd length".to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| CadenceError::Vault("invalid hex in master key".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn test_vault() -> CredentialVault {
        let key = crypto::generate_random_key().unwrap();
        let hex: String = key.iter().map(|b| format!("{b:02x}")).collect();
        CredentialVault::from_hex_key(&hex).unwrap()
    }

    #[test]
    fn seal_open_round_trip() {
        let vault = test_vault();
        let (ciphertext, nonce) = vault.seal("hunter2-app-password").unwrap();
        let opened = vault.open(&ciphertext, &nonce).unwrap();
        assert_eq!(opened.expose_secret(), "hunter2-app-password");
    }

    #[test]
    fn rejects_short_master_key() {
        let err = CredentialVault::from_hex_key("deadbeef");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_invalid_hex() {
        let err = CredentialVault::from_hex_key(&"zz".repeat(32));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_wrong_nonce_length() {
        let vault = test_vault();
        let (ciphertext, _) = vault.seal("secret").unwrap();
        let err = vault.open(&ciphertext, &[0u8; 4]);
        assert!(err.is_err());
    }
}
