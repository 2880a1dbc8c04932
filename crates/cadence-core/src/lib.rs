// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cadence outbound engagement engine.
//!
//! This crate provides the foundational error type, shared domain enums, and
//! the adapter traits the engine uses to talk to transports and the content
//! composer. All other workspace crates depend on it.

pub mod addressing;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CadenceError, ErrorClass};
pub use types::{
    CampaignType, Channel, LinkedinAccountStatus, NetworkDistance, QueueStatus, RunStatus, Stage,
    WorkWindow,
};

// Re-export adapter traits at crate root.
pub use traits::{CallTransport, ContentComposer, EmailTransport, LinkedinTransport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_trait_modules_are_exported() {
        // Verifies the adapter traits compile and are accessible through the
        // public API; a missing module makes this test fail to compile.
        fn _assert_email_transport<T: EmailTransport>() {}
        fn _assert_call_transport<T: CallTransport>() {}
        fn _assert_linkedin_transport<T: LinkedinTransport>() {}
        fn _assert_composer<T: ContentComposer>() {}
    }

    #[test]
    fn error_classification_covers_every_variant() {
        // Each constructed variant must classify without panicking.
        let errors = [
            CadenceError::Config("x".into()),
            CadenceError::RateLimited("429".into()),
            CadenceError::Auth("x".into()),
            CadenceError::PermanentDelivery("x".into()),
            CadenceError::DataIntegrity("x".into()),
            CadenceError::Vault("x".into()),
            CadenceError::Internal("x".into()),
        ];
        for err in errors {
            let _ = err.classify();
        }
    }
}
