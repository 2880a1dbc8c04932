// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators of the engine.
//!
//! The engine drives transports and the content composer exclusively through
//! these traits; production implementations live in `cadence-transport` and
//! `cadence-compose`, mocks in `cadence-test-utils`.

pub mod compose;
pub mod transport;

pub use compose::{ComposeRequest, ComposedContent, ContentComposer, EngagementSignals};
pub use transport::{
    CallTransport, EmailMessage, EmailTransport, LinkedinAction, LinkedinSendOutcome,
    LinkedinTransport,
};
