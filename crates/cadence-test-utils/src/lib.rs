// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test infrastructure: mock adapters and the end-to-end harness.

pub mod harness;
pub mod mock_composer;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_composer::MockComposer;
pub use mock_transport::{
    MockCallTransport, MockEmailTransport, MockFailure, MockLinkedinTransport,
};
