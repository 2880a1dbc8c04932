// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the compose service API.

use serde::Deserialize;

/// Error body returned by the compose service.
#[derive(Debug, Deserialize)]
pub struct ComposeApiError {
    pub error: String,
}

/// Response body of `GET /v1/insights`.
#[derive(Debug, Deserialize)]
pub struct InsightsResponse {
    pub insights: Option<String>,
}
