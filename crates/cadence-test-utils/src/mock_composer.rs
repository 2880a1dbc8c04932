// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock content composer returning canned copy and recording requests.

use std::sync::Mutex;

use async_trait::async_trait;
use cadence_core::traits::compose::{ComposeRequest, ComposedContent, ContentComposer};
use cadence_core::CadenceError;

/// Canned composer: every request yields a deterministic subject/body pair,
/// and every request is recorded for assertions.
#[derive(Default)]
pub struct MockComposer {
    pub requests: Mutex<Vec<ComposeRequest>>,
    fail_times: Mutex<usize>,
}

impl MockComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `times` compose calls to fail as transient.
    pub fn fail_next(&self, times: usize) {
        *self.fail_times.lock().unwrap() = times;
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The stages observed so far, in order.
    pub fn stages_seen(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.stage.clone())
            .collect()
    }
}

#[async_trait]
impl ContentComposer for MockComposer {
    async fn compose(&self, request: &ComposeRequest) -> Result<ComposedContent, CadenceError> {
        {
            let mut remaining = self.fail_times.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CadenceError::Compose {
                    message: "simulated generation failure".to_string(),
                    source: None,
                });
            }
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(ComposedContent {
            subject: Some(format!("[{}] Quick question", request.stage)),
            body: format!("Generated {} copy for {}", request.stage, request.channel),
            invitation: Some("Let's connect".to_string()),
        })
    }

    async fn insights(&self, _lead_company: &str) -> Result<Option<String>, CadenceError> {
        Ok(Some("Recently raised a Series B".to_string()))
    }
}
